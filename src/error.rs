//! Action Failure
//!
//! Business-rule failures travel as `ActionError`, carrying the log of the
//! failing action so a dispatch boundary can show what went wrong.

use std::error::Error as StdError;
use std::fmt;

use crate::status_log::{EventProvider, StatusLog};

pub const DEFAULT_SUMMARY_ERRORS: usize = 16;
pub const NO_LOG_PLACEHOLDER: &str = "No log provided";

type Cause = Box<dyn StdError + Send + Sync + 'static>;

pub struct ActionError {
    log: Option<StatusLog>,
    cause: Option<Cause>,
}

impl ActionError {
    pub fn new(log: Option<StatusLog>, cause: Option<Cause>) -> Self {
        Self { log, cause }
    }

    /// Failure described entirely by the log contents.
    pub fn from_log(log: StatusLog) -> Self {
        Self::new(Some(log), None)
    }

    /// Failure with no log to show, typically because the caller passed none.
    pub fn without_log() -> Self {
        Self::new(None, None)
    }

    pub fn caused_by(log: Option<StatusLog>, cause: impl Into<Cause>) -> Self {
        Self::new(log, Some(cause.into()))
    }

    /// Snapshot of the caller's log if one was supplied.
    pub fn snapshot(log: Option<&StatusLog>) -> Self {
        Self::new(log.cloned(), None)
    }

    pub fn log(&self) -> Option<&StatusLog> {
        self.log.as_ref()
    }

    pub fn into_log(self) -> Option<StatusLog> {
        self.log
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Up to `max_errors` of the most recent error events, newest first, one per line.
    pub fn error_summary(&self, max_errors: usize) -> String {
        let Some(log) = &self.log else {
            return NO_LOG_PLACEHOLDER.to_string();
        };
        if log.error_count() == 0 {
            return match &self.cause {
                Some(cause) => format!("Action failed: {}", cause),
                None => "Action failed without reporting errors".to_string(),
            };
        }
        log.errors()
            .rev()
            .take(max_errors)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error_summary(DEFAULT_SUMMARY_ERRORS))
    }
}

impl fmt::Debug for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionError")
            .field("errors", &self.log.as_ref().map(StatusLog::error_count))
            .field("cause", &self.cause.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl StdError for ActionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn StdError + 'static))
    }
}

impl EventProvider for ActionError {
    fn all_events(&self) -> &[crate::event::Event] {
        self.log.as_ref().map(StatusLog::events).unwrap_or_default()
    }
}
