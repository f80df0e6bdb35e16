//! Event Model - Diagnostic Records
//!
//! One event per diagnostic. Severity selects the mask bit, path locates the
//! offending value inside the input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use thiserror::Error;

pub type Details = Map<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Error, Self::Warning, Self::Info, Self::Success];

    pub fn bit(self) -> SeverityMask {
        match self {
            Self::Error => SeverityMask::ERROR,
            Self::Warning => SeverityMask::WARNING,
            Self::Info => SeverityMask::INFO,
            Self::Success => SeverityMask::SUCCESS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of severities a log is willing to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeverityMask(u8);

impl SeverityMask {
    pub const NONE: Self = Self(0);
    pub const ERROR: Self = Self(1);
    pub const WARNING: Self = Self(2);
    pub const INFO: Self = Self(4);
    pub const SUCCESS: Self = Self(8);
    pub const ALL: Self = Self(15);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, severity: Severity) -> bool {
        self.0 & severity.bit().0 != 0
    }
}

impl BitOr for SeverityMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SeverityMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<Severity> for SeverityMask {
    fn from(severity: Severity) -> Self {
        severity.bit()
    }
}

/// Parses `"all"`, `"none"` or a comma-separated list of severity names.
impl FromStr for SeverityMask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mask = Self::NONE;
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            mask |= match part.to_ascii_lowercase().as_str() {
                "all" => Self::ALL,
                "none" => Self::NONE,
                "error" | "errors" => Self::ERROR,
                "warning" | "warnings" => Self::WARNING,
                "info" => Self::INFO,
                "success" => Self::SUCCESS,
                other => return Err(format!("unknown severity: {}", other)),
            };
        }
        Ok(mask)
    }
}

/// Location of a value inside a structured input, e.g. `user.emails.2`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPath(Vec<String>);

impl EventPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Dotted form; empty segments are dropped. Returns `None` for an empty path.
    pub fn parse(s: &str) -> Option<Self> {
        let path = Self::from(s);
        (!path.is_empty()).then_some(path)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn join(&self, rest: &EventPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(rest.0.iter().cloned());
        Self(segments)
    }

    /// Prefix test on segment boundaries: `a.b` starts `a.b.c` but not `a.bc`.
    pub fn starts_with(&self, prefix: &EventPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub(crate) fn strip_prefix(&self, prefix: &EventPath) -> Option<&[String]> {
        self.0.strip_prefix(prefix.0.as_slice())
    }
}

/// Child path of an optional parent, the shape every nested validator needs.
pub fn child_path(parent: Option<&EventPath>, segment: impl Into<String>) -> EventPath {
    match parent {
        Some(parent) => parent.child(segment),
        None => EventPath(vec![segment.into()]),
    }
}

impl From<&str> for EventPath {
    fn from(s: &str) -> Self {
        Self(
            s.split('.')
                .filter(|seg| !seg.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl From<Vec<String>> for EventPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for EventPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LogFormatError {
    #[error("{severity} event at {path} has neither message nor code")]
    MissingMessageAndCode { severity: Severity, path: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub path: Option<EventPath>,
    pub message: Option<String>,
    pub code: Option<String>,
    pub details: Option<Details>,
}

impl Event {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            path: None,
            message: Some(message.into()),
            code: None,
            details: None,
        }
    }

    /// Event identified only by a machine-readable code.
    pub fn coded(severity: Severity, code: impl Into<String>) -> Self {
        Self {
            severity,
            path: None,
            message: None,
            code: Some(code.into()),
            details: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    /// Sets the path; an empty path is stored as `None`.
    pub fn at(mut self, path: Option<&EventPath>) -> Self {
        self.path = path.filter(|p| !p.is_empty()).cloned();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn validate(&self) -> Result<(), LogFormatError> {
        if self.message.is_none() && self.code.is_none() {
            return Err(LogFormatError::MissingMessageAndCode {
                severity: self.severity,
                path: self.path.as_ref().map(ToString::to_string).unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Puts `prefix` in front of the event path. A missing path becomes the prefix.
    pub fn prefixed(mut self, prefix: Option<&EventPath>) -> Self {
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            self.path = Some(match self.path.take() {
                Some(path) => prefix.join(&path),
                None => prefix.clone(),
            });
        }
        self
    }

    pub(crate) fn normalize(mut self) -> Self {
        if self.path.as_ref().is_some_and(EventPath::is_empty) {
            self.path = None;
        }
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: ", path)?;
        }
        match (&self.message, &self.code) {
            (Some(message), Some(code)) => write!(f, "{} [{}]", message, code),
            (Some(message), None) => f.write_str(message),
            (None, Some(code)) => write!(f, "[{}]", code),
            (None, None) => f.write_str("(empty event)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mask_parsing() {
        assert_eq!("all".parse::<SeverityMask>().unwrap(), SeverityMask::ALL);
        assert_eq!("none".parse::<SeverityMask>().unwrap(), SeverityMask::NONE);
        let mask: SeverityMask = "error, warning".parse().unwrap();
        assert!(mask.contains(Severity::Error));
        assert!(mask.contains(Severity::Warning));
        assert!(!mask.contains(Severity::Info));
        assert!("fatal".parse::<SeverityMask>().is_err());
    }

    #[test]
    fn test_path_parse_drops_empty_segments() {
        assert_eq!(EventPath::parse(""), None);
        assert_eq!(EventPath::parse("a..b").unwrap().segments(), ["a", "b"]);
        assert_eq!(EventPath::from("a.b.c").to_string(), "a.b.c");
    }

    #[test]
    fn test_segment_boundary_prefix() {
        let path = EventPath::from("a.bc");
        assert!(path.starts_with(&EventPath::from("a")));
        assert!(!path.starts_with(&EventPath::from("a.b")));
    }

    #[test]
    fn test_event_requires_message_or_code() {
        let mut event = Event::error("bad");
        assert!(event.validate().is_ok());
        event.message = None;
        assert!(event.validate().is_err());
        event.code = Some("bad_value".into());
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_empty_path_is_none() {
        let event = Event::info("x").at(Some(&EventPath::root()));
        assert_eq!(event.path, None);
    }

    #[test]
    fn test_prefixed() {
        let prefix = EventPath::from("form");
        let event = Event::error("x").prefixed(Some(&prefix));
        assert_eq!(event.path, Some(prefix.clone()));

        let nested = Event::error("x")
            .at(Some(&EventPath::from("email")))
            .prefixed(Some(&prefix));
        assert_eq!(nested.path.unwrap().to_string(), "form.email");
    }

    #[test]
    fn test_wire_shape() {
        let event = Event::warning("Too long")
            .at(Some(&EventPath::from("name")))
            .with_code("too_long");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "warning",
                "path": ["name"],
                "message": "Too long",
                "code": "too_long",
                "details": null
            })
        );
    }
}
