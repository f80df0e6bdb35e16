//! Actions - General Transform Contracts
//!
//! Two calling conventions over the same semantics:
//! - `Action::apply` returns `Result` and writes into an optional shared log;
//! - `FastAction::fast_apply` returns `Option` and appends mask-filtered
//!   events to a plain buffer, so hot paths skip building logs and errors.
//!
//! The free functions and adapters here convert between the two.

use serde_json::Value;

use crate::error::ActionError;
use crate::event::{Event, EventPath, SeverityMask};
use crate::format::Format;
use crate::status_log::StatusLog;
use crate::value::Input;

pub trait Action<I, O = I> {
    fn apply(&self, input: I, log: Option<&mut StatusLog>) -> Result<O, ActionError>;
}

pub trait FastAction<I, O = I> {
    /// `Some(output)` on success, `None` on failure. Events whose severity is
    /// in `mask` are appended to `events` with `path` prefixed.
    fn fast_apply(
        &self,
        input: I,
        mask: SeverityMask,
        events: &mut Vec<Event>,
        path: Option<&EventPath>,
    ) -> Option<O>;
}

/// `apply` in terms of `fast_apply`, for types that only implement the fast path.
///
/// Buffered events land in the log on both outcomes. Without a log nothing is
/// recorded and a failure carries no log.
pub fn apply_via_fast_apply<I, O, A>(
    action: &A,
    input: I,
    log: Option<&mut StatusLog>,
) -> Result<O, ActionError>
where
    A: FastAction<I, O> + ?Sized,
{
    let mask = log.as_ref().map_or(SeverityMask::NONE, |l| l.mask());
    let mut events = Vec::new();
    let output = action.fast_apply(input, mask, &mut events, None);

    let Some(log) = log else {
        return output.ok_or_else(ActionError::without_log);
    };
    if let Err(err) = log.log(events) {
        return Err(ActionError::caused_by(Some(log.clone()), err));
    }
    output.ok_or_else(|| ActionError::snapshot(Some(&*log)))
}

/// Drive an `Action` through the fast convention.
///
/// A scratch log with the requested mask stands in for the caller's buffer;
/// its events are moved over, path-prefixed, on both outcomes.
pub fn emulate_fast_apply<I, O, A>(
    action: &A,
    input: I,
    mask: SeverityMask,
    events: &mut Vec<Event>,
    path: Option<&EventPath>,
) -> Option<O>
where
    A: Action<I, O> + ?Sized,
{
    let mut scratch = StatusLog::new(mask);
    let result = action.apply(input, Some(&mut scratch));
    events.extend(scratch.into_events().into_iter().map(|e| e.prefixed(path)));
    result.ok()
}

/// Presents an `Action` as a `FastAction`.
#[derive(Debug, Clone)]
pub struct AsFast<A>(pub A);

impl<I, O, A> FastAction<I, O> for AsFast<A>
where
    A: Action<I, O>,
{
    fn fast_apply(
        &self,
        input: I,
        mask: SeverityMask,
        events: &mut Vec<Event>,
        path: Option<&EventPath>,
    ) -> Option<O> {
        emulate_fast_apply(&self.0, input, mask, events, path)
    }
}

/// Presents a `FastAction` as an `Action`.
#[derive(Debug, Clone)]
pub struct AsAction<A>(pub A);

impl<I, O, A> Action<I, O> for AsAction<A>
where
    A: FastAction<I, O>,
{
    fn apply(&self, input: I, log: Option<&mut StatusLog>) -> Result<O, ActionError> {
        apply_via_fast_apply(&self.0, input, log)
    }
}

/// Runs a `Format` as a pipeline stage over JSON values.
#[derive(Debug)]
pub struct FormatAction<F> {
    format: F,
}

impl<F: Format> FormatAction<F> {
    pub fn new(format: F) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &F {
        &self.format
    }
}

impl<F: Format> FastAction<Value> for FormatAction<F> {
    fn fast_apply(
        &self,
        input: Value,
        mask: SeverityMask,
        events: &mut Vec<Event>,
        path: Option<&EventPath>,
    ) -> Option<Value> {
        let mut log = StatusLog::new(mask);
        let output = self.format.extract(&Input::Primitive(input), &mut log, path);
        events.extend(log.into_events());
        output
    }
}

impl<F: Format> Action<Value> for FormatAction<F> {
    fn apply(&self, input: Value, log: Option<&mut StatusLog>) -> Result<Value, ActionError> {
        apply_via_fast_apply(self, input, log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Severity;
    use crate::format::{IntegerFormat, ListFormat};
    use serde_json::json;

    /// Halves even numbers, rejects odd ones.
    struct Halve;

    impl Action<i64> for Halve {
        fn apply(&self, input: i64, log: Option<&mut StatusLog>) -> Result<i64, ActionError> {
            match log {
                Some(log) => {
                    log.add_info(None, format!("halving {}", input));
                    if input % 2 != 0 {
                        log.add_error_code(None, "Odd input", "odd");
                        return Err(ActionError::snapshot(Some(&*log)));
                    }
                    Ok(input / 2)
                }
                None if input % 2 != 0 => Err(ActionError::without_log()),
                None => Ok(input / 2),
            }
        }
    }

    #[test]
    fn test_emulation_matches_direct_apply_on_success() {
        let mut log = StatusLog::default();
        let direct = Halve.apply(8, Some(&mut log)).unwrap();

        let mut events = Vec::new();
        let fast = emulate_fast_apply(&Halve, 8, SeverityMask::ALL, &mut events, None);
        assert_eq!(fast, Some(direct));
        assert_eq!(events, log.events());
    }

    #[test]
    fn test_emulation_matches_direct_apply_on_failure() {
        let mut log = StatusLog::default();
        let err = Halve.apply(3, Some(&mut log)).unwrap_err();

        let mut events = Vec::new();
        let fast = emulate_fast_apply(&Halve, 3, SeverityMask::ALL, &mut events, None);
        assert_eq!(fast, None);
        assert_eq!(events, err.log().unwrap().events());
    }

    #[test]
    fn test_emulation_prefixes_path_and_masks() {
        let mut events = Vec::new();
        let path = EventPath::from("step");
        AsFast(Halve).fast_apply(5, SeverityMask::ERROR, &mut events, Some(&path));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Error);
        assert_eq!(events[0].path, Some(path));
    }

    #[test]
    fn test_format_action_slow_path() {
        let action = FormatAction::new(ListFormat::default().with_item(IntegerFormat::default()));
        let mut log = StatusLog::default();
        assert_eq!(action.apply(json!("1;2"), Some(&mut log)).unwrap(), json!([1, 2]));

        let err = action.apply(json!("1;z"), Some(&mut log)).unwrap_err();
        assert_eq!(err.log().unwrap().error_count(), 1);
        assert_eq!(log.error_count(), 1);
    }

    #[test]
    fn test_format_action_without_log() {
        let action = AsAction(FormatAction::new(IntegerFormat::default()));
        let err = action.apply(json!("z"), None).unwrap_err();
        assert!(err.log().is_none());
        assert_eq!(err.to_string(), crate::error::NO_LOG_PLACEHOLDER);
    }

    /// Succeeds but reports an event with neither message nor code.
    struct Garbled;

    impl FastAction<i64> for Garbled {
        fn fast_apply(
            &self,
            input: i64,
            _mask: SeverityMask,
            events: &mut Vec<Event>,
            _path: Option<&EventPath>,
        ) -> Option<i64> {
            let mut event = Event::info("noted");
            event.message = None;
            events.push(Event::success("kept back"));
            events.push(event);
            Some(input)
        }
    }

    #[test]
    fn test_malformed_fast_events_fail_the_apply() {
        let mut log = StatusLog::default();
        let err = apply_via_fast_apply(&Garbled, 1, Some(&mut log)).unwrap_err();
        assert!(log.is_empty());
        assert!(err.log().is_some_and(StatusLog::is_empty));
        let cause = err.cause().unwrap();
        assert!(cause.downcast_ref::<crate::event::LogFormatError>().is_some());
        assert!(err.to_string().starts_with("Action failed: "));
    }

    #[test]
    fn test_fast_path_respects_mask() {
        let action = FormatAction::new(IntegerFormat::default());
        let mut events = Vec::new();
        assert!(action.fast_apply(json!("z"), SeverityMask::NONE, &mut events, None).is_none());
        assert!(events.is_empty());
    }
}
