//! Pipeline - Sequential Composition of Actions
//!
//! Stages run strictly in insertion order; the first failure stops the run.
//! An empty pipeline hands its input back unchanged.

use std::fmt;

use crate::action::{apply_via_fast_apply, emulate_fast_apply, Action, FastAction};
use crate::error::ActionError;
use crate::event::{Event, EventPath, SeverityMask};
use crate::status_log::StatusLog;

pub enum Stage<T> {
    Action(Box<dyn Action<T> + Send + Sync>),
    Fast(Box<dyn FastAction<T> + Send + Sync>),
}

impl<T> Stage<T> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Action(_) => "action",
            Self::Fast(_) => "fast",
        }
    }

    fn apply(&self, input: T, log: Option<&mut StatusLog>) -> Result<T, ActionError> {
        match self {
            Self::Action(action) => action.apply(input, log),
            Self::Fast(action) => apply_via_fast_apply(&**action, input, log),
        }
    }

    fn fast_apply(
        &self,
        input: T,
        mask: SeverityMask,
        events: &mut Vec<Event>,
        path: Option<&EventPath>,
    ) -> Option<T> {
        match self {
            Self::Action(action) => emulate_fast_apply(&**action, input, mask, events, path),
            Self::Fast(action) => action.fast_apply(input, mask, events, path),
        }
    }
}

impl<T> fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stage::{}", self.kind())
    }
}

/// Ordered chain of stages sharing one value type.
pub struct PipelineAction<T> {
    stages: Vec<Stage<T>>,
}

impl<T> PipelineAction<T> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn add(&mut self, stage: Stage<T>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn add_action(&mut self, action: impl Action<T> + Send + Sync + 'static) -> &mut Self {
        self.add(Stage::Action(Box::new(action)))
    }

    pub fn add_fast(&mut self, action: impl FastAction<T> + Send + Sync + 'static) -> &mut Self {
        self.add(Stage::Fast(Box::new(action)))
    }

    pub fn with_action(mut self, action: impl Action<T> + Send + Sync + 'static) -> Self {
        self.add_action(action);
        self
    }

    pub fn with_fast(mut self, action: impl FastAction<T> + Send + Sync + 'static) -> Self {
        self.add_fast(action);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<T> Default for PipelineAction<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PipelineAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineAction")
            .field("stages", &self.stages)
            .finish()
    }
}

impl<T> Action<T> for PipelineAction<T> {
    fn apply(&self, input: T, mut log: Option<&mut StatusLog>) -> Result<T, ActionError> {
        let mut current = input;
        for (index, stage) in self.stages.iter().enumerate() {
            tracing::debug!(stage = index, kind = stage.kind(), "Running pipeline stage");
            current = match stage.apply(current, log.as_deref_mut()) {
                Ok(output) => output,
                Err(err) => {
                    tracing::debug!(stage = index, errors = ?err.log().map(StatusLog::error_count), "Pipeline stage failed");
                    return Err(err);
                }
            };
        }
        Ok(current)
    }
}

impl<T> FastAction<T> for PipelineAction<T> {
    fn fast_apply(
        &self,
        input: T,
        mask: SeverityMask,
        events: &mut Vec<Event>,
        path: Option<&EventPath>,
    ) -> Option<T> {
        let mut current = input;
        for (index, stage) in self.stages.iter().enumerate() {
            tracing::debug!(stage = index, kind = stage.kind(), "Running pipeline stage");
            match stage.fast_apply(current, mask, events, path) {
                Some(output) => current = output,
                None => {
                    tracing::debug!(stage = index, "Pipeline stage failed");
                    return None;
                }
            }
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Adds a constant, counting how often it ran.
    struct Add {
        amount: i64,
        runs: Arc<AtomicUsize>,
    }

    impl Action<i64> for Add {
        fn apply(&self, input: i64, log: Option<&mut StatusLog>) -> Result<i64, ActionError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if let Some(log) = log {
                log.add_info(None, format!("add {}", self.amount));
            }
            Ok(input + self.amount)
        }
    }

    /// Fails on negative numbers through the fast convention.
    struct RejectNegative;

    impl FastAction<i64> for RejectNegative {
        fn fast_apply(
            &self,
            input: i64,
            mask: SeverityMask,
            events: &mut Vec<Event>,
            path: Option<&EventPath>,
        ) -> Option<i64> {
            if input >= 0 {
                return Some(input);
            }
            if mask.contains(crate::event::Severity::Error) {
                events.push(Event::error("Negative").with_code("negative").prefixed(path));
            }
            None
        }
    }

    fn add(amount: i64, runs: &Arc<AtomicUsize>) -> Add {
        Add {
            amount,
            runs: runs.clone(),
        }
    }

    #[test]
    fn test_empty_pipeline_returns_input() {
        let pipeline = PipelineAction::<i64>::new();
        assert_eq!(pipeline.apply(5, None).unwrap(), 5);
        let mut events = Vec::new();
        assert_eq!(pipeline.fast_apply(5, SeverityMask::ALL, &mut events, None), Some(5));
    }

    #[test]
    fn test_stages_run_in_order() {
        let runs = Arc::new(AtomicUsize::new(0));
        let pipeline = PipelineAction::new()
            .with_action(add(1, &runs))
            .with_fast(RejectNegative)
            .with_action(add(10, &runs));
        let mut log = StatusLog::default();
        assert_eq!(pipeline.apply(-1, Some(&mut log)).unwrap(), 10);
        let messages: Vec<_> = log.events().iter().filter_map(|e| e.message.clone()).collect();
        assert_eq!(messages, vec!["add 1", "add 10"]);
    }

    #[test]
    fn test_failure_short_circuits() {
        let runs = Arc::new(AtomicUsize::new(0));
        let pipeline = PipelineAction::new()
            .with_action(add(-5, &runs))
            .with_fast(RejectNegative)
            .with_action(add(100, &runs));

        let mut log = StatusLog::default();
        let err = pipeline.apply(1, Some(&mut log)).unwrap_err();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(err.log().unwrap().error_count(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_fast_failure_short_circuits_with_path() {
        let runs = Arc::new(AtomicUsize::new(0));
        let pipeline = PipelineAction::new()
            .with_fast(RejectNegative)
            .with_action(add(1, &runs));

        let mut events = Vec::new();
        let path = EventPath::from("amount");
        assert_eq!(pipeline.fast_apply(-3, SeverityMask::ALL, &mut events, Some(&path)), None);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(events[0].path, Some(path));
    }

    #[test]
    fn test_slow_stage_is_emulated_in_fast_mode() {
        let runs = Arc::new(AtomicUsize::new(0));
        let pipeline = PipelineAction::new().with_action(add(2, &runs));
        let mut events = Vec::new();
        let out = pipeline.fast_apply(1, SeverityMask::INFO, &mut events, Some(&EventPath::from("n")));
        assert_eq!(out, Some(3));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path.as_ref().unwrap().to_string(), "n");
    }

    #[test]
    fn test_fast_stage_without_log_fails_without_log() {
        let pipeline = PipelineAction::new().with_fast(RejectNegative);
        let err = pipeline.apply(-1, None).unwrap_err();
        assert!(err.log().is_none());
    }

    #[test]
    fn test_nested_pipelines() {
        let runs = Arc::new(AtomicUsize::new(0));
        let inner = PipelineAction::new().with_action(add(1, &runs)).with_action(add(1, &runs));
        let outer = PipelineAction::new().with_action(inner).with_fast(RejectNegative);
        assert_eq!(outer.apply(0, None).unwrap(), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
