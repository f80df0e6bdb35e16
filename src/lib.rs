//! Solver Core - Validation and Transformation Pipelines
//!
//! # Ground Rules
//! 1. Formats Log, They Never Throw
//! 2. Actions Fail With Their Log Attached
//! 3. The Fast Path Is The Same Contract
//! 4. Pipelines Stop At The First Failure
//! 5. Logs Are Passed, Never Global

pub mod event;
pub mod status_log;
pub mod value;
pub mod format;
pub mod action;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod hashing;
pub mod engine;

pub use event::{Event, EventPath, LogFormatError, Severity, SeverityMask};
pub use status_log::{EventProvider, PathRemap, StatusLog};
pub use value::{Input, ToPrimitive};
pub use format::{Format, ListFormat, RecordFormat, split_list};
pub use action::{Action, FastAction, FormatAction, AsAction, AsFast, apply_via_fast_apply, emulate_fast_apply};
pub use error::ActionError;
pub use pipeline::{PipelineAction, Stage};
pub use schema::{Schema, SchemaRegistry, FormatSpec};
pub use hashing::compute_output_hash;
pub use engine::{ValidationEngine, ValidationReport, EngineError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
