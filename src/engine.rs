//! Validation Engine - Single Entry Point
//!
//! Resolves a schema, checks it against the running engine version, runs its
//! pipeline and packages the outcome as a report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::action::Action;
use crate::event::{Event, SeverityMask};
use crate::hashing::compute_output_hash;
use crate::schema::{Schema, SchemaRegistry};
use crate::status_log::StatusLog;
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Schema {0} requires engine >= {1}, current is {2}")]
    EngineVersionMismatch(String, String, String),

    #[error("Invalid version string {0:?}: {1}")]
    InvalidVersion(String, #[source] semver::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub id: String,
    pub schema_id: String,
    pub schema_version: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub valid: bool,
    pub output: Option<Value>,
    pub output_hash: Option<String>,
    pub events: Vec<Event>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.events.iter().any(Event::is_error)
    }
}

pub struct ValidationEngine {
    registry: SchemaRegistry,
    mask: SeverityMask,
}

impl ValidationEngine {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            mask: SeverityMask::ALL,
        }
    }

    /// Severities recorded in reports.
    pub fn with_mask(mut self, mask: SeverityMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn list_schemas(&self) -> Vec<&Schema> {
        self.registry.list()
    }

    pub fn get_schema(&self, id: &str) -> Option<&Schema> {
        self.registry.get(id)
    }

    /// Validate a payload against a schema.
    ///
    /// An invalid payload is a successful call with `valid: false`; `Err` is
    /// reserved for configuration problems.
    pub fn validate_payload(
        &self,
        schema_id: &str,
        payload: Value,
    ) -> Result<ValidationReport, EngineError> {
        let schema = self
            .registry
            .get(schema_id)
            .ok_or_else(|| EngineError::SchemaNotFound(schema_id.to_string()))?;

        self.check_engine_version(schema)?;
        if schema.deprecated {
            tracing::warn!(
                schema = %schema.id,
                superseded_by = ?schema.superseded_by,
                "Validating against deprecated schema"
            );
        }

        let pipeline = schema.build_pipeline();
        let mut log = StatusLog::new(self.mask);
        let output = match pipeline.apply(payload, Some(&mut log)) {
            Ok(output) => Some(output),
            Err(err) => {
                tracing::info!(schema = %schema.id, errors = %err, "Payload rejected");
                None
            }
        };

        let output_hash = output
            .as_ref()
            .map(|output| compute_output_hash(schema, output))
            .transpose()?;

        Ok(ValidationReport {
            id: Uuid::new_v4().to_string(),
            schema_id: schema.id.clone(),
            schema_version: schema.schema_version.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            valid: output.is_some(),
            output,
            output_hash,
            events: log.into_events(),
        })
    }

    fn check_engine_version(&self, schema: &Schema) -> Result<(), EngineError> {
        let parse = |v: &str| {
            semver::Version::parse(v).map_err(|e| EngineError::InvalidVersion(v.to_string(), e))
        };
        let engine_ver = parse(ENGINE_VERSION)?;
        let min_ver = parse(&schema.engine_min_version)?;

        if engine_ver < min_ver {
            return Err(EngineError::EngineVersionMismatch(
                schema.id.clone(),
                schema.engine_min_version.clone(),
                ENGINE_VERSION.to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new(SchemaRegistry::default())
    }
}
