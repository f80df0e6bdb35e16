//! Schema System - Declarative Validation Contracts
//!
//! A schema file names an ordered list of format stages. Each stage sees the
//! previous stage's output, so `"1;2;3"` can be split into a list and then
//! checked as a list of integers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::action::FormatAction;
use crate::format::{
    BooleanFormat, ChoiceFormat, Field, Format, IntegerFormat, ListFormat, OptionalFormat,
    RecordFormat, StringFormat, DEFAULT_DELIMITERS,
};
use crate::pipeline::PipelineAction;

pub type SchemaId = String;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid schema {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub id: SchemaId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub schema_version: String,
    pub engine_min_version: String,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub superseded_by: Option<String>,
    #[serde(default)]
    pub stages: Vec<FormatSpec>,
}

impl Schema {
    /// One format stage per entry, in file order.
    pub fn build_pipeline(&self) -> PipelineAction<Value> {
        let mut pipeline = PipelineAction::new();
        for spec in &self.stages {
            pipeline.add_fast(FormatAction::new(spec.build()));
        }
        pipeline
    }
}

fn default_true() -> bool { true }

fn default_delimiters() -> String { DEFAULT_DELIMITERS.to_string() }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FormatSpec {
    #[serde(rename_all = "camelCase")]
    String {
        #[serde(default = "default_true")]
        trim: bool,
        #[serde(default)]
        min_length: Option<usize>,
        #[serde(default)]
        max_length: Option<usize>,
    },
    Integer {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    Boolean,
    Choice {
        options: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    List {
        #[serde(default = "default_delimiters")]
        delimiters: String,
        #[serde(default)]
        item: Option<Box<FormatSpec>>,
        #[serde(default)]
        min_items: Option<usize>,
        #[serde(default)]
        max_items: Option<usize>,
    },
    Record {
        fields: Vec<FieldSpec>,
    },
    Optional {
        inner: Box<FormatSpec>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default = "default_true")]
    pub required: bool,
    pub format: FormatSpec,
}

impl FormatSpec {
    pub fn build(&self) -> Box<dyn Format> {
        match self {
            Self::String { trim, min_length, max_length } => Box::new(StringFormat {
                trim: *trim,
                min_length: *min_length,
                max_length: *max_length,
            }),
            Self::Integer { min, max } => Box::new(IntegerFormat::range(*min, *max)),
            Self::Boolean => Box::new(BooleanFormat),
            Self::Choice { options } => Box::new(ChoiceFormat::new(options.iter().cloned())),
            Self::List { delimiters, item, min_items, max_items } => Box::new(ListFormat {
                delimiters: delimiters.clone(),
                item: item.as_ref().map(|spec| spec.build()),
                min_items: *min_items,
                max_items: *max_items,
            }),
            Self::Record { fields } => {
                let mut record = RecordFormat::new();
                for field in fields {
                    record.push(Field {
                        name: field.name.clone(),
                        format: field.format.build(),
                        required: field.required,
                    });
                }
                Box::new(record)
            }
            Self::Optional { inner } => Box::new(OptionalFormat {
                inner: inner.build(),
            }),
        }
    }
}

/// Schema registry - loads and caches schemas
pub struct SchemaRegistry {
    schemas: HashMap<SchemaId, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self { schemas: HashMap::new() }
    }

    /// Every `*.json` file in `dir`. Unparseable files are skipped with a warning;
    /// a missing directory yields an empty registry.
    pub fn load_from_dir(dir: &Path) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "Schema directory does not exist");
            return Ok(registry);
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                match Self::load_file(&path) {
                    Ok(schema) => {
                        tracing::debug!(id = %schema.id, file = %path.display(), "Loaded schema");
                        registry.register(schema);
                    }
                    Err(e) => tracing::warn!(error = %e, "Skipping schema file"),
                }
            }
        }
        Ok(registry)
    }

    pub fn load_file(path: &Path) -> Result<Schema, SchemaError> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| SchemaError::Parse {
            file: path.display().to_string(),
            source,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id)
    }

    /// Sorted by id so listings are stable.
    pub fn list(&self) -> Vec<&Schema> {
        let mut schemas: Vec<_> = self.schemas.values().collect();
        schemas.sort_by(|a, b| a.id.cmp(&b.id));
        schemas
    }

    pub fn register(&mut self, schema: Schema) {
        self.schemas.insert(schema.id.clone(), schema);
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
