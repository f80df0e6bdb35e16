//! Formats - Single-Value Extract and Validate
//!
//! A format turns an untrusted value into a trusted one or records why it
//! cannot. Failure is reported through the log and a `None` return, never a
//! panic, so callers can validate a whole tree and collect every problem.

use serde_json::{Map, Value};
use std::fmt;

use crate::event::{child_path, EventPath};
use crate::status_log::StatusLog;
use crate::value::Input;

pub const DEFAULT_DELIMITERS: &str = ",;\n";

pub trait Format: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Validated value, or `None` after logging at least one error at `path`.
    fn extract(&self, value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value>;

    /// Standalone validation with a fresh log that records everything.
    fn validate(&self, value: Input) -> Result<Value, StatusLog> {
        let mut log = StatusLog::default();
        match self.extract(&value, &mut log, None) {
            Some(value) => Ok(value),
            None => Err(log),
        }
    }
}

impl<F: Format + ?Sized> Format for Box<F> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn extract(&self, value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value> {
        (**self).extract(value, log, path)
    }
}

fn resolve(value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value> {
    match value.resolve() {
        Ok(value) => Some(value),
        Err(err) => {
            log.add_error_code(path, err.to_string(), "conversion");
            None
        }
    }
}

fn type_error(log: &mut StatusLog, path: Option<&EventPath>, expected: &str) -> Option<Value> {
    log.add_error_code(path, format!("Expected {}", expected), "type");
    None
}

// --- Scalar formats ---

#[derive(Debug, Clone, Default)]
pub struct StringFormat {
    pub trim: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl StringFormat {
    pub fn trimmed() -> Self {
        Self {
            trim: true,
            ..Self::default()
        }
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }
}

impl Format for StringFormat {
    fn name(&self) -> &'static str { "string" }

    fn extract(&self, value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value> {
        let text = match resolve(value, log, path)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return type_error(log, path, "a string"),
        };
        let text = if self.trim { text.trim().to_string() } else { text };

        let length = text.chars().count();
        if let Some(min) = self.min_length {
            if length < min {
                log.add_error_code(path, format!("Must be at least {} characters", min), "min_length");
                return None;
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                log.add_error_code(path, format!("Must be at most {} characters", max), "max_length");
                return None;
            }
        }
        Some(Value::String(text))
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntegerFormat {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl IntegerFormat {
    pub fn range(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    fn parse(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl Format for IntegerFormat {
    fn name(&self) -> &'static str { "integer" }

    fn extract(&self, value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value> {
        let resolved = resolve(value, log, path)?;
        let Some(n) = Self::parse(&resolved) else {
            return type_error(log, path, "an integer");
        };
        if let Some(min) = self.min {
            if n < min {
                log.add_error_code(path, format!("Must be at least {}", min), "min");
                return None;
            }
        }
        if let Some(max) = self.max {
            if n > max {
                log.add_error_code(path, format!("Must be at most {}", max), "max");
                return None;
            }
        }
        Some(Value::from(n))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanFormat;

impl Format for BooleanFormat {
    fn name(&self) -> &'static str { "boolean" }

    fn extract(&self, value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value> {
        let parsed = match resolve(value, log, path)? {
            Value::Bool(b) => Some(b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        match parsed {
            Some(b) => Some(Value::Bool(b)),
            None => type_error(log, path, "a boolean"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChoiceFormat {
    pub options: Vec<String>,
}

impl ChoiceFormat {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

impl Format for ChoiceFormat {
    fn name(&self) -> &'static str { "choice" }

    fn extract(&self, value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value> {
        let Value::String(s) = resolve(value, log, path)? else {
            return type_error(log, path, "a string");
        };
        if self.options.iter().any(|o| *o == s) {
            Some(Value::String(s))
        } else {
            log.add_error_code(
                path,
                format!("Must be one of: {}", self.options.join(", ")),
                "choice",
            );
            None
        }
    }
}

// --- Composite formats ---

/// Split on any delimiter character, trim, drop empty elements.
pub fn split_list(text: &str, delimiters: &str) -> Vec<String> {
    text.split(|c: char| delimiters.contains(c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Delimited string to list. A value that is already a list passes through.
#[derive(Debug)]
pub struct ListFormat {
    pub delimiters: String,
    pub item: Option<Box<dyn Format>>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

impl ListFormat {
    pub fn new(delimiters: impl Into<String>) -> Self {
        Self {
            delimiters: delimiters.into(),
            item: None,
            min_items: None,
            max_items: None,
        }
    }

    pub fn with_item(mut self, item: impl Format + 'static) -> Self {
        self.item = Some(Box::new(item));
        self
    }

    pub fn with_count(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_items = min;
        self.max_items = max;
        self
    }
}

impl Default for ListFormat {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITERS)
    }
}

impl Format for ListFormat {
    fn name(&self) -> &'static str { "list" }

    fn extract(&self, value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value> {
        let items = match resolve(value, log, path)? {
            Value::Array(items) => items,
            Value::String(s) => split_list(&s, &self.delimiters)
                .into_iter()
                .map(Value::String)
                .collect(),
            _ => return type_error(log, path, "a list"),
        };

        if let Some(min) = self.min_items {
            if items.len() < min {
                log.add_error_code(path, format!("Must contain at least {} items", min), "min_items");
                return None;
            }
        }
        if let Some(max) = self.max_items {
            if items.len() > max {
                log.add_error_code(path, format!("Must contain at most {} items", max), "max_items");
                return None;
            }
        }

        let Some(item_format) = &self.item else {
            return Some(Value::Array(items));
        };

        let mut valid = true;
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let item_path = child_path(path, index.to_string());
            match item_format.extract(&Input::Primitive(item), log, Some(&item_path)) {
                Some(v) => out.push(v),
                None => valid = false,
            }
        }
        valid.then_some(Value::Array(out))
    }
}

#[derive(Debug)]
pub struct Field {
    pub name: String,
    pub format: Box<dyn Format>,
    pub required: bool,
}

/// JSON object with named, individually validated fields. Unknown keys are dropped.
#[derive(Debug, Default)]
pub struct RecordFormat {
    pub fields: Vec<Field>,
}

impl RecordFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, format: impl Format + 'static, required: bool) -> Self {
        self.fields.push(Field {
            name: name.into(),
            format: Box::new(format),
            required,
        });
        self
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }
}

impl Format for RecordFormat {
    fn name(&self) -> &'static str { "record" }

    fn extract(&self, value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value> {
        let Value::Object(mut object) = resolve(value, log, path)? else {
            return type_error(log, path, "an object");
        };

        let mut valid = true;
        let mut out = Map::new();
        for field in &self.fields {
            let field_path = child_path(path, field.name.as_str());
            match object.remove(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        log.add_error_code(Some(&field_path), "Field is required", "required");
                        valid = false;
                    }
                }
                Some(raw) => {
                    match field.format.extract(&Input::Primitive(raw), log, Some(&field_path)) {
                        Some(v) => {
                            out.insert(field.name.clone(), v);
                        }
                        None => valid = false,
                    }
                }
            }
        }
        valid.then_some(Value::Object(out))
    }
}

/// Accepts null as null, otherwise delegates.
#[derive(Debug)]
pub struct OptionalFormat {
    pub inner: Box<dyn Format>,
}

impl OptionalFormat {
    pub fn new(inner: impl Format + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Format for OptionalFormat {
    fn name(&self) -> &'static str { "optional" }

    fn extract(&self, value: &Input, log: &mut StatusLog, path: Option<&EventPath>) -> Option<Value> {
        match resolve(value, log, path)? {
            Value::Null => Some(Value::Null),
            resolved => self.inner.extract(&Input::Primitive(resolved), log, path),
        }
    }
}
