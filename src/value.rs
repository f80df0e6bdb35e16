//! Untrusted Input Values
//!
//! Formats see either a raw JSON value or an object that knows how to turn
//! itself into one. Conversion is resolved before any format looks at it.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Conversion chains longer than this are treated as cycles.
pub const MAX_CONVERSION_DEPTH: usize = 16;

/// Capability of a domain object to present itself as a primitive input.
///
/// The result may itself be convertible; resolution follows the chain.
pub trait ToPrimitive: fmt::Debug + Send + Sync {
    fn to_primitive(&self) -> Input;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Value conversion exceeded {0} levels")]
    TooDeep(usize),
}

#[derive(Debug, Clone)]
pub enum Input {
    Primitive(Value),
    Convertible(Arc<dyn ToPrimitive>),
}

impl Input {
    pub fn convertible(object: impl ToPrimitive + 'static) -> Self {
        Self::Convertible(Arc::new(object))
    }

    /// Follow `to_primitive` until a raw value comes out.
    pub fn resolve(&self) -> Result<Value, ConversionError> {
        let mut current = match self {
            Self::Primitive(value) => return Ok(value.clone()),
            Self::Convertible(object) => object.to_primitive(),
        };
        for _ in 1..MAX_CONVERSION_DEPTH {
            match current {
                Self::Primitive(value) => return Ok(value),
                Self::Convertible(object) => current = object.to_primitive(),
            }
        }
        match current {
            Self::Primitive(value) => Ok(value),
            Self::Convertible(_) => Err(ConversionError::TooDeep(MAX_CONVERSION_DEPTH)),
        }
    }

    pub fn as_primitive(&self) -> Option<&Value> {
        match self {
            Self::Primitive(value) => Some(value),
            Self::Convertible(_) => None,
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::Primitive(value)
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Self::Primitive(Value::String(s.to_string()))
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Self::Primitive(Value::String(s))
    }
}

impl From<i64> for Input {
    fn from(n: i64) -> Self {
        Self::Primitive(Value::from(n))
    }
}

impl From<bool> for Input {
    fn from(b: bool) -> Self {
        Self::Primitive(Value::Bool(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct UserId(i64);

    impl ToPrimitive for UserId {
        fn to_primitive(&self) -> Input {
            Input::from(self.0)
        }
    }

    #[derive(Debug)]
    struct Wrapper(Arc<dyn ToPrimitive>);

    impl ToPrimitive for Wrapper {
        fn to_primitive(&self) -> Input {
            Input::Convertible(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct Loop;

    impl ToPrimitive for Loop {
        fn to_primitive(&self) -> Input {
            Input::convertible(Loop)
        }
    }

    #[test]
    fn test_primitive_resolves_to_itself() {
        assert_eq!(Input::from("x").resolve().unwrap(), json!("x"));
    }

    #[test]
    fn test_nested_conversion() {
        let input = Input::convertible(Wrapper(Arc::new(UserId(7))));
        assert_eq!(input.resolve().unwrap(), json!(7));
    }

    #[test]
    fn test_cycle_is_bounded() {
        let err = Input::convertible(Loop).resolve().unwrap_err();
        assert_eq!(err, ConversionError::TooDeep(MAX_CONVERSION_DEPTH));
    }
}
