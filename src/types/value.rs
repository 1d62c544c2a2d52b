use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::EvalError;

/// Dynamically typed scalar used both for parsed literals and for values
/// resolved from an input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string. Field paths are stored here as well.
    String(String),
}

impl Value {
    /// Recognize a literal token: `true`/`false`, then an integer, then a
    /// finite float. Anything else is kept verbatim as a string (a field path or a
    /// bare string literal).
    #[must_use]
    pub fn from_literal(token: &str) -> Value {
        match token {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => {
                if let Ok(v) = token.parse::<i64>() {
                    Value::Int(v)
                } else if looks_numeric(token) {
                    match token.parse::<f64>() {
                        Ok(v) if v.is_finite() => Value::Float(v),
                        _ => Value::String(token.to_owned()),
                    }
                } else {
                    Value::String(token.to_owned())
                }
            }
        }
    }

    /// Name of the value's tag, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
        }
    }

    /// Returns `true` when both values carry the same tag.
    #[must_use]
    pub fn same_type(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

// `inf`, `nan` and friends parse as f64 but are far more likely to be field names.
fn looks_numeric(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
}

impl TryFrom<&serde_json::Value> for Value {
    type Error = EvalError;

    #[allow(clippy::cast_precision_loss)]
    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(EvalError::UnsupportedType {
                        found: "number".to_owned(),
                    })
                }
            }
            serde_json::Value::Null => Err(EvalError::UnsupportedType {
                found: "null".to_owned(),
            }),
            serde_json::Value::Array(_) => Err(EvalError::UnsupportedType {
                found: "array".to_owned(),
            }),
            serde_json::Value::Object(_) => Err(EvalError::UnsupportedType {
                found: "object".to_owned(),
            }),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// Renders the literal token that [`Value::from_literal`] maps back to the
/// same value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}
