//! Scalar values read out of output documents, and their conversion into
//! the declared type of a spec field

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A terminal (non-composite) value found in an output document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    /// Whole numbers above `i64::MAX`
    Unsigned(u64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) | Self::Unsigned(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Convert a JSON value, returning `None` for null, maps and lists
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => Some(if let Some(i) = n.as_i64() {
                Self::Integer(i)
            } else if let Some(u) = n.as_u64() {
                Self::Unsigned(u)
            } else {
                Self::Float(n.as_f64().unwrap_or(f64::NAN))
            }),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Unsigned(u) => write!(f, "{u}"),
            // JSON number text, so 1.0 stays "1.0"
            Self::Float(x) => match serde_json::Number::from_f64(*x) {
                Some(n) => write!(f, "{n}"),
                None => write!(f, "{x}"),
            },
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A scalar could not be coerced into the field's declared type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert {found} value '{value}' to {expected}")]
pub struct ConversionError {
    /// Declared type of the spec field
    pub expected: &'static str,
    /// Type of the value found in the output document
    pub found: &'static str,
    /// The offending value, rendered as text
    pub value: String,
}

impl ConversionError {
    fn new(expected: &'static str, found: &ScalarValue) -> Self {
        Self {
            expected,
            found: found.type_name(),
            value: found.to_string(),
        }
    }
}

/// A type that a reference can resolve into
///
/// Implemented for the literal types carried by value-or-ref fields.
pub trait Scalar: Sized + Clone + Send {
    /// Declared type name, used in error reports
    const TYPE_NAME: &'static str;

    /// Coerce an extracted scalar into this type
    fn from_scalar(value: &ScalarValue) -> Result<Self, ConversionError>;
}

impl Scalar for String {
    const TYPE_NAME: &'static str = "string";

    fn from_scalar(value: &ScalarValue) -> Result<Self, ConversionError> {
        Ok(value.to_string())
    }
}

impl Scalar for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_scalar(value: &ScalarValue) -> Result<Self, ConversionError> {
        match value {
            ScalarValue::Bool(b) => Ok(*b),
            ScalarValue::String(s) => match s.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
            },
            _ => Err(ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

impl Scalar for f64 {
    const TYPE_NAME: &'static str = "double";

    fn from_scalar(value: &ScalarValue) -> Result<Self, ConversionError> {
        match value {
            ScalarValue::Float(x) => Ok(*x),
            ScalarValue::Integer(i) => Ok(*i as f64),
            ScalarValue::Unsigned(u) => Ok(*u as f64),
            ScalarValue::String(s) => s
                .trim()
                .parse()
                .map_err(|_| ConversionError::new(Self::TYPE_NAME, value)),
            ScalarValue::Bool(_) => Err(ConversionError::new(Self::TYPE_NAME, value)),
        }
    }
}

macro_rules! integer_scalar {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl Scalar for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_scalar(value: &ScalarValue) -> Result<Self, ConversionError> {
                    let wide = integer_value(value)
                        .ok_or_else(|| ConversionError::new(Self::TYPE_NAME, value))?;
                    <$ty>::try_from(wide).map_err(|_| ConversionError::new(Self::TYPE_NAME, value))
                }
            }
        )+
    };
}

integer_scalar! {
    i32 => "int32",
    i64 => "int64",
    u32 => "uint32",
}

/// Widen a scalar to i128 when it denotes a whole number
fn integer_value(value: &ScalarValue) -> Option<i128> {
    match value {
        ScalarValue::Integer(i) => Some(i128::from(*i)),
        ScalarValue::Unsigned(u) => Some(i128::from(*u)),
        ScalarValue::Float(x) if x.fract() == 0.0 && x.is_finite() && x.abs() < 1e30 => {
            Some(*x as i128)
        }
        ScalarValue::String(s) => s.trim().parse::<i128>().ok(),
        _ => None,
    }
}
