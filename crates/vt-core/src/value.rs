//! Raw value model: closed base-type tags and typed values.

use std::fmt;

use crate::error::{TreeError, TreeResult};

/// Base type of a variable's raw value, fixed at creation.
///
/// Enumerated variables store a `UInt` key; the enumeration itself is a
/// display discipline, not a base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Unsigned integer.
    UInt,
    /// Boolean.
    Bool,
    /// Floating point.
    Float,
    /// Free-form string.
    Str,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UInt => "uint",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Str => "string",
        };
        f.write_str(s)
    }
}

/// A variable's raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unsigned integer value.
    UInt(u64),
    /// Boolean value.
    Bool(bool),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
}

impl Value {
    /// Base type tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::UInt(_) => ValueKind::UInt,
            Self::Bool(_) => ValueKind::Bool,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
        }
    }

    /// Default value for a base type, used before the first read or write.
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::UInt => Self::UInt(0),
            ValueKind::Bool => Self::Bool(false),
            ValueKind::Float => Self::Float(0.0),
            ValueKind::Str => Self::Str(String::new()),
        }
    }

    /// Canonical textual form, used by the plain display discipline.
    pub fn to_text(&self) -> String {
        match self {
            Self::UInt(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Str(v) => v.clone(),
        }
    }

    /// Parse the textual form back into a value of `kind`.
    ///
    /// Leading/trailing whitespace is ignored. Unsigned integers accept an
    /// optional `0x` prefix for hexadecimal input. Booleans accept
    /// `true`/`false` in any case. Failure is [`TreeError::InvalidInput`].
    pub fn parse_as(kind: ValueKind, text: &str) -> TreeResult<Self> {
        let invalid = || TreeError::InvalidInput {
            kind,
            input: text.to_string(),
        };
        let trimmed = text.trim();
        match kind {
            ValueKind::UInt => {
                let parsed = match trimmed.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => trimmed.parse::<u64>(),
                };
                parsed.map(Self::UInt).map_err(|_| invalid())
            }
            ValueKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(invalid()),
            },
            ValueKind::Float => trimmed.parse::<f64>().map(Self::Float).map_err(|_| invalid()),
            ValueKind::Str => Ok(Self::Str(text.to_string())),
        }
    }

    /// Unsigned integer view, if this is a `UInt`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view: `UInt` and `Float` values as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean view, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// String view, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags() {
        assert_eq!(Value::UInt(3).kind(), ValueKind::UInt);
        assert_eq!(Value::Bool(true).kind(), ValueKind::Bool);
        assert_eq!(Value::Float(1.5).kind(), ValueKind::Float);
        assert_eq!(Value::from("x").kind(), ValueKind::Str);
    }

    #[test]
    fn parse_uint_decimal_and_hex() {
        assert_eq!(
            Value::parse_as(ValueKind::UInt, "42").unwrap(),
            Value::UInt(42)
        );
        assert_eq!(
            Value::parse_as(ValueKind::UInt, "0xff").unwrap(),
            Value::UInt(255)
        );
        assert!(Value::parse_as(ValueKind::UInt, "-1").is_err());
        assert!(Value::parse_as(ValueKind::UInt, "nope").is_err());
    }

    #[test]
    fn parse_bool_any_case() {
        assert_eq!(
            Value::parse_as(ValueKind::Bool, "True").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            Value::parse_as(ValueKind::Bool, "false").unwrap(),
            Value::Bool(false)
        );
        assert!(Value::parse_as(ValueKind::Bool, "2").is_err());
    }

    #[test]
    fn parse_failure_is_invalid_input() {
        let err = Value::parse_as(ValueKind::Float, "abc").unwrap_err();
        assert!(matches!(err, TreeError::InvalidInput { .. }));
    }

    #[test]
    fn string_parse_preserves_whitespace() {
        assert_eq!(
            Value::parse_as(ValueKind::Str, " padded ").unwrap(),
            Value::from(" padded ")
        );
    }
}
