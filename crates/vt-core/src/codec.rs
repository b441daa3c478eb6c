//! Display codec: plain/enum/range conversion between raw and display values.
//!
//! Every variable carries one [`DisplaySpec`] fixed at creation:
//! - **Plain**: canonical text of the base type.
//! - **Enum**: raw `UInt` key into an ordered key-to-label mapping.
//! - **Range**: numeric value held to inclusive bounds. Out-of-range input
//!   is rejected, never clamped, so a bad edit cannot silently lose data.

use std::collections::BTreeMap;

use crate::error::{TreeError, TreeResult};
use crate::value::{Value, ValueKind};

/// Ordered enumeration: raw key to display label.
///
/// Keys iterate in ascending order so a consumer populating a selection list
/// sees a deterministic layout; positional lookups ([`EnumSpec::key_at`],
/// [`EnumSpec::index_of_key`]) follow that same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSpec {
    entries: BTreeMap<u64, String>,
}

impl EnumSpec {
    /// Build an enumeration from key/label pairs.
    ///
    /// Labels must be unique; a duplicate label (or duplicate key) is a
    /// tree-assembly error reported as [`TreeError::DuplicateName`].
    pub fn new<I, S>(entries: I) -> TreeResult<Self>
    where
        I: IntoIterator<Item = (u64, S)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (key, label) in entries {
            let label = label.into();
            if map.values().any(|existing| *existing == label) {
                return Err(TreeError::DuplicateName { name: label });
            }
            if map.insert(key, label.clone()).is_some() {
                return Err(TreeError::DuplicateName { name: label });
            }
        }
        Ok(Self { entries: map })
    }

    /// Label for a raw key.
    pub fn label_for_key(&self, key: u64) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    /// Raw key for a display label.
    pub fn key_for_label(&self, label: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(k, _)| *k)
    }

    /// Raw key at a list position, for consumers that select by index.
    pub fn key_at(&self, index: usize) -> Option<u64> {
        self.entries.keys().nth(index).copied()
    }

    /// List position of a raw key.
    pub fn index_of_key(&self, key: u64) -> Option<usize> {
        self.entries.keys().position(|k| *k == key)
    }

    /// Labels in key order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    /// Key/label pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.entries.iter().map(|(k, l)| (*k, l.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the enumeration is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Inclusive numeric bounds for the range display discipline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSpec {
    /// Inclusive lower bound.
    pub minimum: f64,
    /// Inclusive upper bound.
    pub maximum: f64,
}

impl RangeSpec {
    /// Build a range, rejecting an inverted or non-finite bound pair.
    pub fn new(minimum: f64, maximum: f64) -> TreeResult<Self> {
        if !minimum.is_finite() || !maximum.is_finite() || minimum > maximum {
            return Err(TreeError::InvalidInput {
                kind: ValueKind::Float,
                input: format!("range bounds [{minimum}, {maximum}]"),
            });
        }
        Ok(Self { minimum, maximum })
    }

    /// Whether a numeric value lies within the bounds.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.minimum && value <= self.maximum
    }

    /// Check a raw value against the bounds.
    ///
    /// Non-numeric values are a [`TreeError::TypeMismatch`]; out-of-bounds
    /// values are [`TreeError::OutOfRange`].
    pub fn check(&self, value: &Value) -> TreeResult<()> {
        let numeric = value.as_f64().ok_or(TreeError::TypeMismatch {
            expected: ValueKind::Float,
            found: value.kind(),
        })?;
        if self.contains(numeric) {
            Ok(())
        } else {
            Err(TreeError::OutOfRange {
                value: numeric,
                minimum: self.minimum,
                maximum: self.maximum,
            })
        }
    }
}

/// Display discipline of a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplaySpec {
    /// Canonical text of the base type.
    Plain,
    /// Raw `UInt` key mapped to an ordered label set.
    Enum(EnumSpec),
    /// Numeric value held to inclusive bounds.
    Range(RangeSpec),
}

impl DisplaySpec {
    /// Convert a raw value to its display form.
    pub fn to_display(&self, value: &Value) -> TreeResult<String> {
        match self {
            Self::Plain | Self::Range(_) => Ok(value.to_text()),
            Self::Enum(spec) => {
                let key = value.as_u64().ok_or(TreeError::TypeMismatch {
                    expected: ValueKind::UInt,
                    found: value.kind(),
                })?;
                spec.label_for_key(key)
                    .map(str::to_string)
                    .ok_or_else(|| TreeError::InvalidEnumSelection {
                        input: key.to_string(),
                    })
            }
        }
    }

    /// Parse a display form back into a raw value of `kind`.
    ///
    /// For enums the input is a label; consumers that select by list index
    /// resolve the index through [`EnumSpec::key_at`] first. Failure leaves
    /// the caller free to keep its previous value; nothing is mutated here.
    pub fn from_display(&self, kind: ValueKind, input: &str) -> TreeResult<Value> {
        match self {
            Self::Plain => Value::parse_as(kind, input),
            Self::Enum(spec) => spec
                .key_for_label(input)
                .map(Value::UInt)
                .ok_or_else(|| TreeError::InvalidEnumSelection {
                    input: input.to_string(),
                }),
            Self::Range(range) => {
                let value = Value::parse_as(kind, input)?;
                range.check(&value)?;
                Ok(value)
            }
        }
    }

    /// Validate a raw value against this discipline.
    ///
    /// Range bounds are enforced; enum keys must have a label. Plain accepts
    /// any value of the base type.
    pub fn validate(&self, value: &Value) -> TreeResult<()> {
        match self {
            Self::Plain => Ok(()),
            Self::Enum(spec) => {
                let key = value.as_u64().ok_or(TreeError::TypeMismatch {
                    expected: ValueKind::UInt,
                    found: value.kind(),
                })?;
                if spec.label_for_key(key).is_some() {
                    Ok(())
                } else {
                    Err(TreeError::InvalidEnumSelection {
                        input: key.to_string(),
                    })
                }
            }
            Self::Range(range) => range.check(value),
        }
    }

    /// The enumeration, when this is the enum discipline.
    pub fn enum_spec(&self) -> Option<&EnumSpec> {
        match self {
            Self::Enum(spec) => Some(spec),
            _ => None,
        }
    }

    /// The bounds, when this is the range discipline.
    pub fn range_spec(&self) -> Option<&RangeSpec> {
        match self {
            Self::Range(spec) => Some(spec),
            _ => None,
        }
    }
}
