#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single cell of an activity sample stream.
///
/// Missing is an explicit variant rather than a sentinel, so a genuine
/// `Number(0.0)` is never conflated with an absent sample. A `Number`
/// holding NaN is also treated as missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(v) => v.is_nan(),
            Self::Text(_) => false,
        }
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        !self.is_missing()
    }

    /// Present numeric payload, `None` for Missing, NaN, or Text.
    #[must_use]
    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Result<f64, TypeError> {
        match self {
            Self::Number(v) if !v.is_nan() => Ok(*v),
            Self::Missing | Self::Number(_) => Err(TypeError::ValueIsMissing),
            Self::Text(v) => Err(TypeError::NonNumericValue { value: v.clone() }),
        }
    }

    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => (a.is_nan() && b.is_nan()) || (a == b),
            _ => self == other,
        }
    }

    /// Ordering between two present values of the same shape.
    ///
    /// `None` for missing operands and for number/text mixes, which have no
    /// defined order.
    #[must_use]
    pub fn partial_cmp_value(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => Self::Number(v),
            None => Self::Missing,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, ""),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Direction a sorted column is ordered in. `Ascending` is the default
/// non-decreasing (<=) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Whether `a` may precede `b` under this order. `None` when the pair
    /// has no defined order (missing operands or number/text mixes).
    #[must_use]
    pub fn le(&self, a: &Value, b: &Value) -> Option<bool> {
        let ord = a.partial_cmp_value(b)?;
        Some(match self {
            Self::Ascending => ord != Ordering::Greater,
            Self::Descending => ord != Ordering::Less,
        })
    }

    #[must_use]
    pub fn le_f64(&self, a: f64, b: f64) -> bool {
        match self {
            Self::Ascending => a <= b,
            Self::Descending => a >= b,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("value is missing")]
    ValueIsMissing,
    #[error("value {value:?} is not numeric")]
    NonNumericValue { value: String },
}

// ── Missingness utilities ──────────────────────────────────────────────

pub fn count_missing(values: &[Value]) -> usize {
    values.iter().filter(|v| v.is_missing()).count()
}

pub fn has_any_valid(values: &[Value]) -> bool {
    values.iter().any(Value::is_present)
}

pub fn has_any_missing(values: &[Value]) -> bool {
    values.iter().any(Value::is_missing)
}

/// Present numeric payloads in order, dropping missing and text cells.
#[must_use]
pub fn collect_numbers(values: &[Value]) -> Vec<f64> {
    values.iter().filter_map(Value::number).collect()
}
