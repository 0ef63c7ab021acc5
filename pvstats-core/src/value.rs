//! Cell values stored in [`Table`](crate::Table) columns.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single table cell.
///
/// The variants cover what the supported file formats can carry: integers,
/// floats, booleans and text, with `Null` standing in for missing data.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Missing or unparsable data.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
}

/// Numeric type targeted by [`Table::coerce_numeric`](crate::Table::coerce_numeric).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    /// Parse into [`Value::Int`]; integral floats are narrowed.
    Integer,
    /// Parse into [`Value::Float`].
    Float,
}

/// Hashable projection of a [`Value`] used for joins and grouping.
///
/// Integral floats collapse onto the integer key so `1` and `1.0` match,
/// mirroring how numeric join keys behave in dataframe libraries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
}

impl Value {
    /// Infer a value from raw text as read from a delimited file.
    ///
    /// Empty cells become [`Value::Null`]; integers, floats and the literals
    /// `true`/`false` are recognised; everything else stays text.
    ///
    /// # Examples
    ///
    /// ```
    /// use pvstats_core::Value;
    ///
    /// assert_eq!(Value::infer("42"), Value::Int(42));
    /// assert_eq!(Value::infer("4.5"), Value::Float(4.5));
    /// assert_eq!(Value::infer(""), Value::Null);
    /// assert_eq!(Value::infer("Madrid"), Value::Text("Madrid".to_owned()));
    /// ```
    #[must_use]
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Null;
        }
        if let Ok(int) = raw.parse::<i64>() {
            return Self::Int(int);
        }
        if let Ok(float) = raw.parse::<f64>() {
            return Self::Float(float);
        }
        match raw {
            "true" | "True" => Self::Bool(true),
            "false" | "False" => Self::Bool(false),
            _ => Self::Text(raw.to_owned()),
        }
    }

    /// Whether the value is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value. Text and booleans yield `None`.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "integer cells are promoted to floats for arithmetic"
    )]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer view of the value; integral floats are accepted.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) => float_to_i64(*value),
            _ => None,
        }
    }

    /// Text view of the value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Convert the value into `kind`, parsing text when necessary.
    ///
    /// Returns `None` when the value cannot be represented; `Null` converts
    /// to `Null`.
    #[must_use]
    pub fn to_numeric(&self, kind: NumericKind) -> Option<Self> {
        let parsed = match self {
            Self::Null => return Some(Self::Null),
            Self::Bool(_) => return None,
            Self::Int(_) | Self::Float(_) => self.clone(),
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Some(Self::Null);
                }
                Self::infer(trimmed)
            }
        };
        match (kind, parsed) {
            (NumericKind::Integer, Self::Int(value)) => Some(Self::Int(value)),
            (NumericKind::Integer, Self::Float(value)) => float_to_i64(value).map(Self::Int),
            (NumericKind::Float, other) => other.as_f64().map(Self::Float),
            _ => None,
        }
    }

    pub(crate) fn key(&self) -> ValueKey {
        match self {
            Self::Null => ValueKey::Null,
            Self::Bool(flag) => ValueKey::Bool(*flag),
            Self::Int(value) => ValueKey::Int(*value),
            Self::Float(value) => {
                float_to_i64(*value).map_or(ValueKey::Float(value.to_bits()), ValueKey::Int)
            }
            Self::Text(text) => ValueKey::Text(text.clone()),
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "range and fractional part are checked before the cast"
)]
fn float_to_i64(value: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0;
    (value.is_finite() && value.fract() == 0.0 && value.abs() <= LIMIT).then(|| value as i64)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
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

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
