//! Cell values
//!
//! - [`Value`] is what evaluation produces and what a formula cell caches
//! - [`ErrorValue`] is the spreadsheet error family (`#DIV/0!` and friends)
//! - [`Scalar`] is the JSON-facing shape used for writes and read-backs

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize, Serializer};

use crate::format::format_general;

/// Spreadsheet error value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorValue {
    /// `#DIV/0!`
    DivZero,
    /// `#VALUE!`
    Value,
    /// `#REF!`
    Ref,
    /// `#NAME?`
    Name,
    /// `#NUM!`
    Num,
    /// `#N/A`
    NotAvailable,
    /// `#CIRC!`
    Circular,
    /// `#ERROR!`
    Error,
}

impl ErrorValue {
    /// Display text of the error
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DivZero => "#DIV/0!",
            Self::Value => "#VALUE!",
            Self::Ref => "#REF!",
            Self::Name => "#NAME?",
            Self::Num => "#NUM!",
            Self::NotAvailable => "#N/A",
            Self::Circular => "#CIRC!",
            Self::Error => "#ERROR!",
        }
    }
}

impl Display for ErrorValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluated value of a cell or expression
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Finite number
    Number(f64),
    /// Text
    Text(String),
    /// Boolean
    Boolean(bool),
    /// Error value
    Error(ErrorValue),
    /// Nothing
    #[default]
    Empty,
}

impl Value {
    /// Wrap a number, turning non-finite results into `#NUM!`
    #[inline]
    #[must_use]
    pub fn number(n: f64) -> Self {
        if n.is_finite() {
            Self::Number(n)
        } else {
            Self::Error(ErrorValue::Num)
        }
    }

    /// Error carried by this value, if any
    #[inline]
    #[must_use]
    pub fn as_error(&self) -> Option<ErrorValue> {
        match self {
            Self::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Coerce to a number the way arithmetic operators do
    ///
    /// # Errors
    /// Returns the error value that the operation should produce.
    pub fn to_number(&self) -> Result<f64, ErrorValue> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::Empty => Ok(0.0),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ErrorValue::Value);
                }
                crate::format::parse_plain_number(trimmed).ok_or(ErrorValue::Value)
            }
            Self::Error(e) => Err(*e),
        }
    }

    /// Coerce to text the way `&` does
    ///
    /// # Errors
    /// Returns the carried error value.
    pub fn to_text(&self) -> Result<String, ErrorValue> {
        match self {
            Self::Number(n) => Ok(format_general(*n)),
            Self::Text(s) => Ok(s.clone()),
            Self::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Self::Empty => Ok(String::new()),
            Self::Error(e) => Err(*e),
        }
    }

    /// Coerce to a boolean the way `IF` and `NOT` do
    ///
    /// # Errors
    /// Returns `#VALUE!` for text that is not `TRUE`/`FALSE`, or the carried error.
    pub fn to_bool(&self) -> Result<bool, ErrorValue> {
        match self {
            Self::Boolean(b) => Ok(*b),
            Self::Number(n) => Ok(*n != 0.0),
            Self::Empty => Ok(false),
            Self::Text(s) if s.eq_ignore_ascii_case("TRUE") => Ok(true),
            Self::Text(s) if s.eq_ignore_ascii_case("FALSE") => Ok(false),
            Self::Text(_) => Err(ErrorValue::Value),
            Self::Error(e) => Err(*e),
        }
    }

    /// Compare two values for the comparison operators
    ///
    /// Numbers sort before text, text before booleans. Text compares
    /// case-insensitively. An empty value takes the type of the other side.
    ///
    /// # Errors
    /// Returns the first error value encountered.
    pub fn compare(&self, other: &Self) -> Result<Ordering, ErrorValue> {
        if let Some(e) = self.as_error().or_else(|| other.as_error()) {
            return Err(e);
        }
        let ordering = match (self.blank_as(other), other.blank_as(self)) {
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Self::Text(a), Self::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(&b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        };
        Ok(ordering)
    }

    fn blank_as(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Empty, Self::Text(_)) => Self::Text(String::new()),
            (Self::Empty, Self::Boolean(_)) => Self::Boolean(false),
            (Self::Empty, _) => Self::Number(0.0),
            (v, _) => v.clone(),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Number(_) | Self::Empty => 0,
            Self::Text(_) => 1,
            Self::Boolean(_) => 2,
            Self::Error(_) => 3,
        }
    }
}

/// JSON-facing cell value
///
/// Numbers with no fractional part serialize as JSON integers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    /// Number
    Number(f64),
    /// Text (error values read back as their text)
    Text(String),
    /// Boolean
    Boolean(bool),
    /// Empty cell
    #[default]
    Null,
}

impl Scalar {
    /// Convert a JSON value, accepting only string, number, boolean and null
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(Self::Number),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }

    /// Convert to a JSON value
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => integral(*n)
                .map(serde_json::Value::from)
                .or_else(|| serde_json::Number::from_f64(*n).map(serde_json::Value::Number))
                .unwrap_or(serde_json::Value::Null),
        }
    }
}

impl From<&Value> for Scalar {
    fn from(value: &Value) -> Self {
        match value {
            Value::Number(n) => Self::Number(*n),
            Value::Text(s) => Self::Text(s.clone()),
            Value::Boolean(b) => Self::Boolean(*b),
            Value::Error(e) => Self::Text(e.as_str().to_string()),
            Value::Empty => Self::Null,
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => match integral(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
        }
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER).then_some(n as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_finite_becomes_num_error() {
        assert_eq!(Value::number(f64::INFINITY), Value::Error(ErrorValue::Num));
        assert_eq!(Value::number(2.5), Value::Number(2.5));
    }

    #[test]
    fn coercions() {
        assert_eq!(Value::Text(" 3.5 ".into()).to_number(), Ok(3.5));
        assert_eq!(Value::Text("abc".into()).to_number(), Err(ErrorValue::Value));
        assert_eq!(Value::Boolean(true).to_number(), Ok(1.0));
        assert_eq!(Value::Number(3.0).to_text(), Ok("3".to_string()));
        assert_eq!(Value::Text("true".into()).to_bool(), Ok(true));
        assert_eq!(Value::Error(ErrorValue::Ref).to_text(), Err(ErrorValue::Ref));
    }

    #[test]
    fn comparison_ranks_types() {
        let n = Value::Number(100.0);
        let t = Value::Text("a".into());
        let b = Value::Boolean(false);
        assert_eq!(n.compare(&t), Ok(Ordering::Less));
        assert_eq!(t.compare(&b), Ok(Ordering::Less));
        assert_eq!(
            Value::Text("ABC".into()).compare(&Value::Text("abc".into())),
            Ok(Ordering::Equal)
        );
        assert_eq!(Value::Empty.compare(&Value::Number(0.0)), Ok(Ordering::Equal));
        assert_eq!(Value::Empty.compare(&Value::Text(String::new())), Ok(Ordering::Equal));
    }

    #[test]
    fn scalar_json() {
        assert_eq!(serde_json::to_value(Scalar::Number(42.0)).unwrap(), json!(42));
        assert_eq!(serde_json::to_value(Scalar::Number(3.99)).unwrap(), json!(3.99));
        assert_eq!(Scalar::Number(42.0).to_json(), json!(42));
        assert_eq!(Scalar::from_json(&json!([1])), None);
        assert_eq!(Scalar::from_json(&json!({"a": 1})), None);
        assert_eq!(Scalar::from_json(&json!(null)), Some(Scalar::Null));
        assert_eq!(
            Scalar::from(&Value::Error(ErrorValue::DivZero)),
            Scalar::Text("#DIV/0!".into())
        );
    }
}
