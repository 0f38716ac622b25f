//! Cleaned cell values

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A typed value produced by cleaning a CSV cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// Null/empty value
    #[default]
    Null,
    /// Trimmed text
    String(String),
    /// Whole number (integer)
    Int(i64),
    /// Floating point (decimal, float)
    Float(f64),
    /// Calendar date
    Date(NaiveDate),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "(null)"),
            Value::String(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}
