//! Cell cleaning per declared field kind
//!
//! Malformed numbers never fail a row: they become `0` and a notice is
//! logged. Only dates can fail, in which case the caller skips the field.
//! A date cell with a trailing time part keeps only its date.

use chrono::NaiveDate;

use super::{RunLog, Value};
use crate::schema::ScalarKind;

/// Default date format (month/day/year)
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Upper bound of the 64-bit signed integer range, as a float (2^63)
const INTEGER_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Error cleaning a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanError {
    /// Cell cannot be turned into a value of the field's kind
    InvalidValue(String),
}

impl std::fmt::Display for CleanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanError::InvalidValue(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CleanError {}

/// Clean a raw cell into a typed value
///
/// `field` is only used to label notices written to `notices`.
pub fn clean(
    raw: &str,
    kind: ScalarKind,
    field: &str,
    date_format: &str,
    notices: &mut RunLog,
) -> Result<Value, CleanError> {
    let value = raw.trim();
    match kind {
        ScalarKind::Text => Ok(Value::String(value.to_string())),
        ScalarKind::Date => parse_date(value, date_format)
            .map(Value::Date)
            .ok_or_else(|| CleanError::InvalidValue("null value for date".to_string())),
        ScalarKind::Float => Ok(Value::Float(clean_number(value, field, notices))),
        ScalarKind::Integer | ScalarKind::PositiveInteger => {
            Ok(Value::Int(clean_integer(value, kind, field, notices)))
        }
    }
}

/// Parse a date, retrying with the text before the first whitespace
fn parse_date(value: &str, date_format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, date_format).ok().or_else(|| {
        let (date, _time) = value.split_once(char::is_whitespace)?;
        NaiveDate::parse_from_str(date, date_format).ok()
    })
}

/// Parse a number, falling back to 0 with a notice
fn clean_number(value: &str, field: &str, notices: &mut RunLog) -> f64 {
    if value.is_empty() {
        return 0.0;
    }

    let number = match value.parse::<f64>() {
        Ok(n) => n,
        Err(_) => {
            notices.push(format!(
                "Column {} = {} is not a number so is set to 0",
                field, value
            ));
            return 0.0;
        }
    };

    if !number.is_finite() {
        notices.push(format!(
            "Column {} = {} is not a finite number so is set to 0",
            field, value
        ));
        return 0.0;
    }

    if number >= INTEGER_LIMIT {
        notices.push(format!(
            "Column {} = {} more than the max integer {}",
            field,
            value,
            i64::MAX
        ));
    } else if number < -INTEGER_LIMIT {
        notices.push(format!(
            "Column {} = {} less than the min integer {}",
            field,
            value,
            i64::MIN
        ));
    }

    number
}

/// Truncate a cleaned number to an integer, clamping positive-only kinds
fn clean_integer(value: &str, kind: ScalarKind, field: &str, notices: &mut RunLog) -> i64 {
    // `as` saturates at the i64 bounds
    let integer = clean_number(value, field, notices).trunc() as i64;

    if integer < 0 && kind == ScalarKind::PositiveInteger {
        notices.push(format!(
            "Column {} = {}, less than zero so set to 0",
            field, value
        ));
        return 0;
    }

    integer
}
