//! Cell Coercer: converts raw values to a column's declared type.
//!
//! Coercion never fails. A value that cannot be converted becomes a null cell.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::{ColumnData, ColumnType, Value};

use super::time::{parse_timestamp, year_start};

/// One coerced, non-null cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    String(String),
    Number(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

/// Coerce a single value; `None` is a null cell.
pub fn coerce(raw: &Value, target: ColumnType, time_format: Option<&str>) -> Option<Cell> {
    match target {
        ColumnType::String => to_text(raw).map(Cell::String),
        ColumnType::Number => to_number(raw).map(Cell::Number),
        ColumnType::Boolean => to_boolean(raw).map(Cell::Boolean),
        ColumnType::Timestamp => to_timestamp(raw, time_format).map(Cell::Timestamp),
        ColumnType::TimestampEpochMs => {
            to_epoch(raw).and_then(DateTime::from_timestamp_millis).map(Cell::Timestamp)
        }
        ColumnType::TimestampEpochS => to_epoch(raw)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(Cell::Timestamp),
    }
}

/// Coerce a whole column of cells (`None` = absent) into typed storage.
pub fn coerce_column<'a, I>(cells: I, target: ColumnType, time_format: Option<&str>) -> ColumnData
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    let cells = cells.into_iter();
    match target {
        ColumnType::String => ColumnData::String(cells.map(|c| c.and_then(to_text)).collect()),
        ColumnType::Number => ColumnData::Number(cells.map(|c| c.and_then(to_number)).collect()),
        ColumnType::Boolean => {
            ColumnData::Boolean(cells.map(|c| c.and_then(to_boolean)).collect())
        }
        _ => ColumnData::Timestamp(
            cells
                .map(|c| {
                    c.and_then(|v| match coerce(v, target, time_format) {
                        Some(Cell::Timestamp(t)) => Some(t),
                        _ => None,
                    })
                })
                .collect(),
        ),
    }
}

/// Natural text form of a scalar; containers and null have none.
pub fn to_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_text(*n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Timestamp(t) => Some(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Shortest decimal form, switching to `1e+21` / `1e-07` style exponents below `1e-4` and from
/// `1e21` up.
fn number_text(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let abs = n.abs();
    if abs == 0.0 || (1e-4..1e21).contains(&abs) {
        return n.to_string();
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) => match power.parse::<i32>() {
            Ok(p) => format!("{mantissa}e{}{:02}", if p < 0 { '-' } else { '+' }, p.abs()),
            Err(_) => exp,
        },
        None => exp,
    }
}

/// Numbers pass through; strings are parsed as floats.
pub fn to_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => Some(*n),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Booleans pass through; `"true"`/`"false"` strings (any case, trimmed) convert.
pub fn to_boolean(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Timestamps pass through, strings go through the layout ladder and numbers are only
/// accepted as a 4-digit year.
pub fn to_timestamp(raw: &Value, time_format: Option<&str>) -> Option<DateTime<Utc>> {
    match raw {
        Value::Timestamp(t) => Some(*t),
        Value::String(s) => parse_timestamp(s, time_format),
        Value::Number(n) if n.fract() == 0.0 && (1000.0..=9999.0).contains(n) => {
            year_start(*n as i32)
        }
        _ => None,
    }
}

// Integer strings or (truncated) numbers.
fn to_epoch(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) if n.is_finite() => Some(n.trunc() as i64),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
