//! Core data model types for framing.
//!
//! Every input format is normalized into a [`Value`] tree. Frames are built from that tree as
//! ordered, equal-length, typed [`Column`]s, optionally guided by caller-declared
//! [`ColumnSpec`]s.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A node of the uniform value tree every format is normalized into.
///
/// Numbers are always canonicalized to `f64`, whatever their width or signedness in the source.
/// Mappings keep their keys sorted, so iteration and JSON-text serialization are deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Missing/empty value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Any numeric value.
    Number(f64),
    /// UTF-8 string.
    String(String),
    /// A point in time (only produced by callers handing in a prebuilt tree).
    Timestamp(DateTime<Utc>),
    /// Ordered list of values.
    Sequence(Vec<Value>),
    /// String-keyed map of values.
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for anything that is not a sequence or mapping.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Sequence(_) | Value::Mapping(_))
    }

    /// Borrow the string payload, if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric payload, if this is a [`Value::Number`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Look up a key of a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// Short lowercase name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Convert into a `serde_json::Value`.
    ///
    /// Integral floats are written without a fractional part (`123`, not `123.0`), timestamps
    /// as RFC 3339 strings, and non-finite numbers as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(t) => {
                serde_json::Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Serialize as compact JSON text.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Mapping(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Mapping(map)
    }
}

/// Keys of a mapping in lexicographic order.
///
/// Returns an empty list for anything that is not a [`Value::Mapping`].
pub fn sorted_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Mapping(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Logical type of a frame column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Nullable UTF-8 string.
    String,
    /// Nullable 64-bit float.
    Number,
    /// Nullable boolean.
    Boolean,
    /// Nullable UTC timestamp.
    Timestamp,
}

/// Target type declared for an explicit column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Render scalars as text.
    #[default]
    String,
    /// Numbers, or strings parsed as floats.
    Number,
    /// Booleans, or `"true"`/`"false"` strings.
    Boolean,
    /// Date/time strings parsed with a set of known layouts.
    Timestamp,
    /// Milliseconds since the Unix epoch.
    #[serde(alias = "timestamp_epoch")]
    TimestampEpochMs,
    /// Seconds since the Unix epoch.
    TimestampEpochS,
}

impl ColumnType {
    /// The column type produced when coercing to this target.
    pub fn field_type(self) -> FieldType {
        match self {
            ColumnType::String => FieldType::String,
            ColumnType::Number => FieldType::Number,
            ColumnType::Boolean => FieldType::Boolean,
            ColumnType::Timestamp | ColumnType::TimestampEpochMs | ColumnType::TimestampEpochS => {
                FieldType::Timestamp
            }
        }
    }
}

impl From<FieldType> for ColumnType {
    fn from(t: FieldType) -> Self {
        match t {
            FieldType::String => ColumnType::String,
            FieldType::Number => ColumnType::Number,
            FieldType::Boolean => ColumnType::Boolean,
            FieldType::Timestamp => ColumnType::Timestamp,
        }
    }
}

/// A caller-declared output column: where to find the value, what to call it and what type to
/// coerce it to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnSpec {
    /// Dotted path into each row (`address.postcode`, `hobbies.0`).
    pub selector: String,
    /// Output column name; the selector is used when unset or empty.
    pub alias: Option<String>,
    /// Target type.
    #[serde(rename = "type", alias = "format")]
    pub column_type: ColumnType,
    /// Extra layout tried when parsing timestamps (`"auto"` means unset).
    pub time_format: Option<String>,
}

impl ColumnSpec {
    /// Create a column spec without alias or time format.
    pub fn new(selector: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            selector: selector.into(),
            alias: None,
            column_type,
            time_format: None,
        }
    }

    /// Set the output column name.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the timestamp layout.
    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = Some(time_format.into());
        self
    }

    /// Alias if set and non-empty, otherwise the selector.
    pub fn display_name(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() => alias,
            _ => &self.selector,
        }
    }
}

/// How explicit columns combine with inferred ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnsMode {
    /// Explicit columns (when given) are the whole frame.
    #[default]
    Replace,
    /// Explicit columns are appended after the inferred ones.
    Append,
    /// Explicit columns replace inferred columns of the same selector name.
    Override,
}

/// Typed, nullable cell storage for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    String(Vec<Option<String>>),
    Number(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Timestamp(Vec<Option<DateTime<Utc>>>),
}

impl ColumnData {
    /// All-null storage of the given type and length.
    pub fn nulls(field_type: FieldType, len: usize) -> Self {
        match field_type {
            FieldType::String => ColumnData::String(vec![None; len]),
            FieldType::Number => ColumnData::Number(vec![None; len]),
            FieldType::Boolean => ColumnData::Boolean(vec![None; len]),
            FieldType::Timestamp => ColumnData::Timestamp(vec![None; len]),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            ColumnData::String(_) => FieldType::String,
            ColumnData::Number(_) => FieldType::Number,
            ColumnData::Boolean(_) => FieldType::Boolean,
            ColumnData::Timestamp(_) => FieldType::Timestamp,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::String(v) => v.len(),
            ColumnData::Number(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named, typed column of a [`Frame`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Cell values.
    #[serde(flatten)]
    pub data: ColumnData,
}

impl Column {
    /// Create a column from its storage.
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Declared type of the column.
    pub fn field_type(&self) -> FieldType {
        self.data.field_type()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the cell at `row` is null (or out of range).
    pub fn is_null(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::String(v) => v.get(row).is_none_or(Option::is_none),
            ColumnData::Number(v) => v.get(row).is_none_or(Option::is_none),
            ColumnData::Boolean(v) => v.get(row).is_none_or(Option::is_none),
            ColumnData::Timestamp(v) => v.get(row).is_none_or(Option::is_none),
        }
    }

    /// String cells, if this is a string column.
    pub fn strings(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::String(v) => Some(v),
            _ => None,
        }
    }

    /// Number cells, if this is a number column.
    pub fn numbers(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Number(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean cells, if this is a boolean column.
    pub fn booleans(&self) -> Option<&[Option<bool>]> {
        match &self.data {
            ColumnData::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// Timestamp cells, if this is a timestamp column.
    pub fn timestamps(&self) -> Option<&[Option<DateTime<Utc>>]> {
        match &self.data {
            ColumnData::Timestamp(v) => Some(v),
            _ => None,
        }
    }
}

/// The output table: ordered, named columns of equal length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Frame name.
    pub name: String,
    /// Ordered columns.
    pub columns: Vec<Column>,
}

impl Frame {
    /// Create a frame.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Number of rows (the length shared by all columns).
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Iterate column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// First column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the index of the first column with the given name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_numbers_canonicalize_to_f64() {
        let v = Value::from(serde_json::json!({"a": 1, "b": -2, "c": 1.5, "d": [true, null]}));
        assert_eq!(v.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(v.get("b"), Some(&Value::Number(-2.0)));
        assert_eq!(v.get("c"), Some(&Value::Number(1.5)));
        assert_eq!(
            v.get("d"),
            Some(&Value::Sequence(vec![Value::Bool(true), Value::Null]))
        );
    }

    #[test]
    fn json_text_writes_integral_floats_without_fraction() {
        let v = Value::Sequence(vec![Value::Number(123.0), Value::Number(456.789)]);
        assert_eq!(v.to_json_string(), "[123,456.789]");
    }

    #[test]
    fn sorted_keys_are_lexicographic() {
        let v = Value::from(serde_json::json!({"zeta": 1, "alpha": 2, "Mid": 3}));
        assert_eq!(sorted_keys(&v), vec!["Mid", "alpha", "zeta"]);
        assert!(sorted_keys(&Value::Null).is_empty());
    }

    #[test]
    fn column_spec_deserializes_legacy_keys() {
        let spec: ColumnSpec = serde_json::from_str(
            r#"{"selector":"ts","format":"timestamp_epoch","timeFormat":"auto"}"#,
        )
        .unwrap();
        assert_eq!(spec.column_type, ColumnType::TimestampEpochMs);
        assert_eq!(spec.time_format.as_deref(), Some("auto"));
        assert_eq!(spec.display_name(), "ts");
    }

    #[test]
    fn empty_alias_falls_back_to_selector() {
        let spec = ColumnSpec::new("age", ColumnType::Number).with_alias("");
        assert_eq!(spec.display_name(), "age");
    }
}
