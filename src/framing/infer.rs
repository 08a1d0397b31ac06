//! Schema Inferrer: column names and types derived from the data when no columns are declared.

use std::collections::BTreeSet;

use crate::types::{Column, ColumnData, FieldType, Value};

use super::coerce::coerce_column;

/// What a column holds, judged from one sample value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inferred {
    /// A scalar column of this type.
    Scalar(FieldType),
    /// Sequences or mappings, stored as JSON text.
    Nested,
}

/// Per-value type inference.
pub fn infer_type(value: &Value) -> Inferred {
    match value {
        Value::Null | Value::String(_) => Inferred::Scalar(FieldType::String),
        Value::Number(_) => Inferred::Scalar(FieldType::Number),
        Value::Bool(_) => Inferred::Scalar(FieldType::Boolean),
        Value::Timestamp(_) => Inferred::Scalar(FieldType::Timestamp),
        Value::Sequence(_) | Value::Mapping(_) => Inferred::Nested,
    }
}

/// Lexicographically sorted union of the keys of every mapping row.
pub fn union_keys(rows: &[Value]) -> Vec<String> {
    let keys: BTreeSet<&str> = rows
        .iter()
        .filter_map(|row| match row {
            Value::Mapping(map) => Some(map.keys().map(String::as_str)),
            _ => None,
        })
        .flatten()
        .collect();
    keys.into_iter().map(str::to_owned).collect()
}

/// Columns inferred for a sequence of rows, dispatching on the first non-null row.
///
/// Returns no columns when every row is null (or there are no rows).
pub fn infer_columns(rows: &[Value], frame_name: &str) -> Vec<Column> {
    let Some(first) = rows.iter().find(|r| !r.is_null()) else {
        return Vec::new();
    };
    match first {
        Value::Mapping(_) => union_keys(rows)
            .into_iter()
            .map(|key| {
                let cells = rows.iter().map(|row| row.get(&key)).collect::<Vec<_>>();
                typed_column(key, cells)
            })
            .collect(),
        _ => vec![typed_column(frame_name.to_string(), rows.iter().map(Some).collect())],
    }
}

/// Build one column typed after its first non-null cell.
pub fn typed_column(name: String, cells: Vec<Option<&Value>>) -> Column {
    let sample = cells.iter().flatten().find(|v| !v.is_null());
    let data = match sample.map(|v| infer_type(v)) {
        None => ColumnData::nulls(FieldType::String, cells.len()),
        Some(Inferred::Nested) => json_text_column(&cells),
        Some(Inferred::Scalar(field_type)) => coerce_column(cells, field_type.into(), None),
    };
    Column::new(name, data)
}

// Every cell is serialized, so null and absent cells hold the text "null".
fn json_text_column(cells: &[Option<&Value>]) -> ColumnData {
    ColumnData::String(
        cells
            .iter()
            .map(|c| Some(c.unwrap_or(&Value::Null).to_json_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(v: serde_json::Value) -> Vec<Value> {
        match Value::from(v) {
            Value::Sequence(items) => items,
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn union_of_keys_is_sorted() {
        let r = rows(serde_json::json!([{"b": 1, "a": 2}, {"c": 3}, 5]));
        assert_eq!(union_keys(&r), vec!["a", "b", "c"]);
    }

    #[test]
    fn absent_keys_are_null_cells() {
        let r = rows(serde_json::json!([{"a": 1}, {"b": "x"}]));
        let cols = infer_columns(&r, "response");
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].data, ColumnData::Number(vec![Some(1.0), None]));
        assert_eq!(cols[1].data, ColumnData::String(vec![None, Some("x".to_string())]));
    }

    #[test]
    fn first_non_null_sample_decides_the_type() {
        let r = rows(serde_json::json!([{"v": null}, {"v": 2}, {"v": "3"}, {"v": "x"}]));
        let cols = infer_columns(&r, "response");
        assert_eq!(
            cols[0].data,
            ColumnData::Number(vec![None, Some(2.0), Some(3.0), None])
        );
    }

    #[test]
    fn nested_values_degrade_to_json_text() {
        let r = rows(serde_json::json!([{"tags": ["a", "b"]}, {"tags": null}, {"tags": {"k": 1}}]));
        let cols = infer_columns(&r, "response");
        assert_eq!(
            cols[0].data,
            ColumnData::String(vec![
                Some(r#"["a","b"]"#.to_string()),
                Some("null".to_string()),
                Some(r#"{"k":1}"#.to_string()),
            ])
        );
    }

    #[test]
    fn null_and_absent_nested_cells_serialize_as_null_text() {
        let r = rows(serde_json::json!([{"v": [1]}, {"v": null}, {"other": 2}]));
        let cols = infer_columns(&r, "response");
        let v = cols.iter().find(|c| c.name == "v").unwrap();
        assert_eq!(
            v.data,
            ColumnData::String(vec![
                Some("[1]".to_string()),
                Some("null".to_string()),
                Some("null".to_string()),
            ])
        );
    }

    #[test]
    fn scalar_rows_make_one_column_named_after_the_frame() {
        let r = rows(serde_json::json!([null, true, false]));
        let cols = infer_columns(&r, "flags");
        assert_eq!(cols[0].name, "flags");
        assert_eq!(cols[0].data, ColumnData::Boolean(vec![None, Some(true), Some(false)]));
    }

    #[test]
    fn nested_rows_become_json_text() {
        let r = rows(serde_json::json!([[1, 2], [3]]));
        let cols = infer_columns(&r, "response");
        assert_eq!(
            cols[0].data,
            ColumnData::String(vec![Some("[1,2]".to_string()), Some("[3]".to_string())])
        );
    }

    #[test]
    fn all_null_rows_infer_nothing() {
        assert!(infer_columns(&rows(serde_json::json!([null, null])), "r").is_empty());
        assert!(infer_columns(&[], "r").is_empty());
    }
}
