//! Frame Builder.
//!
//! Top-level dispatch on the selected document:
//!
//! - scalar (including null): one row, one column named after the frame, type inferred
//! - sequence: one row per item
//! - non-empty mapping: a single row
//! - empty mapping: [`FramerError::UnconstructableFrame`]
//!
//! Rows are turned into columns by one shared inferred step and one shared explicit step,
//! combined per [`ColumnsMode`].

use crate::error::{FramerError, FramerResult};
use crate::selector::resolve_path;
use crate::types::{Column, ColumnData, ColumnSpec, ColumnsMode, FieldType, Frame, Value};

use super::coerce::coerce_column;
use super::infer::{infer_columns, typed_column};

/// Build a frame from a (selected) document.
pub fn build_frame(
    document: &Value,
    columns: &[ColumnSpec],
    mode: ColumnsMode,
    name: &str,
) -> FramerResult<Frame> {
    let rows = match document {
        Value::Sequence(items) => items.as_slice(),
        Value::Mapping(map) if map.is_empty() => return Err(FramerError::UnconstructableFrame),
        Value::Mapping(_) => std::slice::from_ref(document),
        scalar => {
            let column = typed_column(name.to_string(), vec![Some(scalar)]);
            return Ok(Frame::new(name, vec![column]));
        }
    };

    let explicit: Vec<&ColumnSpec> = columns.iter().filter(|c| !c.selector.is_empty()).collect();
    let mut out = if explicit.is_empty() {
        infer_columns(rows, name)
    } else {
        match mode {
            ColumnsMode::Replace => explicit_columns(rows, &explicit),
            ColumnsMode::Append => {
                let mut cols = infer_columns(rows, name);
                cols.extend(explicit_columns(rows, &explicit));
                cols
            }
            ColumnsMode::Override => override_columns(infer_columns(rows, name), rows, &explicit),
        }
    };

    if out.is_empty() {
        out.push(Column::new(name, ColumnData::nulls(FieldType::String, rows.len())));
    }

    tracing::trace!(
        frame = name,
        rows = rows.len(),
        columns = out.len(),
        ?mode,
        "built frame"
    );
    Ok(Frame::new(name, out))
}

/// One column per spec, in declaration order, named by alias or selector.
pub fn explicit_columns(rows: &[Value], specs: &[&ColumnSpec]) -> Vec<Column> {
    specs
        .iter()
        .map(|spec| Column::new(spec.display_name(), explicit_data(rows, spec)))
        .collect()
}

// Inferred columns named like a spec's selector are replaced in place and take its alias.
// Specs matching no inferred column are dropped.
fn override_columns(mut inferred: Vec<Column>, rows: &[Value], specs: &[&ColumnSpec]) -> Vec<Column> {
    for spec in specs {
        match inferred.iter_mut().find(|c| c.name == spec.selector) {
            Some(slot) => *slot = Column::new(spec.display_name(), explicit_data(rows, spec)),
            None => tracing::debug!(
                selector = %spec.selector,
                "override column matches no inferred column"
            ),
        }
    }
    inferred
}

fn explicit_data(rows: &[Value], spec: &ColumnSpec) -> ColumnData {
    // CSV headers are renamed to aliases before framing, so fall back to the alias key.
    let alias = spec.alias.as_deref().filter(|a| !a.is_empty());
    let cells = rows.iter().map(|row| {
        resolve_path(row, &spec.selector).or_else(|| alias.and_then(|a| row.get(a)))
    });
    coerce_column(cells, spec.column_type, spec.time_format.as_deref())
}
