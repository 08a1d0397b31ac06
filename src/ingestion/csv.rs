//! CSV/TSV normalization.
//!
//! Rows are tokenized with the `csv` crate and turned into a [`Value::Sequence`] of
//! [`Value::Mapping`]s keyed by header name. Cells stay strings; typing happens later, when the
//! frame is built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FramerError, FramerResult};
use crate::types::{ColumnSpec, Value};

use super::detect::FormatKind;

/// Options controlling CSV/TSV tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvOptions {
    /// Field delimiter; only the first byte is used. Defaults to `,` (always tab for TSV).
    pub delimiter: String,
    /// Comment marker; lines starting with its first byte are ignored.
    pub comment: String,
    /// Allow rows with fewer or more cells than the header.
    pub relax_column_count: bool,
    /// Drop rows that fail to parse instead of failing the whole input.
    pub skip_lines_with_error: bool,
    /// The first row is data; columns are named `1`, `2`, ... by position.
    pub no_headers: bool,
    /// Header names to use instead of reading them from the first row.
    pub headers: Vec<String>,
}

/// Tokenize CSV text into rows of string cells.
///
/// Rows that fail to parse abort with [`FramerError::MalformedFormat`] unless
/// `skip_lines_with_error` is set, in which case they are dropped.
pub fn parse_csv(text: &str, delimiter: u8, options: &CsvOptions) -> FramerResult<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(options.comment.bytes().next())
        .flexible(options.relax_column_count)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        match result {
            Ok(record) => rows.push(record.iter().map(str::to_owned).collect()),
            Err(e) if options.skip_lines_with_error => {
                tracing::debug!(record = idx + 1, error = %e, "skipping csv record");
            }
            Err(e) => {
                return Err(FramerError::malformed(
                    FormatKind::Csv,
                    format!("error reading csv record {}: {e}", idx + 1),
                ));
            }
        }
    }
    Ok(rows)
}

/// Normalize CSV (or TSV, with `kind == Tsv`) text into a sequence of row mappings.
///
/// Header names that equal a column selector with an alias are renamed to that alias.
pub fn csv_to_value(
    text: &str,
    kind: FormatKind,
    options: &CsvOptions,
    columns: &[ColumnSpec],
) -> FramerResult<Value> {
    let delimiter = match kind {
        FormatKind::Tsv => b'\t',
        _ => options.delimiter.bytes().next().unwrap_or(b','),
    };
    let parsed = parse_csv(text, delimiter, options)?;

    let (header, records): (Vec<String>, &[Vec<String>]) = if !options.headers.is_empty() {
        let header = options.headers.iter().map(|h| unquote(h.trim())).collect();
        (header, parsed.as_slice())
    } else if parsed.is_empty() {
        return Err(FramerError::EmptyCsv);
    } else if options.no_headers {
        let header = (1..=parsed[0].len()).map(|i| i.to_string()).collect();
        (header, parsed.as_slice())
    } else {
        (parsed[0].clone(), &parsed[1..])
    };
    // Supplied headers may legitimately describe an empty body.
    if records.is_empty() && options.headers.is_empty() {
        return Err(FramerError::EmptyCsv);
    }
    let header = apply_aliases(header, columns);

    let rows = records
        .iter()
        .map(|record| {
            let item: BTreeMap<String, Value> = header
                .iter()
                .zip(record.iter())
                .map(|(h, cell)| (h.clone(), Value::String(cell.clone())))
                .collect();
            Value::Mapping(item)
        })
        .collect();

    Ok(Value::Sequence(rows))
}

fn apply_aliases(header: Vec<String>, columns: &[ColumnSpec]) -> Vec<String> {
    header
        .into_iter()
        .map(|h| {
            columns
                .iter()
                .filter(|c| c.selector == h)
                .filter_map(|c| c.alias.as_deref().filter(|a| !a.is_empty()))
                .last()
                .map(str::to_owned)
                .unwrap_or(h)
        })
        .collect()
}

fn unquote(h: &str) -> String {
    h.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(h)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;

    fn row(pairs: &[(&str, &str)]) -> Value {
        Value::Mapping(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        )
    }

    #[test]
    fn header_row_keys_every_record() {
        let v = csv_to_value("a,b\n1,2\n3,4", FormatKind::Csv, &CsvOptions::default(), &[]).unwrap();
        assert_eq!(
            v,
            Value::Sequence(vec![row(&[("a", "1"), ("b", "2")]), row(&[("a", "3"), ("b", "4")])])
        );
    }

    #[test]
    fn tsv_always_uses_tab() {
        let opts = CsvOptions {
            delimiter: ";".to_string(),
            ..Default::default()
        };
        let v = csv_to_value("a\tb\n1\t2", FormatKind::Tsv, &opts, &[]).unwrap();
        assert_eq!(v, Value::Sequence(vec![row(&[("a", "1"), ("b", "2")])]));
    }

    #[test]
    fn no_headers_uses_positional_names() {
        let opts = CsvOptions {
            no_headers: true,
            ..Default::default()
        };
        let v = csv_to_value("x,y\nz,w", FormatKind::Csv, &opts, &[]).unwrap();
        assert_eq!(
            v,
            Value::Sequence(vec![row(&[("1", "x"), ("2", "y")]), row(&[("1", "z"), ("2", "w")])])
        );
    }

    #[test]
    fn supplied_headers_make_every_line_data() {
        let opts = CsvOptions {
            headers: vec!["\"first\"".to_string(), " second ".to_string()],
            ..Default::default()
        };
        let v = csv_to_value("1,2", FormatKind::Csv, &opts, &[]).unwrap();
        assert_eq!(v, Value::Sequence(vec![row(&[("first", "1"), ("second", "2")])]));
    }

    #[test]
    fn aliases_rename_headers() {
        let cols = vec![ColumnSpec::new("a", ColumnType::Number).with_alias("Alpha")];
        let v = csv_to_value("a,b\n1,2", FormatKind::Csv, &CsvOptions::default(), &cols).unwrap();
        assert_eq!(v, Value::Sequence(vec![row(&[("Alpha", "1"), ("b", "2")])]));
    }

    #[test]
    fn ragged_rows_fail_unless_relaxed_or_skipped() {
        let input = "a,b\n1,2,3\n4,5";
        let err = csv_to_value(input, FormatKind::Csv, &CsvOptions::default(), &[]).unwrap_err();
        assert!(matches!(err, FramerError::MalformedFormat { .. }));

        let skip = CsvOptions {
            skip_lines_with_error: true,
            ..Default::default()
        };
        let v = csv_to_value(input, FormatKind::Csv, &skip, &[]).unwrap();
        assert_eq!(v, Value::Sequence(vec![row(&[("a", "4"), ("b", "5")])]));

        let relax = CsvOptions {
            relax_column_count: true,
            ..Default::default()
        };
        let v = csv_to_value("a,b\n1\n4,5", FormatKind::Csv, &relax, &[]).unwrap();
        assert_eq!(
            v,
            Value::Sequence(vec![row(&[("a", "1")]), row(&[("a", "4"), ("b", "5")])])
        );
    }

    #[test]
    fn comment_lines_are_ignored() {
        let opts = CsvOptions {
            comment: "#".to_string(),
            ..Default::default()
        };
        let v = csv_to_value("# generated\na\n1", FormatKind::Csv, &opts, &[]).unwrap();
        assert_eq!(v, Value::Sequence(vec![row(&[("a", "1")])]));
    }

    #[test]
    fn header_only_csv_is_empty() {
        let err = csv_to_value("a,b,c", FormatKind::Csv, &CsvOptions::default(), &[]).unwrap_err();
        assert!(matches!(err, FramerError::EmptyCsv));

        let supplied = CsvOptions {
            headers: vec!["a".to_string()],
            comment: "#".to_string(),
            ..Default::default()
        };
        let v = csv_to_value("# only a comment", FormatKind::Csv, &supplied, &[]).unwrap();
        assert_eq!(v, Value::Sequence(vec![]));
    }
}
