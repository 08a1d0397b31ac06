use anyframe::FramerError;
use anyframe::ingestion::{CsvOptions, FormatKind, FramerOptions, frame_from_path, to_frame};
use anyframe::types::{ColumnSpec, ColumnType, ColumnsMode, FieldType};

fn csv_opts() -> FramerOptions {
    FramerOptions {
        input_type: FormatKind::Csv,
        ..Default::default()
    }
}

fn strings(v: &[&str]) -> Vec<Option<String>> {
    v.iter().map(|s| Some(s.to_string())).collect()
}

#[test]
fn csv_cells_stay_strings_without_columns() {
    let frame = to_frame("a,b,c\n1,2,3\n4,5,6", &csv_opts()).unwrap();

    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(frame.row_count(), 2);
    assert!(frame.columns.iter().all(|c| c.field_type() == FieldType::String));
    assert_eq!(frame.column("a").unwrap().strings().unwrap(), strings(&["1", "4"]));
    assert_eq!(frame.column("c").unwrap().strings().unwrap(), strings(&["3", "6"]));
}

#[test]
fn csv_is_detected_from_content() {
    let frame = to_frame("a,b\n1,2", &FramerOptions::default()).unwrap();
    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(frame.row_count(), 1);
}

#[test]
fn csv_fixture_with_typed_columns() {
    let opts = FramerOptions {
        columns: vec![
            ColumnSpec::new("id", ColumnType::Number),
            ColumnSpec::new("score", ColumnType::Number),
            ColumnSpec::new("active", ColumnType::Boolean).with_alias("is_active"),
        ],
        ..Default::default()
    };
    let frame = frame_from_path("tests/fixtures/people.csv", &opts).unwrap();

    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["id", "score", "is_active"]);
    assert_eq!(
        frame.column("id").unwrap().numbers().unwrap(),
        &[Some(1.0), Some(2.0), Some(3.0)]
    );
    assert_eq!(
        frame.column("score").unwrap().numbers().unwrap(),
        &[Some(9.5), None, Some(7.0)]
    );
    assert_eq!(
        frame.column("is_active").unwrap().booleans().unwrap(),
        &[Some(true), Some(false), Some(true)]
    );
}

#[test]
fn aliases_rename_headers_before_inference() {
    let opts = FramerOptions {
        input_type: FormatKind::Csv,
        columns: vec![ColumnSpec::new("score", ColumnType::Number).with_alias("points")],
        columns_mode: ColumnsMode::Append,
        ..Default::default()
    };
    let frame = to_frame("name,score\nann,3\nben,x", &opts).unwrap();

    // The header was renamed before inference, so the inferred column is already `points`.
    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["name", "points", "points"]);
    assert_eq!(frame.columns[1].field_type(), FieldType::String);
    assert_eq!(frame.columns[2].numbers().unwrap(), &[Some(3.0), None]);
}

#[test]
fn tsv_uses_tab_delimiter() {
    let frame = frame_from_path("tests/fixtures/cities.tsv", &FramerOptions::default()).unwrap();
    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["city", "id"]);
    assert_eq!(frame.column("city").unwrap().strings().unwrap(), strings(&["London", "Paris"]));
}

#[test]
fn custom_delimiter_and_comment() {
    let opts = FramerOptions {
        input_type: FormatKind::Csv,
        csv_options: CsvOptions {
            delimiter: ";".to_string(),
            comment: "#".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    let frame = to_frame("# exported\nx;y\n1;2\n# trailing\n3;4", &opts).unwrap();
    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["x", "y"]);
    assert_eq!(frame.column("y").unwrap().strings().unwrap(), strings(&["2", "4"]));
}

#[test]
fn no_headers_uses_positional_names() {
    let opts = FramerOptions {
        input_type: FormatKind::Csv,
        csv_options: CsvOptions {
            no_headers: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let frame = to_frame("a,b\nc,d", &opts).unwrap();
    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["1", "2"]);
    assert_eq!(frame.row_count(), 2);
}

#[test]
fn supplied_headers_make_every_line_data() {
    let opts = FramerOptions {
        input_type: FormatKind::Csv,
        csv_options: CsvOptions {
            headers: vec!["first".to_string(), "second".to_string()],
            ..Default::default()
        },
        ..Default::default()
    };
    let frame = to_frame("a,b\nc,d", &opts).unwrap();
    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["first", "second"]);
    assert_eq!(frame.column("first").unwrap().strings().unwrap(), strings(&["a", "c"]));
}

#[test]
fn ragged_rows_fail_unless_relaxed_or_skipped() {
    let input = "a,b\n1,2\n3\n4,5";
    let err = to_frame(input, &csv_opts()).unwrap_err();
    assert!(matches!(err, FramerError::MalformedFormat { format: FormatKind::Csv, .. }));

    let skip = FramerOptions {
        csv_options: CsvOptions {
            skip_lines_with_error: true,
            ..Default::default()
        },
        ..csv_opts()
    };
    let frame = to_frame(input, &skip).unwrap();
    assert_eq!(frame.row_count(), 2);

    let relaxed = FramerOptions {
        csv_options: CsvOptions {
            relax_column_count: true,
            ..Default::default()
        },
        ..csv_opts()
    };
    let frame = to_frame(input, &relaxed).unwrap();
    assert_eq!(frame.row_count(), 3);
    assert_eq!(frame.column("b").unwrap().strings().unwrap()[1], None);
}

#[test]
fn header_only_or_blank_csv_is_an_error() {
    assert!(matches!(to_frame("a,b", &csv_opts()).unwrap_err(), FramerError::EmptyCsv));
    assert!(matches!(to_frame("  \n ", &csv_opts()).unwrap_err(), FramerError::EmptyInput));
}
