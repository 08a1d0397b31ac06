use std::collections::HashMap;

use anyframe::ingestion::{FormatKind, FramerOptions, detect, normalize, to_frame};
use anyframe::types::Value;

fn headers(content_type: &str) -> HashMap<String, String> {
    HashMap::from([("Content-Type".to_string(), content_type.to_string())])
}

#[test]
fn resolution_order() {
    let none = HashMap::new();
    assert_eq!(detect(FormatKind::Tsv, "x.json", &headers("text/csv"), "{}"), FormatKind::Tsv);
    assert_eq!(detect(FormatKind::Unknown, "x.json", &headers("text/csv"), "a,b\n1,2"), FormatKind::Json);
    assert_eq!(detect(FormatKind::Unknown, "", &headers("text/csv"), "{}"), FormatKind::Csv);
    assert_eq!(detect(FormatKind::Unknown, "", &none, "<!DOCTYPE html><html></html>"), FormatKind::Html);
    assert_eq!(detect(FormatKind::Unknown, "", &none, "<a/>"), FormatKind::Xml);
    assert_eq!(detect(FormatKind::Unknown, "", &none, "a\tb\n1\t2"), FormatKind::Tsv);
    assert_eq!(detect(FormatKind::Unknown, "", &none, "hello"), FormatKind::Unknown);
}

#[test]
fn content_type_header_drives_conversion() {
    let opts = FramerOptions {
        headers: headers("text/tab-separated-values; charset=utf-8"),
        ..Default::default()
    };
    let frame = to_frame("x\ty\n1\t2", &opts).unwrap();
    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["x", "y"]);
}

#[test]
fn declared_type_overrides_content() {
    let opts = FramerOptions {
        input_type: FormatKind::Csv,
        ..Default::default()
    };
    // Without the hint this would be JSON.
    let frame = to_frame("[1]\n[2]", &opts).unwrap();
    assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["[1]"]);
}

#[test]
fn unknown_input_degrades_to_a_string() {
    let opts = FramerOptions::default();
    assert_eq!(
        normalize("plain text", FormatKind::Unknown, &opts).unwrap(),
        Value::from("plain text")
    );
    assert_eq!(
        normalize("42", FormatKind::Unknown, &opts).unwrap(),
        Value::Number(42.0)
    );
}

#[test]
fn options_parse_format_names() {
    let opts: FramerOptions =
        serde_json::from_str(r#"{"inputType": "html", "rawUrl": "https://x.test/a.xml"}"#).unwrap();
    assert_eq!(opts.input_type, FormatKind::Html);
    assert_eq!(opts.frame_name(), "response");
}
