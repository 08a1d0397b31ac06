//! JSON normalization.
//!
//! Supported inputs:
//! - Any single JSON document (object, array or scalar)
//! - Newline-delimited JSON (NDJSON), which becomes a sequence with one item per line

use crate::error::{FramerError, FramerResult};
use crate::types::Value;

use super::detect::FormatKind;

/// Parse JSON text into a [`Value`] tree.
pub fn json_to_value(input: &str) -> FramerResult<Value> {
    let trimmed = input.trim();
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(v) => Ok(Value::from(v)),
        Err(e) => parse_ndjson(trimmed).ok_or_else(|| FramerError::malformed(FormatKind::Json, e)),
    }
}

/// Best-effort parse used for unclassified payloads: `None` if the text is not JSON.
pub fn try_json_to_value(input: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Value>(input.trim())
        .ok()
        .map(Value::from)
}

fn parse_ndjson(input: &str) -> Option<Value> {
    let mut items = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v = serde_json::from_str::<serde_json::Value>(line).ok()?;
        items.push(Value::from(v));
    }
    // A single line that failed above is just malformed JSON, not NDJSON.
    (items.len() > 1).then_some(Value::Sequence(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documents_and_scalars() {
        assert_eq!(json_to_value("123.456").unwrap(), Value::Number(123.456));
        assert_eq!(json_to_value(r#""hello""#).unwrap(), Value::from("hello"));
        assert_eq!(
            json_to_value(r#"{"a":[1,2]}"#).unwrap().get("a"),
            Some(&Value::Sequence(vec![Value::Number(1.0), Value::Number(2.0)]))
        );
    }

    #[test]
    fn ndjson_becomes_a_sequence() {
        let v = json_to_value("{\"a\":1}\n\n{\"a\":2}\n").unwrap();
        match v {
            Value::Sequence(items) => assert_eq!(items.len(), 2),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = json_to_value("{\"a\":").unwrap_err();
        assert!(err.to_string().starts_with("malformed json input"));
        assert!(json_to_value("{\"a\":1}\n{oops}").is_err());
    }

    #[test]
    fn best_effort_parse_returns_none_for_text() {
        assert_eq!(try_json_to_value("hello world"), None);
        assert_eq!(try_json_to_value("true"), Some(Value::Bool(true)));
    }
}
