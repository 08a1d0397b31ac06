//! Payload format detection.
//!
//! [`detect`] resolves a [`FormatKind`] from, in order: an explicit hint, the suffix of a URL or
//! file name, the `Content-Type` response header, and finally a sniff of the content itself.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported payload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Could not classify; treated as best-effort JSON, else an opaque string.
    #[default]
    Unknown,
    /// JSON document.
    Json,
    /// Comma-separated values.
    Csv,
    /// Tab-separated values.
    Tsv,
    /// XML document.
    Xml,
    /// HTML parsed as XML.
    Html,
}

impl FormatKind {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "xml" => Some(Self::Xml),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    /// Parse a format from a `Content-Type` header value (prefix match, case-insensitive).
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.trim().to_ascii_lowercase();
        if ct.starts_with("application/json") {
            Some(Self::Json)
        } else if ct.starts_with("text/csv") {
            Some(Self::Csv)
        } else if ct.starts_with("text/tab-separated-values") {
            Some(Self::Tsv)
        } else if ct.starts_with("application/xml") || ct.starts_with("text/xml") {
            Some(Self::Xml)
        } else {
            None
        }
    }

    /// Lowercase name of the format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xml => "xml",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide which normalizer handles a payload. First match wins; never fails.
///
/// 1. `hint`, unless it is [`FormatKind::Unknown`]
/// 2. the suffix of the path part of `raw_url` (`.json`, `.csv`, `.tsv`, `.xml`, `.html`)
/// 3. the `Content-Type` header (looked up case-insensitively)
/// 4. a sniff of `sample`
pub fn detect(
    hint: FormatKind,
    raw_url: &str,
    headers: &HashMap<String, String>,
    sample: &str,
) -> FormatKind {
    if hint != FormatKind::Unknown {
        return hint;
    }
    if let Some(kind) = detect_from_url(raw_url) {
        return kind;
    }
    if let Some(kind) = detect_from_headers(headers) {
        return kind;
    }
    sniff(sample)
}

/// Match the extension of the path component of a URL or plain file name.
pub fn detect_from_url(raw_url: &str) -> Option<FormatKind> {
    let lowered = raw_url.trim().to_ascii_lowercase();
    let path = lowered
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let (_, ext) = path.rsplit_once('.')?;
    if ext.contains('/') {
        return None;
    }
    FormatKind::from_extension(ext)
}

/// Match a `Content-Type` header.
pub fn detect_from_headers(headers: &HashMap<String, String>) -> Option<FormatKind> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .and_then(|(_, value)| FormatKind::from_content_type(value))
}

/// Guess the format from the content itself.
///
/// The tab/comma checks look at the first line of a multi-line sample; a single line of text
/// with commas is more likely prose than a header-only table.
pub fn sniff(sample: &str) -> FormatKind {
    let input = sample.trim().to_lowercase();
    if (input.starts_with('{') && input.ends_with('}'))
        || (input.starts_with('[') && input.ends_with(']'))
    {
        return FormatKind::Json;
    }
    if (input.starts_with("<!doctype html") || input.starts_with("<html")) && input.ends_with('>')
    {
        return FormatKind::Html;
    }
    if input.starts_with('<') && input.ends_with('>') {
        return FormatKind::Xml;
    }
    let mut lines = input.split('\n');
    let first = lines.next().unwrap_or_default();
    if lines.next().is_some() {
        if first.contains('\t') {
            return FormatKind::Tsv;
        }
        if first.contains(',') {
            return FormatKind::Csv;
        }
    }
    FormatKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_headers() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn explicit_hint_wins() {
        let kind = detect(FormatKind::Csv, "data.json", &no_headers(), "{}");
        assert_eq!(kind, FormatKind::Csv);
    }

    #[test]
    fn url_suffix_ignores_query_and_case() {
        assert_eq!(
            detect_from_url("https://example.com/Users.CSV?page=2#top"),
            Some(FormatKind::Csv)
        );
        assert_eq!(detect_from_url("users.tsv"), Some(FormatKind::Tsv));
        assert_eq!(detect_from_url("https://example.com/api.v1/users"), None);
        assert_eq!(detect_from_url(""), None);
    }

    #[test]
    fn content_type_prefix_match() {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );
        assert_eq!(
            detect(FormatKind::Unknown, "", &headers, "a,b\n1,2"),
            FormatKind::Json
        );
        headers.insert("content-type".to_string(), "text/xml".to_string());
        assert_eq!(detect_from_headers(&headers), Some(FormatKind::Xml));
        headers.insert("content-type".to_string(), "text/plain".to_string());
        assert_eq!(detect_from_headers(&headers), None);
    }

    #[test]
    fn sniffing_rules() {
        assert_eq!(sniff(r#" {"a":1} "#), FormatKind::Json);
        assert_eq!(sniff("[1,2]"), FormatKind::Json);
        assert_eq!(sniff("<!DOCTYPE html><html></html>"), FormatKind::Html);
        assert_eq!(sniff("<HTML><body></body></HTML>"), FormatKind::Html);
        assert_eq!(sniff("<?xml version=\"1.0\"?><root/>"), FormatKind::Xml);
        assert_eq!(sniff("a\tb\n1\t2"), FormatKind::Tsv);
        assert_eq!(sniff("a,b\n1,2"), FormatKind::Csv);
        assert_eq!(sniff("hello world"), FormatKind::Unknown);
        assert_eq!(sniff("hello, world"), FormatKind::Unknown);
    }
}
