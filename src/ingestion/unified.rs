//! Unified conversion entrypoint.
//!
//! Most callers should use [`to_frame`], which runs the whole pipeline on a raw payload:
//!
//! detect format → normalize into a [`Value`] tree → apply the root selector → build the frame
//!
//! - If [`FramerOptions::input_type`] is [`FormatKind::Unknown`], the format is detected from the
//!   URL/file name, the `Content-Type` header, or the content itself.
//! - If a [`FramerObserver`] is provided, success/failure/alerts are reported to it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{FramerError, FramerResult};
use crate::framing::build_frame;
use crate::selector::{EmptySelection, ExpressionEvaluator, PathEvaluator, select_with};
use crate::types::{ColumnSpec, ColumnsMode, Frame, Value};

use super::csv::{CsvOptions, csv_to_value};
use super::detect::{FormatKind, detect};
use super::json::{json_to_value, try_json_to_value};
use super::observability::{FramerContext, FramerObserver, FramerSeverity, FramerStats};
use super::xml::{html_to_value, xml_to_value};

/// Frame name used when [`FramerOptions::name`] is empty.
pub const DEFAULT_FRAME_NAME: &str = "response";

/// Options controlling a conversion.
///
/// Deserializes from camelCase keys (`rootSelector`, `columnsMode`, `csvOptions`, ...), so it can
/// be read straight from a query model. Use [`Default`] for common cases.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FramerOptions {
    /// Frame name; [`DEFAULT_FRAME_NAME`] when empty.
    pub name: String,
    /// Declared format; [`FormatKind::Unknown`] means detect.
    pub input_type: FormatKind,
    /// URL or file name the payload came from (used for detection only).
    pub raw_url: String,
    /// Response headers (used for detection only).
    pub headers: HashMap<String, String>,
    /// Root selector expression; empty selects the whole document.
    pub root_selector: String,
    /// Explicit columns.
    pub columns: Vec<ColumnSpec>,
    /// How explicit columns combine with inferred ones.
    pub columns_mode: ColumnsMode,
    /// CSV/TSV tokenizer options.
    pub csv_options: CsvOptions,
    /// What a selector resolving to an empty array produces.
    pub empty_selection: EmptySelection,
    /// Engine for root selectors; the bundled [`ExpressionEvaluator`] when `None`.
    #[serde(skip)]
    pub evaluator: Option<Arc<dyn PathEvaluator>>,
    /// Optional observer for logging/alerts.
    #[serde(skip)]
    pub observer: Option<Arc<dyn FramerObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    #[serde(skip, default = "default_alert_threshold")]
    pub alert_at_or_above: FramerSeverity,
}

fn default_alert_threshold() -> FramerSeverity {
    FramerSeverity::Critical
}

impl FramerOptions {
    /// The frame name to use, falling back to [`DEFAULT_FRAME_NAME`].
    pub fn frame_name(&self) -> &str {
        if self.name.is_empty() {
            DEFAULT_FRAME_NAME
        } else {
            &self.name
        }
    }

    fn context(&self, format: FormatKind) -> FramerContext {
        FramerContext {
            name: self.frame_name().to_string(),
            format,
            raw_url: self.raw_url.clone(),
        }
    }
}

impl fmt::Debug for FramerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramerOptions")
            .field("name", &self.name)
            .field("input_type", &self.input_type)
            .field("raw_url", &self.raw_url)
            .field("headers", &self.headers)
            .field("root_selector", &self.root_selector)
            .field("columns", &self.columns)
            .field("columns_mode", &self.columns_mode)
            .field("csv_options", &self.csv_options)
            .field("empty_selection", &self.empty_selection)
            .field("evaluator_set", &self.evaluator.is_some())
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for FramerOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            input_type: FormatKind::Unknown,
            raw_url: String::new(),
            headers: HashMap::new(),
            root_selector: String::new(),
            columns: Vec::new(),
            columns_mode: ColumnsMode::Replace,
            csv_options: CsvOptions::default(),
            empty_selection: EmptySelection::Error,
            evaluator: None,
            observer: None,
            alert_at_or_above: default_alert_threshold(),
        }
    }
}

/// Normalize a raw payload of a known format into a [`Value`] tree.
///
/// Blank input is always [`FramerError::EmptyInput`]. [`FormatKind::Unknown`] payloads are parsed
/// as JSON when possible and otherwise kept as a single string value.
pub fn normalize(raw: &str, kind: FormatKind, options: &FramerOptions) -> FramerResult<Value> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(FramerError::EmptyInput);
    }
    match kind {
        FormatKind::Json => json_to_value(input),
        FormatKind::Csv | FormatKind::Tsv => {
            csv_to_value(input, kind, &options.csv_options, &options.columns)
        }
        FormatKind::Xml => xml_to_value(input),
        FormatKind::Html => html_to_value(input),
        FormatKind::Unknown => {
            Ok(try_json_to_value(input).unwrap_or_else(|| Value::String(input.to_string())))
        }
    }
}

/// Convert a raw payload into a [`Frame`].
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row/column counts
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
///
/// # Examples
///
/// ```
/// use anyframe::ingestion::{FramerOptions, to_frame};
///
/// # fn main() -> Result<(), anyframe::FramerError> {
/// let opts = FramerOptions {
///     root_selector: "users".to_string(),
///     ..Default::default()
/// };
/// let frame = to_frame(r#"{"users":[{"name":"foo"},{"name":"bar"}]}"#, &opts)?;
/// assert_eq!(frame.row_count(), 2);
/// assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["name"]);
/// # Ok(())
/// # }
/// ```
pub fn to_frame(input: &str, options: &FramerOptions) -> FramerResult<Frame> {
    let kind = detect(options.input_type, &options.raw_url, &options.headers, input);
    tracing::debug!(format = %kind, url = %options.raw_url, "detected payload format");

    let result =
        normalize(input, kind, options).and_then(|document| frame_document(document, options));
    report(options, &options.context(kind), &result);
    result
}

/// Convert an already-parsed [`Value`] into a [`Frame`].
///
/// Detection and normalization are skipped; the root selector and columns still apply.
pub fn to_frame_from_value(document: Value, options: &FramerOptions) -> FramerResult<Frame> {
    let result = frame_document(document, options);
    report(options, &options.context(options.input_type), &result);
    result
}

/// Read a file and convert its contents.
///
/// The file name stands in for [`FramerOptions::raw_url`] when that is empty, so the extension
/// drives detection. I/O failures are reported as [`FramerSeverity::Critical`].
pub fn frame_from_path(path: impl AsRef<Path>, options: &FramerOptions) -> FramerResult<Frame> {
    let path = path.as_ref();
    let mut options = options.clone();
    if options.raw_url.is_empty() {
        options.raw_url = path.display().to_string();
    }

    match std::fs::read_to_string(path) {
        Ok(text) => to_frame(&text, &options),
        Err(e) => {
            let kind = detect(options.input_type, &options.raw_url, &options.headers, "");
            let result = Err(FramerError::Io(e));
            report(&options, &options.context(kind), &result);
            result
        }
    }
}

fn frame_document(document: Value, options: &FramerOptions) -> FramerResult<Frame> {
    let evaluator: &dyn PathEvaluator = match options.evaluator.as_deref() {
        Some(evaluator) => evaluator,
        None => &ExpressionEvaluator,
    };
    let selected = select_with(
        evaluator,
        document,
        &options.root_selector,
        options.empty_selection,
    )?;
    build_frame(
        &selected,
        &options.columns,
        options.columns_mode,
        options.frame_name(),
    )
}

fn report(options: &FramerOptions, ctx: &FramerContext, result: &FramerResult<Frame>) {
    match result {
        Ok(frame) => {
            let stats = FramerStats {
                rows: frame.row_count(),
                columns: frame.columns.len(),
            };
            tracing::debug!(name = %ctx.name, rows = stats.rows, columns = stats.columns, "frame ready");
            if let Some(obs) = options.observer.as_ref() {
                obs.on_success(ctx, stats);
            }
        }
        Err(e) => {
            let sev = FramerSeverity::for_error(e);
            tracing::debug!(name = %ctx.name, error = %e, ?sev, "frame conversion failed");
            if let Some(obs) = options.observer.as_ref() {
                obs.on_failure(ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }
}

/// What a [`FramerRequest`] converts.
#[derive(Debug, Clone)]
pub enum FramerInput {
    /// A raw payload.
    Text(String),
    /// An already-parsed document.
    Value(Value),
    /// A file to read.
    Path(PathBuf),
}

/// Convenience helper for callers that want an owned request object.
///
/// This can be useful if you want to enqueue conversions in a job system (see
/// [`crate::execution::FramingEngine`]).
#[derive(Debug, Clone)]
pub struct FramerRequest {
    /// Payload to convert.
    pub input: FramerInput,
    /// Options controlling the conversion.
    pub options: FramerOptions,
}

impl FramerRequest {
    /// Request converting a raw payload.
    pub fn text(input: impl Into<String>, options: FramerOptions) -> Self {
        Self {
            input: FramerInput::Text(input.into()),
            options,
        }
    }

    /// Request converting a file.
    pub fn path(path: impl Into<PathBuf>, options: FramerOptions) -> Self {
        Self {
            input: FramerInput::Path(path.into()),
            options,
        }
    }

    /// Execute the request.
    pub fn run(&self) -> FramerResult<Frame> {
        match &self.input {
            FramerInput::Text(text) => to_frame(text, &self.options),
            FramerInput::Value(value) => to_frame_from_value(value.clone(), &self.options),
            FramerInput::Path(path) => frame_from_path(path, &self.options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_deserialize_from_camel_case() {
        let opts: FramerOptions = serde_json::from_str(
            r#"{
                "name": "users",
                "inputType": "csv",
                "rootSelector": "",
                "columns": [{"selector": "age", "type": "number", "alias": "Age"}],
                "columnsMode": "override",
                "csvOptions": {"delimiter": ";", "skipLinesWithError": true},
                "emptySelection": "empty_frame"
            }"#,
        )
        .unwrap();
        assert_eq!(opts.frame_name(), "users");
        assert_eq!(opts.input_type, FormatKind::Csv);
        assert_eq!(opts.columns_mode, ColumnsMode::Override);
        assert_eq!(opts.csv_options.delimiter, ";");
        assert!(opts.csv_options.skip_lines_with_error);
        assert_eq!(opts.empty_selection, EmptySelection::EmptyFrame);
        assert_eq!(opts.alert_at_or_above, FramerSeverity::Critical);
        assert!(opts.observer.is_none());
    }

    #[test]
    fn blank_input_is_empty_input() {
        let opts = FramerOptions::default();
        for kind in [FormatKind::Json, FormatKind::Csv, FormatKind::Unknown] {
            assert!(matches!(normalize(" \n\t", kind, &opts), Err(FramerError::EmptyInput)));
        }
    }

    #[test]
    fn unknown_payloads_fall_back_to_a_string() {
        let opts = FramerOptions::default();
        assert_eq!(
            normalize("hello world", FormatKind::Unknown, &opts).unwrap(),
            Value::from("hello world")
        );
        assert_eq!(
            normalize("123.456", FormatKind::Unknown, &opts).unwrap(),
            Value::Number(123.456)
        );
    }

    #[test]
    fn default_name_is_response() {
        let frame = to_frame("true", &FramerOptions::default()).unwrap();
        assert_eq!(frame.name, "response");
        assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["response"]);
    }
}
