//! `anyframe` turns loosely structured payloads (JSON, CSV/TSV, XML, HTML) into a strongly-typed,
//! columnar [`types::Frame`].
//!
//! The primary entrypoint is [`ingestion::to_frame`], which detects the payload format (from the
//! URL, the `Content-Type` header, or the content itself), normalizes it into a
//! [`types::Value`] tree, applies an optional root selector and then builds the frame.
//!
//! ## What you can convert
//!
//! - **JSON**: objects, arrays of objects, arrays of scalars, NDJSON
//! - **CSV / TSV**: first line is the header; every cell starts out as a string
//! - **XML**: elements become objects, repeated elements become arrays, attributes use `-` prefixes
//! - **HTML**: parsed leniently with the XML rules
//!
//! ## Columns
//!
//! Without explicit columns, the frame schema is inferred: the union of keys across all rows
//! (sorted), each typed from its first non-null value. Nested objects and arrays become JSON text.
//!
//! Explicit [`types::ColumnSpec`]s pick a value by dotted path and coerce it to a
//! [`types::ColumnType`]. [`types::ColumnsMode`] decides whether they replace, extend, or override
//! the inferred columns. Values that cannot be coerced become nulls; they never fail a conversion.
//!
//! ## Quick example
//!
//! ```rust
//! use anyframe::ingestion::{FramerOptions, to_frame};
//! use anyframe::types::{ColumnSpec, ColumnType, ColumnsMode};
//!
//! # fn main() -> Result<(), anyframe::FramerError> {
//! let opts = FramerOptions {
//!     root_selector: "users".to_string(),
//!     columns: vec![ColumnSpec::new("age", ColumnType::Number)],
//!     columns_mode: ColumnsMode::Override,
//!     ..Default::default()
//! };
//! let payload = r#"{"users":[{"name":"foo","age":"30"},{"name":"bar","age":"abc"}]}"#;
//! let frame = to_frame(payload, &opts)?;
//!
//! assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["age", "name"]);
//! assert_eq!(frame.column("age").unwrap().numbers().unwrap(), &[Some(30.0), None]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: unified entrypoints, format detection and normalizers, observability
//! - [`selector`]: the root selector expression language
//! - [`framing`]: schema inference, coercion and frame assembly
//! - [`execution`]: parallel batch conversion with throttling and metrics
//! - [`types`]: the value tree and frame types
//! - [`error`]: error types

pub mod error;
pub mod execution;
pub mod framing;
pub mod ingestion;
pub mod selector;
pub mod types;

pub use error::{FramerError, FramerResult};
pub use ingestion::{FramerOptions, to_frame};
pub use types::{Frame, Value};
