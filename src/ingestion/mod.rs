//! Ingestion entrypoints and format normalizers.
//!
//! Most callers should use [`to_frame`] (from [`unified`]) which:
//!
//! - detects the payload format (or uses the one declared in [`FramerOptions`])
//! - normalizes the payload into a [`crate::types::Value`] tree
//! - applies the root selector and builds a [`crate::types::Frame`]
//! - optionally reports success/failure/alerts to a [`FramerObserver`]
//!
//! Format-specific normalizers are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`xml`]

pub mod csv;
pub mod detect;
pub mod json;
pub mod observability;
pub mod unified;
pub mod xml;

pub use self::csv::CsvOptions;
pub use detect::{FormatKind, detect};
pub use observability::{
    CompositeObserver, FileObserver, FramerContext, FramerObserver, FramerSeverity, FramerStats,
    StdErrObserver, TracingObserver,
};
pub use unified::{
    DEFAULT_FRAME_NAME, FramerInput, FramerOptions, FramerRequest, frame_from_path, normalize,
    to_frame, to_frame_from_value,
};
