use thiserror::Error;

use crate::ingestion::FormatKind;

/// Convenience result type for framing operations.
pub type FramerResult<T> = Result<T, FramerError>;

/// Error type returned by framing functions.
///
/// Parse and selector failures abort a conversion. Cell-level coercion problems never show up
/// here: they become null cells instead.
#[derive(Debug, Error)]
pub enum FramerError {
    /// Underlying I/O error (only produced by path-based entry points).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The input was empty or whitespace-only.
    #[error("invalid/empty input")]
    EmptyInput,

    /// The payload could not be parsed as the detected (or declared) format.
    #[error("malformed {format} input: {message}")]
    MalformedFormat { format: FormatKind, message: String },

    /// CSV parsing produced no usable rows.
    #[error("invalid/empty csv")]
    EmptyCsv,

    /// The root selector was invalid or matched nothing.
    #[error("error applying root selector")]
    SelectorFailure,

    /// The selected document cannot be laid out as a frame (e.g. an empty object).
    #[error("unable to construct frame")]
    UnconstructableFrame,
}

impl FramerError {
    pub(crate) fn malformed(format: FormatKind, message: impl ToString) -> Self {
        Self::MalformedFormat {
            format,
            message: message.to_string(),
        }
    }
}
