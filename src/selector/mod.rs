//! Selector Evaluator: narrows a document to the sub-tree a root selector points at.
//!
//! Root selectors are evaluated by a [`PathEvaluator`]. The bundled [`ExpressionEvaluator`]
//! understands a JSONata-style language:
//!
//! - paths with flattening across arrays: `library.books.title`, `rows.0`
//! - index and predicate filters: `books[0]`, `books[-1]`, `books[price > 10]`
//! - `$` (context item) and `$$` (document root)
//! - object and array constructors, arithmetic, `&`, comparisons, `and`/`or`, `? :`
//! - functions `$sum $count $min $max $average $map $filter $string $number $boolean $not
//!   $exists $length $uppercase $lowercase $keys $join`, with `function($v, $i) {...}` lambdas
//!
//! Explicit column selectors are simpler dotted paths, resolved per row by [`resolve_path`].

mod eval;
mod functions;
mod lexer;
mod parser;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{FramerError, FramerResult};
use crate::types::Value;

/// Failure inside the expression engine.
///
/// Collapsed into [`FramerError::SelectorFailure`] at the selector boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("unknown function ${0}")]
    UnknownFunction(String),

    #[error("type error: {0}")]
    Type(String),
}

/// Engine that evaluates root-selector expressions.
///
/// Implementations must be stateless per call (or synchronize internally); one instance may be
/// shared by concurrent conversions.
pub trait PathEvaluator: Send + Sync {
    /// Evaluate `expression` against `document`.
    ///
    /// `Ok(None)` means the expression is valid but matched nothing.
    fn evaluate(&self, document: &Value, expression: &str) -> Result<Option<Value>, ExprError>;
}

/// The bundled expression engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionEvaluator;

impl PathEvaluator for ExpressionEvaluator {
    fn evaluate(&self, document: &Value, expression: &str) -> Result<Option<Value>, ExprError> {
        let expr = parser::parse(expression)?;
        eval::evaluate(&expr, document)
    }
}

/// What a selector that resolves to an empty array produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySelection {
    /// Fail with [`FramerError::SelectorFailure`], like an unmatched selector.
    #[default]
    Error,
    /// Keep the empty array, producing a zero-row frame.
    EmptyFrame,
}

/// Apply a root selector with the bundled engine; an empty array result is an error.
///
/// An empty (or blank) expression returns the document unchanged.
pub fn select(document: Value, expression: &str) -> FramerResult<Value> {
    select_with(&ExpressionEvaluator, document, expression, EmptySelection::Error)
}

/// Apply a root selector with a specific engine and empty-array policy.
pub fn select_with(
    evaluator: &dyn PathEvaluator,
    document: Value,
    expression: &str,
    empty: EmptySelection,
) -> FramerResult<Value> {
    if expression.trim().is_empty() {
        return Ok(document);
    }
    match evaluator.evaluate(&document, expression) {
        Ok(Some(Value::Sequence(items))) if items.is_empty() => match empty {
            EmptySelection::EmptyFrame => Ok(Value::Sequence(items)),
            EmptySelection::Error => {
                tracing::debug!(expression, "root selector resolved to an empty array");
                Err(FramerError::SelectorFailure)
            }
        },
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            tracing::debug!(expression, "root selector matched nothing");
            Err(FramerError::SelectorFailure)
        }
        Err(e) => {
            tracing::debug!(expression, error = %e, "root selector failed");
            Err(FramerError::SelectorFailure)
        }
    }
}

/// Resolve a dotted path (`address.postcode`, `hobbies.0`) inside one row.
///
/// A key equal to the whole path wins over splitting it, so CSV headers containing dots still
/// resolve. Numeric segments index into sequences.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    if let Some(v) = value.get(path) {
        return Some(v);
    }
    path.split('.').try_fold(value, |cur, segment| match cur {
        Value::Mapping(map) => map.get(segment),
        Value::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
