//! Error types for Trellis operations.
//!
//! [`LayoutError`] covers the layout pipeline itself: building the engine
//! request, waiting for the engine and mapping its answer back onto the
//! diagram. [`TrellisError`] is the top-level error returned by
//! [`LayoutBuilder`](crate::LayoutBuilder) and wraps layout failures together
//! with input and configuration problems.

use std::io;

use thiserror::Error;

use trellis_core::diagram::DiagramError;

/// Failure of one layout call.
///
/// Any of these aborts the whole call; the diagram is left as it was.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to serialize layout graph: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("layout engine: something went wrong: {0}")]
    EngineFailed(String),

    #[error("layout engine error: {0}")]
    EngineMessage(String),

    #[error("layout cancelled before the engine finished")]
    Cancelled,

    #[error("unexpected layout engine result: {0}")]
    UnexpectedResult(String),

    #[error("failed to decode layout engine result: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("failed to map layout result: {0}")]
    Reconcile(String),
}

/// The main error type for Trellis operations.
///
/// # Diagnostic Variants
///
/// The `Document` variant keeps the source text next to the JSON error so
/// callers can point at the offending line and column.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid diagram document: {err}")]
    Document { err: serde_json::Error, src: String },

    #[error("invalid diagram: {0}")]
    Diagram(#[from] DiagramError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to layout: {0}")]
    Layout(#[from] LayoutError),
}

impl TrellisError {
    /// Create a new `Document` error with the associated source text.
    pub fn new_document_error(err: serde_json::Error, src: impl Into<String>) -> Self {
        Self::Document {
            err,
            src: src.into(),
        }
    }
}
