//! Error types for drawing operations.

use thiserror::Error;

use crate::outline::PathParseError;

/// Result type for drawing operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in drawing operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// The document carries a version this build does not understand.
    #[error("Unsupported document version: {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the document.
        found: u64,
        /// Version this build writes.
        expected: u64,
    },

    /// The document is structurally invalid (wrong tag, missing fields,
    /// degenerate shapes, ids out of range).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A stroke outline could not be parsed.
    #[error("Malformed path data in element {id}: {source}")]
    MalformedPath {
        /// Id of the offending element.
        id: u64,
        /// Underlying parse failure.
        #[source]
        source: PathParseError,
    },

    /// Two elements in one document share an id.
    #[error("Duplicate element id: {0}")]
    DuplicateId(u64),

    /// A shape descriptor has unusable geometry.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
