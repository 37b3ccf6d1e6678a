//! Store error types.

use thiserror::Error;

/// Errors surfaced by [`crate::DocStore`] operations.
///
/// No operation is retried by the caller; every failure is terminal for the
/// user action that triggered it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[error("document not found: {path}")]
    NotFound {
        /// Path of the missing document.
        path: String,
    },

    /// An array-field mutation addressed a field holding a non-array value.
    #[error("field {field} at {path} is not an array")]
    NotAnArray {
        /// Document path.
        path: String,
        /// Offending field name.
        field: String,
    },

    /// A document failed to encode or decode at the boundary.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend rejected the operation or the connection is gone.
    #[error("remote operation failed: {0}")]
    Remote(String),
}

impl From<hearth_proto::DocumentError> for StoreError {
    fn from(err: hearth_proto::DocumentError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
