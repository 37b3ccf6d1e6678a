//! Raw document representation and typed conversions.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// A raw store document: a JSON field map.
///
/// This is the shape documents have at the store boundary. Typed records
/// convert to and from it via [`to_document`] / [`from_document`].
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Errors converting between typed records and raw documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The value serialized to something other than a JSON object.
    #[error("record did not serialize to an object: {0}")]
    NotAnObject(String),

    /// Serde failure in either direction.
    #[error("document conversion failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Serialize a typed record into a raw document.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, DocumentError> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(DocumentError::NotAnObject(other.to_string())),
    }
}

/// Deserialize a raw document into a typed record.
pub fn from_document<T: DeserializeOwned>(doc: &Document) -> Result<T, DocumentError> {
    Ok(serde_json::from_value(serde_json::Value::Object(
        doc.clone(),
    ))?)
}
