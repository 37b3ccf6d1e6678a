//! Client error taxonomy.

use hearth_proto::DocumentError;
use hearth_store::StoreError;
use thiserror::Error;

/// Errors surfaced by session operations.
///
/// Local policy refusals are not errors; they flow to the UI as
/// [`SessionEvent::Refused`](crate::SessionEvent::Refused) and the
/// operation simply performs no write.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A store operation failed.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// A typed record failed to encode or decode.
    #[error("document: {0}")]
    Document(#[from] DocumentError),

    /// The operation needs a current room and none is selected.
    #[error("no room selected")]
    NoRoom,
}
