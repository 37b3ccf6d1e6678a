//! Transfer error taxonomy.

use hearth_proto::DocumentError;
use hearth_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the signaling adapter and transport boundary.
///
/// The negotiation machines themselves are infallible: out-of-state events
/// are ignored, matching the silent-failure model of the handshake (a peer
/// that never answers stalls the transfer without an error).
#[derive(Debug, Error)]
pub enum TransferError {
    /// A signaling read or write failed.
    #[error("signaling: {0}")]
    Store(#[from] StoreError),

    /// A signaling record failed to encode or decode.
    #[error("document: {0}")]
    Document(#[from] DocumentError),

    /// The peer connection or data channel failed.
    #[error("transport: {0}")]
    Transport(String),
}
