//! Peer-to-peer file transfer bootstrapped over the document store.
//!
//! The store relays only the handshake: the sender publishes an offer
//! record, the recipient answers in place (or deletes it to reject), and
//! the file itself streams over a direct data channel in fixed-size
//! chunks terminated by a text sentinel.
//!
//! - [`Sender`] / [`Receiver`]: per-transfer negotiation state machines
//! - [`Chunker`] / [`Assembler`]: sequential chunking and reassembly
//! - [`Signaling`]: the store-backed offer/answer relay
//! - [`PeerConnection`] / [`DataChannel`]: the consumed transport boundary
//!
//! Known limitations, preserved deliberately: no candidate relay (direct
//! connections must establish unaided), no timeouts anywhere in the
//! handshake or stream, and no cleanup of answered signaling records.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod chunker;
mod error;
mod receiver;
mod sender;
mod signaling;
mod transport;

pub use chunker::{Assembler, CHUNK_SIZE, Chunker, END_OF_STREAM, Frame};
pub use error::TransferError;
pub use receiver::{Receiver, ReceiverAction, ReceiverState};
pub use sender::{Sender, SenderAction, SenderState};
pub use signaling::{Signaling, decode_signal};
pub use transport::{DataChannel, MemoryChannel, MemoryConnection, PeerConnection, memory_pair};
