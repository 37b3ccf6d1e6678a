//! Document model for the Hearth synchronization layer.
//!
//! Defines the typed view of every document the client reads from or writes
//! to the remote store: rooms, chat messages, typing state, presence, and
//! peer-transfer signaling records. Documents travel over the store boundary
//! as JSON field maps; this crate owns the conversion in both directions so
//! the controllers never touch raw field names.
//!
//! # Components
//!
//! - [`UserId`], [`RoomName`], [`DocId`]: identifier newtypes
//! - [`Timestamp`]: server-assigned logical timestamp with a write-time
//!   sentinel
//! - [`RoomDoc`], [`MessageDoc`], [`TypingDoc`], [`PresenceDoc`],
//!   [`SignalDoc`]: typed documents
//! - [`paths`]: collection path builders

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod document;
mod ids;
pub mod paths;
mod records;
mod timestamp;

pub use document::{Document, DocumentError, from_document, to_document};
pub use ids::{DocId, RoomName, UserId};
pub use records::{
    GENERAL_ROOM, MAX_ADMINS, MessageBody, MessageDoc, PresenceDoc, RoomDoc, SignalDoc, TypingDoc,
};
pub use timestamp::Timestamp;
