//! Room, feed, typing and presence synchronization for one signed-in user.
//!
//! The crate splits into pure state machines and one async driver:
//!
//! - [`RoomSync`]: room membership, switching and the admin view
//! - [`Feed`]: the id-keyed, append-only message list
//! - [`TypingTracker`]: keystroke debounce and the peers-typing label
//! - [`Presence`] / [`Roster`]: online-state publication and the roster
//! - [`Session`]: owns the machines, executes their actions against a
//!   [`DocStore`](hearth_store::DocStore), and feeds deliveries back
//!
//! The machines are synchronous and deterministic; every store effect is
//! an explicit action value executed by the session. Tests drive the
//! machines directly, or a whole session against the in-memory store.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod event;
mod feed;
mod presence;
mod room;
mod session;
mod typing;

pub use error::ClientError;
pub use event::SessionEvent;
pub use feed::{ENCRYPTED_PLACEHOLDER, Feed, Origin, RenderedMessage, SendOutcome};
pub use presence::{Presence, PresenceAction, Roster};
pub use room::{AdminView, JoinPhase, Refusal, RoomAction, RoomSync, SetOp};
pub use session::Session;
pub use typing::{TYPING_IDLE, TypingTracker, TypingWrite};
