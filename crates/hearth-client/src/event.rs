//! UI-facing session events.

use hearth_proto::{RoomName, UserId};
use hearth_store::ConnState;

use crate::feed::RenderedMessage;
use crate::room::{AdminView, Refusal};

/// Everything the session reports upward. The UI renders these; it never
/// reads machine state directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The current room changed; update the room label.
    RoomChanged(RoomName),
    /// Fresh admin-panel state for the current room.
    AdminView(AdminView),
    /// A message row was appended to the feed.
    MessageAppended(RenderedMessage),
    /// The pending draft was written; clear the input.
    MessageSent,
    /// Typing indicator text, `None` when nobody else is typing.
    TypingLabel(Option<String>),
    /// The set of online users changed.
    RosterChanged(Vec<UserId>),
    /// An operation was refused locally; nothing was written.
    Refused(Refusal),
    /// Leaving `room` needs explicit confirmation via
    /// [`Session::confirm_leave`](crate::Session::confirm_leave).
    ConfirmLeave(RoomName),
    /// Transport connectivity changed.
    Connectivity(ConnState),
    /// A store write failed; `context` names the operation.
    OperationFailed {
        /// The operation that failed.
        context: &'static str,
        /// Backend error rendering.
        error: String,
    },
}
