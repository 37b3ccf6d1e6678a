//! Collection and document path builders.
//!
//! Paths are flat slash-separated strings, mirroring the remote store's
//! addressing. Builders exist so the rest of the codebase never formats
//! paths by hand.

use crate::ids::{DocId, RoomName, UserId};

/// Top-level room collection.
pub const ROOMS: &str = "rooms";

/// Top-level typing-state collection.
pub const TYPING: &str = "typing";

/// Top-level presence collection.
pub const PRESENCE: &str = "presence";

/// Top-level peer-transfer signaling collection.
pub const SIGNALS: &str = "signals";

/// Document path of a room: `rooms/{name}`.
pub fn room(name: &RoomName) -> String {
    format!("{ROOMS}/{name}")
}

/// Chat sub-collection of a room: `rooms/{name}/chat`.
pub fn room_chat(name: &RoomName) -> String {
    format!("{ROOMS}/{name}/chat")
}

/// Document path of a room's typing state: `typing/{name}`.
pub fn typing(name: &RoomName) -> String {
    format!("{TYPING}/{name}")
}

/// Document path of a user's presence record: `presence/{email}`.
pub fn presence(user: &UserId) -> String {
    format!("{PRESENCE}/{user}")
}

/// Document path of a signaling record: `signals/{id}`.
pub fn signal(id: &DocId) -> String {
    format!("{SIGNALS}/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_compose() {
        let room_name = RoomName::from("team");
        assert_eq!(room(&room_name), "rooms/team");
        assert_eq!(room_chat(&room_name), "rooms/team/chat");
        assert_eq!(typing(&room_name), "typing/team");
        assert_eq!(presence(&UserId::from("a@x.io")), "presence/a@x.io");
        assert_eq!(signal(&DocId::from("abc123")), "signals/abc123");
    }
}
