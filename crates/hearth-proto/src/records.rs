//! Typed documents for every collection the client touches.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::timestamp::Timestamp;

/// The distinguished default room every session starts in.
///
/// It is created lazily on first join and can never be left.
pub const GENERAL_ROOM: &str = "general";

/// Hard cap on the size of a room's admin set.
///
/// Enforced only under serialized promotions; two clients promoting
/// concurrently at the boundary can still exceed it (no transactions on the
/// room document).
pub const MAX_ADMINS: usize = 3;

/// A chat room document (collection `rooms`, keyed by room name).
///
/// Invariants:
/// - `creator` is implicitly privileged even when absent from `admins`.
/// - `admins` stays a subset of `members` along the mutation paths this
///   client performs: promotion requires membership, and member removal
///   also removes the admin bit. The store does not enforce it.
/// - Rooms are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomDoc {
    /// User who created the room.
    pub creator: UserId,
    /// Admin set, capped at [`MAX_ADMINS`].
    pub admins: BTreeSet<UserId>,
    /// Member set. Union/difference mutated, idempotent.
    pub members: BTreeSet<UserId>,
    /// Server-assigned creation time.
    pub created_at: Timestamp,
}

impl RoomDoc {
    /// Initial document for a freshly created room: the creator is the sole
    /// member and sole admin.
    pub fn created_by(creator: UserId) -> Self {
        let mut solo = BTreeSet::new();
        solo.insert(creator.clone());
        Self {
            creator,
            admins: solo.clone(),
            members: solo,
            created_at: Timestamp::SERVER,
        }
    }

    /// Whether `user` is the creator or holds an admin bit.
    pub fn is_privileged(&self, user: &UserId) -> bool {
        self.creator == *user || self.admins.contains(user)
    }
}

/// Message content: exactly one of plaintext or ciphertext+iv.
///
/// The variant is decided by which fields are present in the stored
/// document, matching the store's untyped shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageBody {
    /// Passphrase-encrypted content. The feed never decrypts this inline;
    /// it renders a fixed placeholder instead.
    Encrypted {
        /// Base64 ciphertext produced by the encryption helper.
        ciphertext: String,
        /// 96-bit AES-GCM nonce.
        iv: [u8; 12],
    },
    /// Plain UTF-8 text.
    Plain {
        /// The message text.
        msg: String,
    },
}

/// A chat message (sub-collection `rooms/{room}/chat`, auto-id).
///
/// Append-only and ordered by `ts` ascending; never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageDoc {
    /// Sender identity.
    pub sender: UserId,
    /// Plain or encrypted content.
    #[serde(flatten)]
    pub body: MessageBody,
    /// Server-assigned send time.
    pub ts: Timestamp,
}

impl MessageDoc {
    /// A plaintext message stamped with the server sentinel.
    pub fn plain(sender: UserId, msg: impl Into<String>) -> Self {
        Self {
            sender,
            body: MessageBody::Plain { msg: msg.into() },
            ts: Timestamp::SERVER,
        }
    }

    /// An encrypted message stamped with the server sentinel.
    pub fn encrypted(sender: UserId, ciphertext: String, iv: [u8; 12]) -> Self {
        Self {
            sender,
            body: MessageBody::Encrypted { ciphertext, iv },
            ts: Timestamp::SERVER,
        }
    }
}

/// Shared typing state for one room (collection `typing`, keyed by room
/// name).
///
/// Ephemeral, merge-written, no history. By convention each participant
/// writes only their own key; nothing enforces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct TypingDoc(pub BTreeMap<UserId, bool>);

impl TypingDoc {
    /// A single-entry merge payload `{user: flag}`.
    pub fn entry(user: UserId, flag: bool) -> Self {
        let mut map = BTreeMap::new();
        map.insert(user, flag);
        Self(map)
    }

    /// Users other than `me` whose flag is currently true, in key order.
    pub fn others_typing(&self, me: &UserId) -> Vec<&UserId> {
        self.0
            .iter()
            .filter(|(user, flag)| **flag && *user != me)
            .map(|(user, _)| user)
            .collect()
    }
}

/// Online state for one user (collection `presence`, keyed by email).
///
/// Driven by the transport's connection lifecycle, not application logic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceDoc {
    /// Whether the user currently holds a live connection.
    pub online: bool,
    /// Server-assigned time of the last transition.
    pub last_changed: Timestamp,
}

impl PresenceDoc {
    /// The online record written right after (re)connecting.
    pub fn online() -> Self {
        Self {
            online: true,
            last_changed: Timestamp::SERVER,
        }
    }

    /// The offline record registered as the on-disconnect write.
    pub fn offline() -> Self {
        Self {
            online: false,
            last_changed: Timestamp::SERVER,
        }
    }
}

/// A peer-transfer signaling record (collection `signals`, auto-id).
///
/// Lifecycle: created by the sender with the offer; updated in place by the
/// recipient to add the answer; deleted by the recipient on reject. Never
/// cleaned up automatically after a successful transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignalDoc {
    /// Offering peer.
    pub from: UserId,
    /// Addressed peer.
    pub to: UserId,
    /// Serialized session-description offer.
    pub offer: String,
    /// Serialized session-description answer, added by the recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Name of the offered file.
    pub file_name: String,
}

impl SignalDoc {
    /// A fresh, unanswered offer record.
    pub fn offer(from: UserId, to: UserId, offer: String, file_name: impl Into<String>) -> Self {
        Self {
            from,
            to,
            offer,
            answer: None,
            file_name: file_name.into(),
        }
    }

    /// Whether the recipient has published an answer yet.
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }

    /// Relevant for `user`'s incoming-offer subscription: addressed to them
    /// and not yet answered.
    pub fn is_pending_offer_for(&self, user: &UserId) -> bool {
        self.to == *user && self.answer.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::{from_document, to_document};

    #[test]
    fn created_room_has_creator_as_sole_member_and_admin() {
        let room = RoomDoc::created_by(UserId::from("a@x.io"));
        assert_eq!(room.members.len(), 1);
        assert_eq!(room.admins.len(), 1);
        assert!(room.is_privileged(&UserId::from("a@x.io")));
        assert!(!room.is_privileged(&UserId::from("b@x.io")));
    }

    #[test]
    fn plain_message_document_shape() {
        let msg = MessageDoc::plain(UserId::from("a@x.io"), "hi");
        let doc = to_document(&msg).unwrap();

        assert_eq!(doc.get("msg"), Some(&serde_json::json!("hi")));
        assert!(doc.get("ciphertext").is_none());
        assert!(doc.get("iv").is_none());
    }

    #[test]
    fn encrypted_message_document_shape() {
        let msg = MessageDoc::encrypted(UserId::from("a@x.io"), "AAEC".into(), [7u8; 12]);
        let doc = to_document(&msg).unwrap();

        assert!(doc.get("msg").is_none());
        assert_eq!(doc.get("ciphertext"), Some(&serde_json::json!("AAEC")));
        assert_eq!(doc.get("iv").and_then(|v| v.as_array()).map(Vec::len), Some(12));

        let back: MessageDoc = from_document(&doc).unwrap();
        assert!(matches!(back.body, MessageBody::Encrypted { .. }));
    }

    #[test]
    fn message_body_is_exactly_one_variant() {
        // A document carrying both ciphertext+iv and msg resolves to the
        // encrypted variant (field presence decides, encrypted checked
        // first), never to both.
        let mut doc = to_document(&MessageDoc::encrypted(
            UserId::from("a@x.io"),
            "Zm9v".into(),
            [0u8; 12],
        ))
        .unwrap();
        doc.insert("msg".into(), serde_json::json!("stray"));

        let back: MessageDoc = from_document(&doc).unwrap();
        assert!(matches!(back.body, MessageBody::Encrypted { .. }));
    }

    #[test]
    fn others_typing_excludes_self_and_false_flags() {
        let me = UserId::from("me@x.io");
        let mut doc = TypingDoc::default();
        doc.0.insert(me.clone(), true);
        doc.0.insert(UserId::from("a@x.io"), true);
        doc.0.insert(UserId::from("b@x.io"), false);

        let others = doc.others_typing(&me);
        assert_eq!(others, vec![&UserId::from("a@x.io")]);
    }

    #[test]
    fn signal_answer_roundtrip() {
        let mut signal = SignalDoc::offer(
            UserId::from("a@x.io"),
            UserId::from("b@x.io"),
            "sdp-offer".into(),
            "notes.txt",
        );
        assert!(signal.is_pending_offer_for(&UserId::from("b@x.io")));
        assert!(!signal.is_pending_offer_for(&UserId::from("a@x.io")));

        let doc = to_document(&signal).unwrap();
        assert!(doc.get("answer").is_none());

        signal.answer = Some("sdp-answer".into());
        assert!(signal.is_answered());
        assert!(!signal.is_pending_offer_for(&UserId::from("b@x.io")));

        let doc = to_document(&signal).unwrap();
        let back: SignalDoc = from_document(&doc).unwrap();
        assert_eq!(back.answer.as_deref(), Some("sdp-answer"));
    }

    proptest::proptest! {
        #[test]
        fn message_body_classification_is_stable(text in ".{0,200}") {
            let plain = to_document(&MessageDoc::plain(UserId::from("a@x.io"), text.clone())).unwrap();
            let back: MessageDoc = from_document(&plain).unwrap();
            proptest::prop_assert_eq!(back.body, MessageBody::Plain { msg: text.clone() });

            let sealed =
                to_document(&MessageDoc::encrypted(UserId::from("a@x.io"), text, [1u8; 12]))
                    .unwrap();
            let back: MessageDoc = from_document(&sealed).unwrap();
            let is_encrypted = matches!(back.body, MessageBody::Encrypted { .. });
            proptest::prop_assert!(is_encrypted);
        }
    }
}
