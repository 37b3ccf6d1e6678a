//! Append-only message feed for the current room.
//!
//! The feed is keyed by document id: each id is appended at most once, so
//! the snapshot replay that follows a re-subscribe (same docs, delivered
//! again as additions) cannot duplicate rows. Edits and deletions are not
//! part of the model and their deliveries are ignored.

use std::collections::HashSet;

use hearth_proto::{DocId, MessageBody, MessageDoc, Timestamp, UserId, from_document};
use hearth_store::{ChangeBatch, ChangeKind};

/// Fixed rendering for encrypted message bodies. The feed never decrypts
/// inline; decryption is an explicit per-message user action.
pub const ENCRYPTED_PLACEHOLDER: &str = "[encrypted message]";

/// Who authored a rendered message, from the local user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Sent by the local user.
    Mine,
    /// Sent by anyone else.
    Theirs,
}

/// One feed row ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Document id, unique within the room's chat collection.
    pub id: DocId,
    /// Sender identity.
    pub sender: UserId,
    /// Local-or-remote classification for alignment/styling.
    pub origin: Origin,
    /// Display text: the plaintext, or [`ENCRYPTED_PLACEHOLDER`].
    pub text: String,
    /// Whether the stored body was encrypted.
    pub encrypted: bool,
    /// Server-resolved send time.
    pub ts: Timestamp,
}

/// Outcome of a send request, before any store call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The draft was blank (empty or whitespace-only); nothing to write.
    Blank,
    /// A document to append to the room's chat collection.
    Write(MessageDoc),
}

/// Message list state for the current room.
#[derive(Debug)]
pub struct Feed {
    me: UserId,
    seen: HashSet<DocId>,
    messages: Vec<RenderedMessage>,
}

impl Feed {
    /// An empty feed for the local user.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            seen: HashSet::new(),
            messages: Vec::new(),
        }
    }

    /// All rows appended so far, in delivery order (server-time ascending
    /// within a subscription).
    pub fn messages(&self) -> &[RenderedMessage] {
        &self.messages
    }

    /// Reset for a room switch. The next subscription replays the new
    /// room's history from scratch.
    pub fn clear(&mut self) {
        self.seen.clear();
        self.messages.clear();
    }

    /// Validate a draft for sending. Blank drafts produce no write; a
    /// non-blank draft becomes a server-stamped plaintext document.
    pub fn prepare_send(&self, draft: &str) -> SendOutcome {
        if draft.trim().is_empty() {
            return SendOutcome::Blank;
        }
        SendOutcome::Write(MessageDoc::plain(self.me.clone(), draft))
    }

    /// Apply one subscription batch, returning the rows that were actually
    /// appended. Already-seen ids and non-addition changes are skipped;
    /// documents that do not decode as messages are dropped.
    pub fn apply_batch(&mut self, batch: &ChangeBatch) -> Vec<RenderedMessage> {
        let mut appended = Vec::new();
        for change in batch {
            if change.kind != ChangeKind::Added || self.seen.contains(&change.id) {
                continue;
            }
            let Ok(doc) = from_document::<MessageDoc>(&change.doc) else {
                continue;
            };
            self.seen.insert(change.id.clone());
            let row = self.render(change.id.clone(), doc);
            self.messages.push(row.clone());
            appended.push(row);
        }
        appended
    }

    fn render(&self, id: DocId, doc: MessageDoc) -> RenderedMessage {
        let origin = if doc.sender == self.me {
            Origin::Mine
        } else {
            Origin::Theirs
        };
        let (text, encrypted) = match doc.body {
            MessageBody::Plain { msg } => (msg, false),
            MessageBody::Encrypted { .. } => (ENCRYPTED_PLACEHOLDER.to_owned(), true),
        };
        RenderedMessage {
            id,
            sender: doc.sender,
            origin,
            text,
            encrypted,
            ts: doc.ts,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hearth_proto::to_document;
    use hearth_store::DocChange;

    fn added(id: &str, doc: &MessageDoc) -> DocChange {
        DocChange {
            kind: ChangeKind::Added,
            id: DocId::from(id),
            doc: to_document(doc).unwrap(),
        }
    }

    #[test]
    fn blank_draft_produces_no_write() {
        let feed = Feed::new(UserId::from("me@x.io"));
        assert_eq!(feed.prepare_send(""), SendOutcome::Blank);
        assert_eq!(feed.prepare_send("   \n\t"), SendOutcome::Blank);
    }

    #[test]
    fn non_blank_draft_is_server_stamped() {
        let feed = Feed::new(UserId::from("me@x.io"));
        let SendOutcome::Write(doc) = feed.prepare_send("hello") else {
            panic!("expected a write");
        };
        assert!(doc.ts.is_server_sentinel());
        assert_eq!(doc.body, MessageBody::Plain { msg: "hello".into() });
    }

    #[test]
    fn duplicate_ids_append_once() {
        let mut feed = Feed::new(UserId::from("me@x.io"));
        let doc = MessageDoc::plain(UserId::from("a@x.io"), "hi");
        let batch = vec![added("m1", &doc)];
        assert_eq!(feed.apply_batch(&batch).len(), 1);
        // Snapshot replay after a re-subscribe delivers the same id again.
        assert!(feed.apply_batch(&batch).is_empty());
        assert_eq!(feed.messages().len(), 1);
    }

    #[test]
    fn own_messages_are_classified_mine() {
        let mut feed = Feed::new(UserId::from("me@x.io"));
        let batch = vec![
            added("m1", &MessageDoc::plain(UserId::from("me@x.io"), "one")),
            added("m2", &MessageDoc::plain(UserId::from("b@x.io"), "two")),
        ];
        let rows = feed.apply_batch(&batch);
        assert_eq!(rows[0].origin, Origin::Mine);
        assert_eq!(rows[1].origin, Origin::Theirs);
    }

    #[test]
    fn encrypted_bodies_render_the_placeholder() {
        let mut feed = Feed::new(UserId::from("me@x.io"));
        let doc = MessageDoc::encrypted(UserId::from("b@x.io"), "c1ph3r".into(), [7; 12]);
        let rows = feed.apply_batch(&vec![added("m1", &doc)]);
        assert_eq!(rows[0].text, ENCRYPTED_PLACEHOLDER);
        assert!(rows[0].encrypted);
    }

    #[test]
    fn modifications_and_removals_are_ignored() {
        let mut feed = Feed::new(UserId::from("me@x.io"));
        let doc = to_document(&MessageDoc::plain(UserId::from("a@x.io"), "hi")).unwrap();
        let batch = vec![
            DocChange {
                kind: ChangeKind::Modified,
                id: DocId::from("m1"),
                doc: doc.clone(),
            },
            DocChange {
                kind: ChangeKind::Removed,
                id: DocId::from("m2"),
                doc,
            },
        ];
        assert!(feed.apply_batch(&batch).is_empty());
    }

    #[test]
    fn clear_allows_replay_for_a_new_room() {
        let mut feed = Feed::new(UserId::from("me@x.io"));
        let batch = vec![added("m1", &MessageDoc::plain(UserId::from("a@x.io"), "hi"))];
        feed.apply_batch(&batch);
        feed.clear();
        assert!(feed.messages().is_empty());
        assert_eq!(feed.apply_batch(&batch).len(), 1);
    }
}
