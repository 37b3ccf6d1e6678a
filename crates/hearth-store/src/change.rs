//! Change notifications delivered to subscriptions.

use hearth_proto::{DocId, Document};

/// What happened to a document within a change batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Document newly matches the query (or existed when the subscription
    /// was established; snapshots are replayed as `Added`).
    Added,
    /// Document content changed.
    Modified,
    /// Document was deleted or stopped matching the query.
    Removed,
}

/// One document change within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocChange {
    /// Change type tag.
    pub kind: ChangeKind,
    /// Id of the affected document.
    pub id: DocId,
    /// Document payload. For `Removed` this is the last known content.
    pub doc: Document,
}

impl DocChange {
    /// Build a change entry.
    pub fn new(kind: ChangeKind, id: DocId, doc: Document) -> Self {
        Self { kind, id, doc }
    }
}

/// A batch of changes delivered atomically to one subscription.
///
/// The initial batch after subscribing replays every currently matching
/// document as `Added`, in server order; subsequent batches carry deltas.
pub type ChangeBatch = Vec<DocChange>;
