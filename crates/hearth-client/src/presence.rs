//! Presence publication and the online roster.
//!
//! On every transition to [`ConnState::Online`] the local user registers a
//! server-side offline write for the disconnect path, then writes
//! themselves online. The registration comes first so an abrupt drop right
//! after reconnecting still leaves the correct final state. The read side
//! is a plain subscription reduced to the set of users currently online.

use std::collections::BTreeSet;

use hearth_proto::{PresenceDoc, UserId, from_document};
use hearth_store::{ChangeBatch, ChangeKind, ConnState};

/// Ordered presence side effects for a connectivity transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceAction {
    /// Register the server-side write applied when this client drops.
    /// Must be executed before [`PresenceAction::WriteOnline`].
    RegisterOffline(UserId, PresenceDoc),
    /// Mark the local user online now.
    WriteOnline(UserId, PresenceDoc),
}

/// Local presence publisher.
#[derive(Debug)]
pub struct Presence {
    me: UserId,
    state: ConnState,
}

impl Presence {
    /// A publisher that has not yet observed a connectivity state.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            state: ConnState::Offline,
        }
    }

    /// Apply a connectivity change. Only the offline-to-online edge
    /// produces writes; the offline edge is handled server-side by the
    /// registered disconnect write.
    pub fn connection_changed(&mut self, state: ConnState) -> Vec<PresenceAction> {
        let was = self.state;
        self.state = state;
        if was == ConnState::Online || state != ConnState::Online {
            return Vec::new();
        }
        vec![
            PresenceAction::RegisterOffline(self.me.clone(), PresenceDoc::offline()),
            PresenceAction::WriteOnline(self.me.clone(), PresenceDoc::online()),
        ]
    }
}

/// Set of users currently online, reduced from presence subscription
/// batches.
#[derive(Debug, Default)]
pub struct Roster {
    online: BTreeSet<UserId>,
}

impl Roster {
    /// An empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Users currently online, in stable order.
    pub fn online(&self) -> impl Iterator<Item = &UserId> {
        self.online.iter()
    }

    /// Apply one presence batch. Returns `true` when the roster changed.
    pub fn apply_batch(&mut self, batch: &ChangeBatch) -> bool {
        let mut changed = false;
        for change in batch {
            let user = UserId::new(change.id.as_str());
            let is_online = change.kind != ChangeKind::Removed
                && from_document::<PresenceDoc>(&change.doc)
                    .map(|doc| doc.online)
                    .unwrap_or(false);
            changed |= if is_online {
                self.online.insert(user)
            } else {
                self.online.remove(&user)
            };
        }
        changed
    }
}
