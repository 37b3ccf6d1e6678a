//! Deterministic in-process store for tests and simulation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use hearth_proto::{DocId, Document, Timestamp};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::change::{ChangeKind, DocChange};
use crate::store::{ConnState, DocStore};
use crate::{Query, StoreError, Subscription};

/// In-memory [`DocStore`].
///
/// Clones share the same underlying state, so one instance can back any
/// number of simulated clients. The logical server clock ticks once per
/// applied write; no-op set mutations (union of a present value, difference
/// of an absent one) neither tick the clock nor notify subscribers.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

struct SubEntry {
    query: Query,
    tx: mpsc::UnboundedSender<Vec<DocChange>>,
}

struct Inner {
    /// Full document path -> content.
    docs: BTreeMap<String, Document>,
    /// Logical server clock; source of resolved timestamps.
    clock: u64,
    next_sub_id: u64,
    next_auto_id: u64,
    subs: HashMap<u64, SubEntry>,
    /// Pending on-disconnect writes, fired once on the next drop.
    on_disconnect: Vec<(String, Document)>,
    conn_tx: watch::Sender<ConnState>,
}

impl MemoryStore {
    /// Create an empty store, initially online.
    pub fn new() -> Self {
        let (conn_tx, _) = watch::channel(ConnState::Online);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                docs: BTreeMap::new(),
                clock: 0,
                next_sub_id: 0,
                next_auto_id: 0,
                subs: HashMap::new(),
                on_disconnect: Vec::new(),
                conn_tx,
            })),
        }
    }

    /// Drive the simulated transport connectivity.
    ///
    /// Transitioning to offline first applies and clears every registered
    /// on-disconnect write (they run server-side, so their notifications
    /// still reach subscribers), then signals the transition.
    pub fn set_connected(&self, connected: bool) {
        let mut inner = self.lock();
        if connected {
            let _ = inner.conn_tx.send(ConnState::Online);
            return;
        }

        let pending = std::mem::take(&mut inner.on_disconnect);
        for (path, doc) in pending {
            debug!(path, "applying on-disconnect write");
            inner.apply_set(&path, doc, true);
        }
        let _ = inner.conn_tx.send(ConnState::Offline);
    }

    /// Current value of the logical server clock.
    pub fn server_clock(&self) -> u64 {
        self.lock().clock
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryStore")
            .field("docs", &inner.docs.len())
            .field("clock", &inner.clock)
            .field("subs", &inner.subs.len())
            .finish()
    }
}

/// Split a document path into (parent collection, document id).
fn split_path(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some((parent, id)) => (parent.to_string(), id.to_string()),
        None => (String::new(), path.to_string()),
    }
}

impl Inner {
    /// Tick the clock and resolve every server-timestamp sentinel field in
    /// `doc` to the new tick value.
    fn resolve_timestamps(&mut self, doc: &mut Document) {
        self.clock += 1;
        let now = self.clock;
        for value in doc.values_mut() {
            if value.as_u64() == Some(Timestamp::SERVER.0) {
                *value = Value::from(now);
            }
        }
    }

    /// Apply a set write and notify subscribers.
    fn apply_set(&mut self, path: &str, mut doc: Document, merge: bool) {
        self.resolve_timestamps(&mut doc);

        let existed = self.docs.contains_key(path);
        let old = self.docs.get(path).cloned();
        let new_doc = if merge && existed {
            let mut merged = old.clone().unwrap_or_default();
            for (key, value) in doc {
                merged.insert(key, value);
            }
            merged
        } else {
            doc
        };
        self.docs.insert(path.to_string(), new_doc.clone());

        self.notify(path, old.as_ref(), Some(&new_doc));
    }

    /// Apply a delete and notify subscribers. No-op if absent.
    fn apply_delete(&mut self, path: &str) {
        if let Some(old) = self.docs.remove(path) {
            self.clock += 1;
            self.notify(path, Some(&old), None);
        }
    }

    /// Fan a single document transition out to matching subscriptions.
    ///
    /// A filtered query sees a document that starts matching as `Added` and
    /// one that stops matching as `Removed`, mirroring the backend's
    /// query-scoped change views.
    fn notify(&mut self, path: &str, old: Option<&Document>, new: Option<&Document>) {
        let (collection, id) = split_path(path);
        self.subs.retain(|_, sub| {
            if sub.query.collection != collection {
                return true;
            }
            let matched_before = old.is_some_and(|doc| sub.query.matches(&id, doc));
            let matches_after = new.is_some_and(|doc| sub.query.matches(&id, doc));

            let change = match (matched_before, matches_after) {
                (false, true) => {
                    new.map(|doc| DocChange::new(ChangeKind::Added, DocId::new(&id), doc.clone()))
                }
                (true, true) => {
                    new.map(|doc| DocChange::new(ChangeKind::Modified, DocId::new(&id), doc.clone()))
                }
                (true, false) => {
                    old.map(|doc| DocChange::new(ChangeKind::Removed, DocId::new(&id), doc.clone()))
                }
                (false, false) => None,
            };

            match change {
                // Drop subscriptions whose receiver is gone.
                Some(change) => sub.tx.send(vec![change]).is_ok(),
                None => true,
            }
        });
    }

    /// Documents of `collection` matching `query`, in query order.
    fn snapshot(&self, query: &Query) -> Vec<DocChange> {
        let prefix = format!("{}/", query.collection);
        let mut matching: Vec<(String, Document)> = self
            .docs
            .iter()
            .filter_map(|(path, doc)| {
                let id = path.strip_prefix(&prefix)?;
                // Direct children only; deeper paths belong to
                // sub-collections.
                if id.contains('/') {
                    return None;
                }
                query.matches(id, doc).then(|| (id.to_string(), doc.clone()))
            })
            .collect();

        if let Some(field) = &query.order_by {
            matching.sort_by_key(|(_, doc)| doc.get(field).and_then(Value::as_u64).unwrap_or(0));
        }

        matching
            .into_iter()
            .map(|(id, doc)| DocChange::new(ChangeKind::Added, DocId::new(id), doc))
            .collect()
    }
}

#[async_trait]
impl DocStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.lock().docs.get(path).cloned())
    }

    async fn set(&self, path: &str, doc: Document, merge: bool) -> Result<(), StoreError> {
        self.lock().apply_set(path, doc, merge);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.lock().apply_delete(path);
        Ok(())
    }

    async fn add(&self, collection: &str, doc: Document) -> Result<DocId, StoreError> {
        let mut inner = self.lock();
        inner.next_auto_id += 1;
        // Zero-padded so lexicographic id order tracks creation order.
        let id = format!("auto-{:06}", inner.next_auto_id);
        inner.apply_set(&format!("{collection}/{id}"), doc, false);
        Ok(DocId::new(id))
    }

    async fn array_union(&self, path: &str, field: &str, value: Value) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let doc = inner.docs.get(path).cloned().ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })?;

        let mut array = match doc.get(field) {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(StoreError::NotAnArray {
                    path: path.to_string(),
                    field: field.to_string(),
                });
            }
        };

        if array.contains(&value) {
            // Union of a present value: idempotent no-op, no notification.
            return Ok(());
        }
        array.push(value);

        let mut patch = Document::new();
        patch.insert(field.to_string(), Value::Array(array));
        inner.apply_set(path, patch, true);
        Ok(())
    }

    async fn array_remove(&self, path: &str, field: &str, value: Value) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let doc = inner.docs.get(path).cloned().ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })?;

        let array = match doc.get(field) {
            None => return Ok(()),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(StoreError::NotAnArray {
                    path: path.to_string(),
                    field: field.to_string(),
                });
            }
        };

        if !array.contains(&value) {
            // Difference of an absent value: idempotent no-op.
            return Ok(());
        }
        let remaining: Vec<Value> = array.into_iter().filter(|item| *item != value).collect();

        let mut patch = Document::new();
        patch.insert(field.to_string(), Value::Array(remaining));
        inner.apply_set(path, patch, true);
        Ok(())
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        let mut inner = self.lock();
        let (tx, rx) = mpsc::unbounded_channel();

        // Replay the current snapshot before streaming deltas, so a
        // (re)subscribe always observes full history for its query.
        let snapshot = inner.snapshot(&query);
        let _ = tx.send(snapshot);

        inner.next_sub_id += 1;
        let sub_id = inner.next_sub_id;
        inner.subs.insert(sub_id, SubEntry { query, tx });

        let shared = Arc::clone(&self.inner);
        let unsubscribe = Box::new(move || {
            let mut inner = shared.lock().unwrap_or_else(PoisonError::into_inner);
            inner.subs.remove(&sub_id);
        });

        Ok(Subscription::new(rx, unsubscribe))
    }

    fn connection(&self) -> watch::Receiver<ConnState> {
        self.lock().conn_tx.subscribe()
    }

    async fn on_disconnect_set(&self, path: &str, doc: Document) -> Result<(), StoreError> {
        self.lock().on_disconnect.push((path.to_string(), doc));
        Ok(())
    }
}
