//! The `DocStore` trait: everything the sync layer asks of the backend.

use async_trait::async_trait;
use hearth_proto::{DocId, Document};
use serde_json::Value;
use tokio::sync::watch;

use crate::{Query, StoreError, Subscription};

/// Transport-level connectivity, as reported by the backend SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Live connection established.
    Online,
    /// Connection lost or not yet established.
    Offline,
}

/// Subscription-based document store.
///
/// All writes are last-write-wins at field granularity; set-valued fields
/// are mutated with idempotent union/difference operations. There are no
/// transactions: concurrent mutations interleave freely and the documented
/// races (admin-cap overshoot, create-or-join) are accepted.
#[async_trait]
pub trait DocStore: Send + Sync {
    /// Fetch a document, `None` if absent.
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError>;

    /// Write a document.
    ///
    /// With `merge` set, only the supplied top-level fields are replaced and
    /// the rest are left untouched; otherwise the document is replaced
    /// wholesale. Creates the document if absent either way. Timestamp
    /// fields carrying the server sentinel are resolved at apply time.
    async fn set(&self, path: &str, doc: Document, merge: bool) -> Result<(), StoreError>;

    /// Delete a document. Deleting an absent document is a no-op.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Append a document to a collection under an auto-generated id.
    async fn add(&self, collection: &str, doc: Document) -> Result<DocId, StoreError>;

    /// Add `value` to the array field `field` of an existing document.
    ///
    /// Set-union semantics: adding an already-present value is a no-op and
    /// produces no change notification.
    async fn array_union(&self, path: &str, field: &str, value: Value) -> Result<(), StoreError>;

    /// Remove `value` from the array field `field` of an existing document.
    ///
    /// Set-difference semantics: removing an absent value is a no-op and
    /// produces no change notification.
    async fn array_remove(&self, path: &str, field: &str, value: Value) -> Result<(), StoreError>;

    /// Subscribe to changes matching `query`.
    ///
    /// The subscription first delivers one batch replaying every currently
    /// matching document as `Added` (in query order), then incremental
    /// batches in server-assigned order. Dropping the handle unsubscribes.
    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError>;

    /// Observe transport connectivity.
    ///
    /// The receiver holds the current state and signals every transition.
    fn connection(&self) -> watch::Receiver<ConnState>;

    /// Register a server-side write executed when this client's connection
    /// drops. Handlers fire once and are cleared after firing.
    async fn on_disconnect_set(&self, path: &str, doc: Document) -> Result<(), StoreError>;
}
