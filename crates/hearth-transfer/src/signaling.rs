//! Store-backed signaling relay.
//!
//! Offer/answer blobs travel through the `signals` collection: the sender
//! appends a record addressed to the recipient, the recipient answers by
//! merging into the same record, and a reject deletes it. Successful
//! transfers never clean their record up; the collection accretes answered
//! records.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use hearth_proto::{DocId, SignalDoc, UserId, paths, to_document};
use hearth_store::{DocChange, DocStore, Query, Subscription};

use crate::error::TransferError;

/// Decode a signaling change into its typed record.
///
/// Malformed records are skipped rather than failing the stream; the
/// collection is shared and other writers are not trusted to be current.
pub fn decode_signal(change: &DocChange) -> Option<(DocId, SignalDoc)> {
    let doc = hearth_proto::from_document::<SignalDoc>(&change.doc).ok()?;
    Some((change.id.clone(), doc))
}

/// One user's handle on the signaling collection.
#[derive(Debug)]
pub struct Signaling<S> {
    store: Arc<S>,
    me: UserId,
}

impl<S: DocStore> Signaling<S> {
    /// A handle for the local user.
    pub fn new(store: Arc<S>, me: UserId) -> Self {
        Self { store, me }
    }

    /// Publish an offer record, returning its assigned id.
    pub async fn publish_offer(&self, doc: &SignalDoc) -> Result<DocId, TransferError> {
        let id = self.store.add(paths::SIGNALS, to_document(doc)?).await?;
        debug!(%id, to = %doc.to, file = %doc.file_name, "offer published");
        Ok(id)
    }

    /// Subscribe to records addressed to the local user (incoming offers).
    pub async fn incoming(&self) -> Result<Subscription, TransferError> {
        let query = Query::collection(paths::SIGNALS)
            .where_eq("to", Value::String(self.me.as_str().to_owned()));
        Ok(self.store.subscribe(query).await?)
    }

    /// Subscribe to records published by the local user, to observe answer
    /// arrivals on outstanding offers.
    pub async fn outgoing(&self) -> Result<Subscription, TransferError> {
        let query = Query::collection(paths::SIGNALS)
            .where_eq("from", Value::String(self.me.as_str().to_owned()));
        Ok(self.store.subscribe(query).await?)
    }

    /// Merge the answer into an existing offer record.
    pub async fn publish_answer(&self, id: &DocId, answer: &str) -> Result<(), TransferError> {
        let mut doc = hearth_proto::Document::new();
        doc.insert("answer".to_owned(), Value::String(answer.to_owned()));
        self.store.set(&paths::signal(id), doc, true).await?;
        debug!(%id, "answer published");
        Ok(())
    }

    /// Delete an offer record, cancelling the transfer.
    pub async fn reject(&self, id: &DocId) -> Result<(), TransferError> {
        self.store.delete(&paths::signal(id)).await?;
        debug!(%id, "offer rejected");
        Ok(())
    }
}
