//! Subscription queries.

use serde_json::Value;

/// A query over one collection.
///
/// Supports the two shapes the sync layer needs: an ordered scan of a
/// collection (the message feed) and an equality-filtered scan (signaling
/// records addressed to the current user). Single-document subscriptions
/// are expressed as a query on the parent collection filtered by id via
/// [`Query::doc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Collection path, e.g. `rooms/team/chat`.
    pub collection: String,
    /// Order results (and deliveries) by this numeric field, ascending.
    pub order_by: Option<String>,
    /// Only match documents whose `field` equals `value`.
    pub filter: Option<(String, Value)>,
    /// Only match the document with this id within the collection.
    pub doc_id: Option<String>,
}

impl Query {
    /// Scan a whole collection.
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            collection: path.into(),
            order_by: None,
            filter: None,
            doc_id: None,
        }
    }

    /// Watch a single document, addressed by its full path.
    ///
    /// Splits the path into parent collection and document id.
    pub fn doc(path: &str) -> Self {
        let (collection, id) = match path.rsplit_once('/') {
            Some((parent, id)) => (parent.to_string(), id.to_string()),
            // A bare segment is treated as a root collection with no docs.
            None => (path.to_string(), String::new()),
        };
        Self {
            collection,
            order_by: None,
            filter: None,
            doc_id: Some(id),
        }
    }

    /// Order deliveries by a numeric field, ascending.
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Restrict matches to documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filter = Some((field.into(), value));
        self
    }

    /// Whether a document (by id and content) matches this query.
    pub fn matches(&self, id: &str, doc: &serde_json::Map<String, Value>) -> bool {
        if let Some(want) = &self.doc_id {
            if id != want {
                return false;
            }
        }
        if let Some((field, value)) = &self.filter {
            if doc.get(field) != Some(value) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_query_splits_path() {
        let query = Query::doc("rooms/team");
        assert_eq!(query.collection, "rooms");
        assert_eq!(query.doc_id.as_deref(), Some("team"));
    }

    #[test]
    fn filter_matches_on_field_equality() {
        let query = Query::collection("signals").where_eq("to", serde_json::json!("b@x.io"));

        let mut doc = serde_json::Map::new();
        doc.insert("to".into(), serde_json::json!("b@x.io"));
        assert!(query.matches("any", &doc));

        doc.insert("to".into(), serde_json::json!("c@x.io"));
        assert!(!query.matches("any", &doc));
    }
}
