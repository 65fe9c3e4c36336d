//! Document store abstraction: collections of schemaless JSON documents keyed by time-ordered ids.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, ensure_document_tables, PgDocumentStore, SchemaNames};

use std::sync::Mutex;

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::StoreError;
use crate::partition::CollectionRef;

/// Key under which the document id is exposed to clients.
pub const ID_FIELD: &str = "_id";

/// A stored document: its id plus the opaque top-level fields the client sent.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub fields: Map<String, Value>,
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Exact-match conditions on top-level fields. Empty matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn all() -> Self {
        Filter(Map::new())
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::all().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        self.0.iter().all(|(k, v)| fields.get(k) == Some(v))
    }

    /// JSON object usable as a JSONB containment operand.
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Sort by id descending (creation order, newest first). Otherwise ascending.
    pub newest_first: bool,
    pub limit: Option<u64>,
    pub skip: u64,
}

impl FindOptions {
    pub fn newest_first() -> Self {
        FindOptions {
            newest_first: true,
            ..FindOptions::default()
        }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    /// Set when the update inserted a new document.
    pub upserted_id: Option<Uuid>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: u64,
}

/// Operations the routing layer needs from a document store. Collections are implicit:
/// writing to a collection that has never been used creates it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document and return the id the store assigned to it.
    async fn insert_one(
        &self,
        coll: &CollectionRef,
        fields: Map<String, Value>,
    ) -> Result<Uuid, StoreError>;

    async fn find(
        &self,
        coll: &CollectionRef,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(
        &self,
        coll: &CollectionRef,
        id: Uuid,
    ) -> Result<Option<Document>, StoreError>;

    /// Overwrite the given top-level fields, keeping the others. With `upsert`, a missing
    /// document is created with exactly `id` and `fields`.
    async fn update_by_id(
        &self,
        coll: &CollectionRef,
        id: Uuid,
        fields: Map<String, Value>,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_by_id(
        &self,
        coll: &CollectionRef,
        id: Uuid,
    ) -> Result<DeleteOutcome, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Release backend resources. Called once on shutdown.
    async fn close(&self) {}
}

static LAST_ID: Mutex<u128> = Mutex::new(0);

/// Next document id: a UUID v7, strictly greater than every id issued before it in this process.
pub fn next_id() -> Uuid {
    let candidate = Uuid::now_v7().as_u128();
    let mut last = LAST_ID.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let next = if candidate > *last { candidate } else { *last + 1 };
    *last = next;
    Uuid::from_u128(next)
}

/// Apply `$set`-style field overwrites. Returns true when any value changed.
pub(crate) fn merge_fields(target: &mut Map<String, Value>, fields: Map<String, Value>) -> bool {
    let mut changed = false;
    for (k, v) in fields {
        if target.get(&k) != Some(&v) {
            target.insert(k, v);
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn document_serializes_id_first() {
        let id = Uuid::now_v7();
        let doc = Document {
            id,
            fields: object(json!({"country": "DE", "fee": 100})),
        };
        let out = serde_json::to_value(&doc).unwrap();
        assert_eq!(out, json!({"_id": id.to_string(), "country": "DE", "fee": 100}));
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let ids: Vec<Uuid> = (0..1000).map(|_| next_id()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids[0].get_version_num(), 7);
    }

    #[test]
    fn filter_matches_exact_values_only() {
        let fields = object(json!({"email": "a@x.com", "fee": 100}));
        assert!(Filter::all().matches(&fields));
        assert!(Filter::eq("email", "a@x.com").matches(&fields));
        assert!(!Filter::eq("email", "b@x.com").matches(&fields));
        assert!(!Filter::eq("fee", "100").matches(&fields));
        assert!(!Filter::eq("missing", Value::Null).matches(&fields));
    }

    #[test]
    fn merge_reports_changes() {
        let mut doc = object(json!({"country": "DE", "fee": 100}));
        assert!(!merge_fields(&mut doc, object(json!({"fee": 100}))));
        assert!(merge_fields(&mut doc, object(json!({"fee": 120, "type": "student"}))));
        assert_eq!(Value::Object(doc), json!({"country": "DE", "fee": 120, "type": "student"}));
    }
}
