//! In-process document store. Backs the test suite and `STORE_BACKEND=memory` runs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    merge_fields, next_id, DeleteOutcome, Document, DocumentStore, Filter, FindOptions,
    UpdateOutcome,
};
use crate::error::StoreError;
use crate::partition::CollectionRef;

type Collection = BTreeMap<Uuid, Map<String, Value>>;

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<CollectionRef, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of collections that have received at least one write.
    pub async fn collection_count(&self) -> usize {
        self.collections.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(
        &self,
        coll: &CollectionRef,
        fields: Map<String, Value>,
    ) -> Result<Uuid, StoreError> {
        let id = next_id();
        let mut guard = self.collections.write().await;
        guard.entry(coll.clone()).or_default().insert(id, fields);
        tracing::debug!(collection = %coll, %id, "insert");
        Ok(id)
    }

    async fn find(
        &self,
        coll: &CollectionRef,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        let Some(docs) = guard.get(coll) else {
            return Ok(Vec::new());
        };
        let matching = docs.iter().filter(|(_, fields)| filter.matches(fields));
        let ordered: Box<dyn Iterator<Item = (&Uuid, &Map<String, Value>)> + '_> =
            if options.newest_first {
                Box::new(matching.rev())
            } else {
                Box::new(matching)
            };
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(ordered
            .skip(skip)
            .take(limit)
            .map(|(id, fields)| Document {
                id: *id,
                fields: fields.clone(),
            })
            .collect())
    }

    async fn find_by_id(
        &self,
        coll: &CollectionRef,
        id: Uuid,
    ) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard.get(coll).and_then(|docs| docs.get(&id)).map(|fields| Document {
            id,
            fields: fields.clone(),
        }))
    }

    async fn update_by_id(
        &self,
        coll: &CollectionRef,
        id: Uuid,
        fields: Map<String, Value>,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut guard = self.collections.write().await;
        if let Some(existing) = guard.get_mut(coll).and_then(|docs| docs.get_mut(&id)) {
            let changed = merge_fields(existing, fields);
            return Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(changed),
                upserted_id: None,
            });
        }
        if !upsert {
            return Ok(UpdateOutcome::default());
        }
        guard.entry(coll.clone()).or_default().insert(id, fields);
        tracing::debug!(collection = %coll, %id, "upsert inserted");
        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
            upserted_id: Some(id),
        })
    }

    async fn delete_by_id(
        &self,
        coll: &CollectionRef,
        id: Uuid,
    ) -> Result<DeleteOutcome, StoreError> {
        let mut guard = self.collections.write().await;
        let removed = guard.get_mut(coll).and_then(|docs| docs.remove(&id));
        Ok(DeleteOutcome {
            deleted: u64::from(removed.is_some()),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{global_listings, CollectionRef, Namespace};
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn find_orders_newest_first_with_paging() {
        let store = MemoryStore::new();
        let coll = global_listings();
        let mut ids = Vec::new();
        for n in 0..5 {
            ids.push(store.insert_one(&coll, fields(json!({"n": n}))).await.unwrap());
        }
        let newest = store
            .find(&coll, &Filter::all(), FindOptions::newest_first().skip(1).limit(2))
            .await
            .unwrap();
        let got: Vec<Uuid> = newest.iter().map(|d| d.id).collect();
        assert_eq!(got, vec![ids[3], ids[2]]);

        let oldest = store.find(&coll, &Filter::all(), FindOptions::default()).await.unwrap();
        assert_eq!(oldest.first().map(|d| d.id), Some(ids[0]));
    }

    #[tokio::test]
    async fn collections_are_isolated_and_implicit() {
        let store = MemoryStore::new();
        let a = CollectionRef::new(Namespace::Applications, "u_a");
        let b = CollectionRef::new(Namespace::Applications, "u_b");
        assert!(store.find(&a, &Filter::all(), FindOptions::default()).await.unwrap().is_empty());
        assert_eq!(store.collection_count().await, 0);

        let id = store.insert_one(&a, fields(json!({"email": "a@x.com"}))).await.unwrap();
        assert!(store.find_by_id(&b, id).await.unwrap().is_none());
        assert_eq!(store.delete_by_id(&b, id).await.unwrap().deleted, 0);
        assert_eq!(store.delete_by_id(&a, id).await.unwrap().deleted, 1);
        assert_eq!(store.delete_by_id(&a, id).await.unwrap().deleted, 0);
    }

    #[tokio::test]
    async fn update_merges_or_upserts() {
        let store = MemoryStore::new();
        let coll = global_listings();
        let id = store
            .insert_one(&coll, fields(json!({"country": "DE", "fee": 100})))
            .await
            .unwrap();

        let same = store.update_by_id(&coll, id, fields(json!({"fee": 100})), true).await.unwrap();
        assert_eq!(same, UpdateOutcome { matched: 1, modified: 0, upserted_id: None });

        let changed = store
            .update_by_id(&coll, id, fields(json!({"fee": 150})), true)
            .await
            .unwrap();
        assert_eq!(changed.modified, 1);
        let doc = store.find_by_id(&coll, id).await.unwrap().unwrap();
        assert_eq!(Value::Object(doc.fields), json!({"country": "DE", "fee": 150}));

        let fresh = Uuid::now_v7();
        let no_upsert = store
            .update_by_id(&coll, fresh, fields(json!({"a": 1})), false)
            .await
            .unwrap();
        assert_eq!(no_upsert, UpdateOutcome::default());
        let upserted = store
            .update_by_id(&coll, fresh, fields(json!({"a": 1})), true)
            .await
            .unwrap();
        assert_eq!(upserted.upserted_id, Some(fresh));
        assert!(store.find_by_id(&coll, fresh).await.unwrap().is_some());
    }
}
