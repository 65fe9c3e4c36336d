//! Listing operations: one authoritative copy in the global collection; owner views are filters.

use serde_json::{Map, Value};
use uuid::Uuid;

use super::RequestValidator;
use crate::error::AppError;
use crate::partition::{global_listings, owner_listings, EmailAddress};
use crate::store::{DeleteOutcome, Document, DocumentStore, Filter, FindOptions, UpdateOutcome};

/// Size of the "latest cards" strip.
pub const LATEST_LIMIT: u64 = 6;

const READ_FAILED: &str = "Server error";
const ADD_FAILED: &str = "Failed to add visa";
const NOT_FOUND: &str = "Visa not found";

/// Optional paging for the full listing. No limit returns everything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u64>,
    pub skip: u64,
}

pub struct ListingService;

impl ListingService {
    /// Most recently created listings, newest first.
    pub async fn latest(store: &dyn DocumentStore) -> Result<Vec<Document>, AppError> {
        store
            .find(
                &global_listings(),
                &Filter::all(),
                FindOptions::newest_first().limit(LATEST_LIMIT),
            )
            .await
            .map_err(AppError::read(READ_FAILED))
    }

    pub async fn all(store: &dyn DocumentStore, page: Page) -> Result<Vec<Document>, AppError> {
        let mut options = FindOptions::newest_first().skip(page.skip);
        options.limit = page.limit;
        store
            .find(&global_listings(), &Filter::all(), options)
            .await
            .map_err(AppError::read(READ_FAILED))
    }

    pub async fn by_id(store: &dyn DocumentStore, id: Uuid) -> Result<Document, AppError> {
        store
            .find_by_id(&global_listings(), id)
            .await
            .map_err(AppError::read(READ_FAILED))?
            .ok_or(AppError::NotFound(NOT_FOUND))
    }

    pub async fn by_owner(
        store: &dyn DocumentStore,
        email: &EmailAddress,
    ) -> Result<Vec<Document>, AppError> {
        let view = owner_listings(email);
        store
            .find(&view.collection, &view.filter, FindOptions::default())
            .await
            .map_err(AppError::read(READ_FAILED))
    }

    /// Validate and store a new listing. Nothing is written when validation fails.
    pub async fn add(
        store: &dyn DocumentStore,
        mut body: Map<String, Value>,
    ) -> Result<Uuid, AppError> {
        RequestValidator::strip_id(&mut body);
        let owner = RequestValidator::require_email(&mut body)?;
        let id = store
            .insert_one(&global_listings(), body)
            .await
            .map_err(AppError::write(ADD_FAILED))?;
        tracing::info!(%id, owner = %owner, "listing added");
        Ok(id)
    }

    /// `$set` the given fields on a listing, creating it under `id` if it does not exist.
    pub async fn update(
        store: &dyn DocumentStore,
        id: Uuid,
        mut body: Map<String, Value>,
    ) -> Result<UpdateOutcome, AppError> {
        RequestValidator::strip_id(&mut body);
        RequestValidator::normalize_optional_email(&mut body)?;
        let outcome = store
            .update_by_id(&global_listings(), id, body, true)
            .await
            .map_err(AppError::write(READ_FAILED))?;
        tracing::info!(
            %id,
            matched = outcome.matched,
            upserted = outcome.upserted_id.is_some(),
            "listing updated"
        );
        Ok(outcome)
    }

    /// Deleting an absent id is not an error; callers inspect `deleted`.
    pub async fn delete(store: &dyn DocumentStore, id: Uuid) -> Result<DeleteOutcome, AppError> {
        let outcome = store
            .delete_by_id(&global_listings(), id)
            .await
            .map_err(AppError::write(READ_FAILED))?;
        tracing::info!(%id, deleted = outcome.deleted, "listing delete");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        RequestValidator::body_to_map(v).unwrap()
    }

    #[tokio::test]
    async fn latest_is_capped_prefix_of_all() {
        let store = MemoryStore::new();
        for n in 0..9 {
            ListingService::add(&store, body(json!({"email": "a@x.com", "n": n}))).await.unwrap();
        }
        let latest = ListingService::latest(&store).await.unwrap();
        let all = ListingService::all(&store, Page::default()).await.unwrap();
        assert_eq!(latest.len(), LATEST_LIMIT as usize);
        assert_eq!(all.len(), 9);
        assert_eq!(latest[..], all[..latest.len()]);
        assert_eq!(latest[0].fields["n"], 8);
    }

    #[tokio::test]
    async fn add_without_email_writes_nothing() {
        let store = MemoryStore::new();
        let err = ListingService::add(&store, body(json!({"country": "DE"}))).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField("email")));
        assert_eq!(store.collection_count().await, 0);
    }

    #[tokio::test]
    async fn owner_view_follows_updates_and_deletes() {
        let store = MemoryStore::new();
        let owner = EmailAddress::parse("a@x.com").unwrap();
        let id = ListingService::add(&store, body(json!({"email": "A@x.com", "fee": 100})))
            .await
            .unwrap();
        ListingService::add(&store, body(json!({"email": "b@x.com"}))).await.unwrap();

        ListingService::update(&store, id, body(json!({"fee": 90}))).await.unwrap();
        let mine = ListingService::by_owner(&store, &owner).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].fields["fee"], 90);

        assert_eq!(ListingService::delete(&store, id).await.unwrap().deleted, 1);
        assert!(ListingService::by_owner(&store, &owner).await.unwrap().is_empty());
        assert!(matches!(
            ListingService::by_id(&store, id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_rejects_invalid_owner() {
        let store = MemoryStore::new();
        let err = ListingService::update(&store, Uuid::now_v7(), body(json!({"email": "nope"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidEmail(_)));
    }
}
