//! Listing handlers: latest, all, by id, by owner, add, update, delete.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use super::json_object;
use crate::error::AppError;
use crate::partition::EmailAddress;
use crate::response::{created_ok, DeleteResult, UpdateResult};
use crate::service::{ListingService, Page, RequestValidator};
use crate::state::AppState;

/// GET /latestCards
pub async fn latest_cards(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let docs = ListingService::latest(state.store.as_ref()).await?;
    Ok(Json(docs))
}

/// GET /visas: all listings newest first; `limit` and `skip` page the result.
pub async fn all_visas(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page {
        limit: params.get("limit").and_then(|v| v.parse().ok()),
        skip: params.get("skip").and_then(|v| v.parse().ok()).unwrap_or(0),
    };
    let docs = ListingService::all(state.store.as_ref(), page).await?;
    Ok(Json(docs))
}

/// GET /visas/id/:id
pub async fn visa_by_id(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = RequestValidator::parse_id(&id_str)?;
    let doc = ListingService::by_id(state.store.as_ref(), id).await?;
    Ok(Json(doc))
}

/// GET /visas/:email
pub async fn visas_by_owner(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let owner = EmailAddress::parse(&email)?;
    let docs = ListingService::by_owner(state.store.as_ref(), &owner).await?;
    Ok(Json(docs))
}

/// POST /addVisa
pub async fn add_visa(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_object(payload)?;
    ListingService::add(state.store.as_ref(), body).await?;
    Ok(created_ok("Visa added successfully"))
}

/// PUT /update-visa/:id (upsert).
pub async fn update_visa(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = RequestValidator::parse_id(&id_str)?;
    let body = json_object(payload)?;
    let outcome = ListingService::update(state.store.as_ref(), id, body).await?;
    Ok(Json(UpdateResult::from(outcome)))
}

/// DELETE /visa/:id. Reports `deletedCount`, 0 when the id was absent.
pub async fn delete_visa(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = RequestValidator::parse_id(&id_str)?;
    let outcome = ListingService::delete(state.store.as_ref(), id).await?;
    Ok(Json(DeleteResult::from(outcome)))
}
