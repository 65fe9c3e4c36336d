//! Application handlers: apply, list by applicant, withdraw.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use super::json_object;
use crate::error::{AppError, Unacknowledged};
use crate::extractors::email::{EmailQuery, EMAIL_PARAM};
use crate::partition::EmailAddress;
use crate::response::{acknowledged, created_ok};
use crate::service::{ApplicationService, RequestValidator};
use crate::state::AppState;

/// POST /applyVisa
pub async fn apply_visa(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_object(payload)?;
    ApplicationService::apply(state.store.as_ref(), body).await?;
    Ok(created_ok("Visa application submitted"))
}

/// GET /visas/apply/email/:email
pub async fn applications_by_applicant(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let applicant = EmailAddress::parse(&email)?;
    let docs = ApplicationService::list(state.store.as_ref(), &applicant).await?;
    Ok(Json(docs))
}

/// DELETE /deleteVisa/:id?email=
pub async fn delete_application(
    EmailQuery(email): EmailQuery,
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, Unacknowledged> {
    let raw = email.ok_or(AppError::MissingField(EMAIL_PARAM))?;
    let applicant = EmailAddress::parse(&raw)?;
    let id = RequestValidator::parse_id(&id_str)?;
    ApplicationService::withdraw(state.store.as_ref(), id, &applicant).await?;
    Ok(acknowledged(StatusCode::OK, "Visa deleted successfully"))
}
