//! HTTP handlers for listings and applications.

pub mod applications;
pub mod listings;
pub use applications::*;
pub use listings::*;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::service::RequestValidator;

/// Unwrap a JSON body into an object, turning malformed JSON into a `{message}` 400.
pub(crate) fn json_object(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Map<String, Value>, AppError> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    RequestValidator::body_to_map(body)
}
