//! Visa applications, stored per applicant in the applications namespace.

use serde_json::{Map, Value};
use uuid::Uuid;

use super::RequestValidator;
use crate::error::AppError;
use crate::partition::{applications, EmailAddress};
use crate::store::{Document, DocumentStore, Filter, FindOptions};

const APPLY_FAILED: &str = "Failed to apply for visa";
const SERVER_ERROR: &str = "Server error";

pub struct ApplicationService;

impl ApplicationService {
    pub async fn apply(
        store: &dyn DocumentStore,
        mut body: Map<String, Value>,
    ) -> Result<Uuid, AppError> {
        RequestValidator::strip_id(&mut body);
        let applicant = RequestValidator::require_email(&mut body)?;
        let coll = applications(&applicant);
        let id = store
            .insert_one(&coll, body)
            .await
            .map_err(AppError::write(APPLY_FAILED))?;
        tracing::info!(%id, collection = %coll, "application submitted");
        Ok(id)
    }

    /// All applications of one applicant. An applicant with none is `NotFound`.
    pub async fn list(
        store: &dyn DocumentStore,
        applicant: &EmailAddress,
    ) -> Result<Vec<Document>, AppError> {
        let docs = store
            .find(&applications(applicant), &Filter::all(), FindOptions::default())
            .await
            .map_err(AppError::read(SERVER_ERROR))?;
        if docs.is_empty() {
            return Err(AppError::NotFound("No applications found"));
        }
        Ok(docs)
    }

    pub async fn withdraw(
        store: &dyn DocumentStore,
        id: Uuid,
        applicant: &EmailAddress,
    ) -> Result<(), AppError> {
        let outcome = store
            .delete_by_id(&applications(applicant), id)
            .await
            .map_err(AppError::write(SERVER_ERROR))?;
        if outcome.deleted == 0 {
            return Err(AppError::NotFound("Visa not found"));
        }
        tracing::info!(%id, "application withdrawn");
        Ok(())
    }
}
