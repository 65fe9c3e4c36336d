//! Response contracts. Store results are translated into these shapes and never passed through raw.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::store::{DeleteOutcome, UpdateOutcome};

#[derive(Serialize, Debug)]
pub struct MessageBody {
    pub message: String,
}

/// `{status: "ok", message}` returned by create operations.
#[derive(Serialize, Debug)]
pub struct StatusAck {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Serialize, Debug)]
pub struct Acknowledged {
    pub acknowledged: bool,
    pub message: String,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl From<DeleteOutcome> for DeleteResult {
    fn from(outcome: DeleteOutcome) -> Self {
        DeleteResult {
            acknowledged: true,
            deleted_count: outcome.deleted,
        }
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<Uuid>,
}

impl From<UpdateOutcome> for UpdateResult {
    fn from(outcome: UpdateOutcome) -> Self {
        UpdateResult {
            acknowledged: true,
            matched_count: outcome.matched,
            modified_count: outcome.modified,
            upserted_count: u64::from(outcome.upserted_id.is_some()),
            upserted_id: outcome.upserted_id,
        }
    }
}

pub fn created_ok(message: &'static str) -> (StatusCode, Json<StatusAck>) {
    (StatusCode::OK, Json(StatusAck { status: "ok", message }))
}

pub fn acknowledged(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<Acknowledged>) {
    (
        status,
        Json(Acknowledged {
            acknowledged: status.is_success(),
            message: message.into(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_result_uses_camel_case_contract() {
        let id = Uuid::now_v7();
        let result = UpdateResult::from(UpdateOutcome {
            matched: 0,
            modified: 0,
            upserted_id: Some(id),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["matchedCount"], 0);
        assert_eq!(json["upsertedCount"], 1);
        assert_eq!(json["upsertedId"], id.to_string());
    }

    #[test]
    fn failed_acknowledgement_is_false() {
        let (status, Json(body)) = acknowledged(StatusCode::NOT_FOUND, "Visa not found");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.acknowledged);
    }
}
