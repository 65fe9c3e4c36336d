//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::{acknowledged, MessageBody};

/// Startup configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: '{value}'")]
    InvalidVar { name: &'static str, value: String },
}

/// Failures raised by a document store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("corrupt document {id} in {collection}: {reason}")]
    CorruptDocument {
        collection: String,
        id: String,
        reason: String,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid email: {0}")]
    InvalidEmail(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(&'static str),
    /// Path id that does not parse as a document identifier. Reported as a server error.
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("{context}: {source}")]
    Read {
        context: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("{context}: {source}")]
    Write {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    pub fn read(context: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::Read { context, source }
    }

    pub fn write(context: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::Write { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingField(_) | AppError::InvalidEmail(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidId(_) | AppError::Read { .. } | AppError::Write { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client. Server-side failures never leak store details.
    pub fn public_message(&self) -> String {
        match self {
            AppError::MissingField(field) => {
                let mut chars = field.chars();
                match chars.next() {
                    Some(first) => {
                        format!("{}{} is required", first.to_uppercase(), chars.as_str())
                    }
                    None => "field is required".into(),
                }
            }
            AppError::InvalidEmail(_) | AppError::BadRequest(_) => self.to_string(),
            AppError::NotFound(message) => (*message).to_string(),
            AppError::InvalidId(_) => "Server error".into(),
            AppError::Read { context, .. } | AppError::Write { context, .. } => {
                (*context).to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = MessageBody {
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// An [`AppError`] rendered as `{acknowledged: false, message}` for routes that acknowledge.
#[derive(Debug)]
pub struct Unacknowledged(pub AppError);

impl From<AppError> for Unacknowledged {
    fn from(err: AppError) -> Self {
        Unacknowledged(err)
    }
}

impl IntoResponse for Unacknowledged {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        acknowledged(status, self.0.public_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_is_capitalized() {
        let err = AppError::MissingField("email");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "Email is required");
    }

    #[test]
    fn store_failures_hide_the_source() {
        let source = StoreError::Unavailable("pool closed".into());
        let err = AppError::write("Failed to add visa")(source);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Failed to add visa");
        assert!(err.to_string().contains("pool closed"));
    }

    #[test]
    fn malformed_id_is_a_server_error() {
        let err = AppError::InvalidId("xyz".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Server error");
    }
}
