//! Extract the applicant email from the `?email=` query parameter.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};

/// Query parameter carrying the applicant email.
pub const EMAIL_PARAM: &str = "email";

/// Extractor for the optional, trimmed `email` query parameter. Validation is left to the handler.
#[derive(Clone, Debug)]
pub struct EmailQuery(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for EmailQuery
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(mut params)| params.remove(EMAIL_PARAM))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(EmailQuery(value))
    }
}
