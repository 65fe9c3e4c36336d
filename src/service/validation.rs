//! Request validation at the HTTP boundary.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;
use crate::partition::{EmailAddress, EMAIL_FIELD};
use crate::store::ID_FIELD;

pub struct RequestValidator;

impl RequestValidator {
    pub fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
        match value {
            Value::Object(m) => Ok(m),
            _ => Err(AppError::BadRequest("body must be a JSON object".into())),
        }
    }

    /// Drop a client-supplied `_id`; the store owns identifiers.
    pub fn strip_id(body: &mut Map<String, Value>) {
        body.remove(ID_FIELD);
    }

    /// The body must carry an email. It is validated and replaced by its normalized form.
    pub fn require_email(body: &mut Map<String, Value>) -> Result<EmailAddress, AppError> {
        match body.get(EMAIL_FIELD) {
            None | Some(Value::Null) => Err(AppError::MissingField(EMAIL_FIELD)),
            Some(_) => Self::normalize_email(body),
        }
    }

    /// Like [`require_email`](Self::require_email) but absence is fine (partial updates).
    pub fn normalize_optional_email(
        body: &mut Map<String, Value>,
    ) -> Result<Option<EmailAddress>, AppError> {
        if body.contains_key(EMAIL_FIELD) {
            Self::normalize_email(body).map(Some)
        } else {
            Ok(None)
        }
    }

    fn normalize_email(body: &mut Map<String, Value>) -> Result<EmailAddress, AppError> {
        let email = match body.get(EMAIL_FIELD) {
            Some(Value::String(s)) => EmailAddress::parse(s)?,
            None | Some(Value::Null) => return Err(AppError::MissingField(EMAIL_FIELD)),
            Some(_) => return Err(AppError::InvalidEmail("email must be a string".into())),
        };
        body.insert(EMAIL_FIELD.into(), Value::String(email.as_str().to_string()));
        Ok(email)
    }

    pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
        Uuid::parse_str(raw.trim()).map_err(|_| AppError::InvalidId(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        RequestValidator::body_to_map(v).unwrap()
    }

    #[test]
    fn body_must_be_object() {
        assert!(matches!(
            RequestValidator::body_to_map(json!([1, 2])),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn email_is_required_and_normalized() {
        let mut missing = map(json!({"country": "DE"}));
        assert!(matches!(
            RequestValidator::require_email(&mut missing),
            Err(AppError::MissingField("email"))
        ));

        let mut empty = map(json!({"email": ""}));
        assert!(matches!(
            RequestValidator::require_email(&mut empty),
            Err(AppError::MissingField("email"))
        ));

        let mut number = map(json!({"email": 42}));
        assert!(matches!(
            RequestValidator::require_email(&mut number),
            Err(AppError::InvalidEmail(_))
        ));

        let mut body = map(json!({"email": " A@X.com", "fee": 100}));
        let email = RequestValidator::require_email(&mut body).unwrap();
        assert_eq!(email.as_str(), "a@x.com");
        assert_eq!(body["email"], "a@x.com");
    }

    #[test]
    fn optional_email_is_left_alone_when_absent() {
        let mut body = map(json!({"fee": 120}));
        assert!(RequestValidator::normalize_optional_email(&mut body).unwrap().is_none());
        assert!(!body.contains_key("email"));
    }

    #[test]
    fn client_id_is_stripped() {
        let mut body = map(json!({"_id": "abc", "fee": 1}));
        RequestValidator::strip_id(&mut body);
        assert_eq!(Value::Object(body), json!({"fee": 1}));
    }

    #[test]
    fn ids_must_be_uuids() {
        let id = Uuid::now_v7();
        assert_eq!(RequestValidator::parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(RequestValidator::parse_id("64b7f"), Err(AppError::InvalidId(_))));
    }
}
