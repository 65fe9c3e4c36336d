//! Partitioned store accessor: resolves which collection holds a user's documents.
//!
//! Listings live in one global collection; a user's own listings are a filtered view of it
//! rather than a second copy, so edits and deletes are visible in both places at once.
//! Applications are partitioned per applicant, in a namespace separate from listings.
//! Raw emails never become collection names: they are validated, normalized and hashed
//! into a [`PartitionKey`].

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use crate::error::AppError;
use crate::store::Filter;

/// Name of the global listings collection.
pub const GLOBAL_LISTINGS: &str = "visas";

/// Field holding the owner (listings) or applicant (applications) email.
pub const EMAIL_FIELD: &str = "email";

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const MAX_EMAIL_LEN: usize = 254;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_re() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// UUID v5 namespace for partition keys. Changing it orphans every existing application.
const PARTITION_NAMESPACE: Uuid = Uuid::from_u128(0x5f1e_2c0a_9d4b_4e7a_8c36_0b9f_d2a1_7e44);

/// Logical database namespace a collection belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Global listings and owner views.
    Listings,
    /// Per-applicant application collections.
    Applications,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Listings => f.write_str("listings"),
            Namespace::Applications => f.write_str("applications"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    namespace: Namespace,
    name: String,
}

impl CollectionRef {
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        CollectionRef {
            namespace,
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A validated, lowercased email address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::MissingField(EMAIL_FIELD));
        }
        if trimmed.len() > MAX_EMAIL_LEN {
            return Err(AppError::InvalidEmail(format!(
                "must be at most {} characters",
                MAX_EMAIL_LEN
            )));
        }
        if !email_re().is_match(trimmed) {
            return Err(AppError::InvalidEmail(trimmed.to_string()));
        }
        Ok(EmailAddress(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collection name derived from an email: `u_` followed by the hex of a UUID v5 digest.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn for_email(email: &EmailAddress) -> Self {
        let digest = Uuid::new_v5(&PARTITION_NAMESPACE, email.as_str().as_bytes());
        PartitionKey(format!("u_{}", digest.simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A read-only view over a collection restricted by a filter.
#[derive(Clone, Debug)]
pub struct OwnerView {
    pub collection: CollectionRef,
    pub filter: Filter,
}

pub fn global_listings() -> CollectionRef {
    CollectionRef::new(Namespace::Listings, GLOBAL_LISTINGS)
}

/// Listings owned by `email`: the global collection filtered on the owner field.
pub fn owner_listings(email: &EmailAddress) -> OwnerView {
    OwnerView {
        collection: global_listings(),
        filter: Filter::eq(EMAIL_FIELD, email.as_str()),
    }
}

pub fn applications(email: &EmailAddress) -> CollectionRef {
    CollectionRef::new(Namespace::Applications, PartitionKey::for_email(email).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let email = EmailAddress::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn empty_email_is_missing() {
        assert!(matches!(EmailAddress::parse("   "), Err(AppError::MissingField("email"))));
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for raw in ["no-at-sign", "a@b", "two@@x.com", "sp ace@x.com", "@x.com"] {
            assert!(
                matches!(EmailAddress::parse(raw), Err(AppError::InvalidEmail(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn email_pattern_is_compiled_once() {
        assert!(std::ptr::eq(email_re(), email_re()));
        assert!(EmailAddress::parse("a+tag@x.com").is_ok());
    }

    #[test]
    fn partition_key_is_deterministic_and_case_insensitive() {
        let a = PartitionKey::for_email(&EmailAddress::parse("a@x.com").unwrap());
        let b = PartitionKey::for_email(&EmailAddress::parse("A@X.com").unwrap());
        let c = PartitionKey::for_email(&EmailAddress::parse("b@x.com").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("u_"));
        assert_eq!(a.as_str().len(), 34);
        assert!(a.as_str()[2..].chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn owner_view_targets_global_collection() {
        let email = EmailAddress::parse("a@x.com").unwrap();
        let view = owner_listings(&email);
        assert_eq!(view.collection, global_listings());
        assert_eq!(view.collection.namespace(), Namespace::Listings);
        assert_eq!(view.filter.get(EMAIL_FIELD), Some(&serde_json::json!("a@x.com")));
    }

    #[test]
    fn applications_live_in_their_own_namespace() {
        let email = EmailAddress::parse("a@x.com").unwrap();
        let coll = applications(&email);
        assert_eq!(coll.namespace(), Namespace::Applications);
        assert_eq!(coll.name(), PartitionKey::for_email(&email).as_str());
    }
}
