//! Visa Hub: REST backend for visa listings and applications over a partitioned document store.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod partition;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use config::{Settings, StoreBackend};
pub use error::{AppError, ConfigError, StoreError};
pub use partition::{CollectionRef, EmailAddress, Namespace, PartitionKey};
pub use routes::{app, common_routes, visa_routes};
pub use service::{ApplicationService, ListingService};
pub use state::AppState;
pub use store::{
    ensure_database_exists, ensure_document_tables, DocumentStore, MemoryStore, PgDocumentStore,
};
