//! Listing and application operations on top of a [`DocumentStore`](crate::store::DocumentStore).

mod applications;
mod listings;
mod validation;
pub use applications::ApplicationService;
pub use listings::{ListingService, Page, LATEST_LIMIT};
pub use validation::RequestValidator;
