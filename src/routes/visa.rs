//! Listing and application routes.

use crate::handlers::{
    add_visa, all_visas, applications_by_applicant, apply_visa, delete_application, delete_visa,
    latest_cards, update_visa, visa_by_id, visas_by_owner,
};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn visa_routes(state: AppState) -> Router {
    Router::new()
        .route("/latestCards", get(latest_cards))
        .route("/visas", get(all_visas))
        .route("/visas/id/:id", get(visa_by_id))
        .route("/visas/apply/email/:email", get(applications_by_applicant))
        .route("/visas/:email", get(visas_by_owner))
        .route("/addVisa", post(add_visa))
        .route("/applyVisa", post(apply_visa))
        .route("/visa/:id", delete(delete_visa))
        .route("/update-visa/:id", put(update_visa))
        .route("/deleteVisa/:id", delete(delete_application))
        .with_state(state)
}
