use axum::{Router, routing::get};

pub mod cost_sheets;
pub mod inventory;
pub mod system;

/// Router for all dashboard endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/cost-sheets", get(cost_sheets::list_sheets))
        .nest("/inventory", inventory::router())
        .nest("/jobs", cost_sheets::router())
}
