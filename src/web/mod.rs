pub mod profile;
pub mod responses;
pub mod session;
pub mod surveys;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest(
            "/api/surveys",
            surveys::router(state.clone()).merge(responses::router(state.clone())),
        )
        .nest("/api/companies", profile::router(state))
}
