use crate::domain::models::CultureProfile;
use crate::state::SharedState;
use crate::web::session::Session;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/:id/profile", get(get_profile))
        .route("/:id/recompute", post(recompute_profile))
        .with_state(state)
}

/// Latest stored profile. 404 means no aggregation has run yet for this
/// company; staleness display is the caller's concern (`computedAt` is in
/// the body).
async fn get_profile(
    Session(claims): Session,
    State(state): State<SharedState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CultureProfile>, StatusCode> {
    if claims.company_id != company_id {
        return Err(StatusCode::FORBIDDEN);
    }

    let profile = state
        .profiles
        .get(company_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load profile for {company_id}: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(profile))
}

/// On-demand triggering policy: rebuilds the profile immediately and returns
/// it. A company with no responses yet gets the empty profile back, not an
/// error.
async fn recompute_profile(
    Session(claims): Session,
    State(state): State<SharedState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CultureProfile>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    if claims.company_id != company_id {
        return Err(StatusCode::FORBIDDEN);
    }

    let profile = state.aggregator.recompute(company_id).await.map_err(|e| {
        tracing::error!("Recompute failed for {company_id}: {e:#}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(profile))
}
