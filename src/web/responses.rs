use crate::services::ingest::SubmitError;
use crate::state::SharedState;
use crate::web::session::Session;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct SubmitPayload {
    answers: BTreeMap<Uuid, i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    id: Uuid,
    survey_id: Uuid,
    submitted_at: DateTime<Utc>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/:id/responses", post(submit_response))
        .with_state(state)
}

async fn submit_response(
    Session(claims): Session,
    State(state): State<SharedState>,
    Path(survey_id): Path<Uuid>,
    Json(payload): Json<SubmitPayload>,
) -> Result<(StatusCode, Json<SubmitResponse>), StatusCode> {
    if !state.submit_throttle.allow(claims.user_id).await {
        tracing::warn!(user_id = %claims.user_id, "submission rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let respondent_id = state.pseudonyms.respondent_id(claims.user_id, survey_id);
    let response = state
        .ingest
        .submit(
            claims.company_id,
            survey_id,
            &respondent_id,
            payload.answers,
        )
        .await
        .map_err(submit_status)?;

    // Synchronous-recompute triggering policy. The response is already
    // durable; a recompute failure here is picked up by the next scheduled
    // or on-demand run, so it does not fail the submission.
    if state.recompute_on_submit {
        if let Err(e) = state.aggregator.recompute(claims.company_id).await {
            tracing::error!(company_id = %claims.company_id, "post-submit recompute failed: {e:#}");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id: response.id,
            survey_id: response.survey_id,
            submitted_at: response.submitted_at,
        }),
    ))
}

fn submit_status(err: SubmitError) -> StatusCode {
    match err {
        SubmitError::UnknownSurvey => StatusCode::NOT_FOUND,
        SubmitError::SurveyClosed => StatusCode::GONE,
        SubmitError::DuplicateSubmission => StatusCode::CONFLICT,
        SubmitError::InvalidAnswer(reason) => {
            tracing::debug!("rejected submission: {reason}");
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SubmitError::Store(e) => {
            tracing::error!("response store failure: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
