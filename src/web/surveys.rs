use crate::domain::models::{AnswerScale, Direction, Question, SurveyDefinition};
use crate::state::SharedState;
use crate::web::session::Session;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionPayload {
    prompt: String,
    metric: String,
    direction: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSurveyPayload {
    title: String,
    #[serde(default = "default_scale_min")]
    scale_min: i32,
    #[serde(default = "default_scale_max")]
    scale_max: i32,
    questions: Vec<QuestionPayload>,
}

fn default_scale_min() -> i32 {
    AnswerScale::ONE_TO_FIVE.min
}

fn default_scale_max() -> i32 {
    AnswerScale::ONE_TO_FIVE.max
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(list_surveys))
        .route("/", post(create_survey))
        .route("/:id", get(get_survey))
        .route("/:id/close", post(close_survey))
        .with_state(state)
}

async fn create_survey(
    Session(claims): Session,
    State(state): State<SharedState>,
    Json(payload): Json<CreateSurveyPayload>,
) -> Result<(StatusCode, Json<SurveyDefinition>), StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let title = payload.title.trim();
    if title.is_empty() || payload.questions.is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let scale = AnswerScale {
        min: payload.scale_min,
        max: payload.scale_max,
    };
    if !scale.is_valid() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let mut questions = Vec::with_capacity(payload.questions.len());
    for q in payload.questions {
        let prompt = q.prompt.trim();
        let metric = q.metric.trim();
        if prompt.is_empty() || metric.is_empty() {
            return Err(StatusCode::UNPROCESSABLE_ENTITY);
        }
        let direction = Direction::try_from(q.direction.as_str())
            .map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;
        questions.push(Question {
            id: Uuid::new_v4(),
            prompt: prompt.to_string(),
            metric: metric.to_string(),
            direction,
        });
    }

    let survey = SurveyDefinition {
        id: Uuid::new_v4(),
        company_id: claims.company_id,
        title: title.to_string(),
        scale,
        questions,
        created_at: Utc::now(),
        closed_at: None,
    };

    state.surveys.insert(&survey).await.map_err(|e| {
        tracing::error!("Failed to insert survey: {e:#}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    tracing::info!(survey_id = %survey.id, company_id = %survey.company_id, "survey created");
    Ok((StatusCode::CREATED, Json(survey)))
}

async fn list_surveys(
    Session(claims): Session,
    State(state): State<SharedState>,
) -> Result<Json<Vec<SurveyDefinition>>, StatusCode> {
    let surveys = state
        .surveys
        .list_for_company(claims.company_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list surveys: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Json(surveys))
}

async fn get_survey(
    Session(claims): Session,
    State(state): State<SharedState>,
    Path(survey_id): Path<Uuid>,
) -> Result<Json<SurveyDefinition>, StatusCode> {
    let survey = state
        .surveys
        .get(survey_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load survey {survey_id}: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        // Foreign company's survey reads as missing, not forbidden.
        .filter(|s| s.company_id == claims.company_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(survey))
}

async fn close_survey(
    Session(claims): Session,
    State(state): State<SharedState>,
    Path(survey_id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let survey = state
        .surveys
        .get(survey_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .filter(|s| s.company_id == claims.company_id)
        .ok_or(StatusCode::NOT_FOUND)?;

    state
        .surveys
        .close(survey.id, Utc::now())
        .await
        .map_err(|e| {
            tracing::error!("Failed to close survey {survey_id}: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::info!(survey_id = %survey_id, "survey closed");
    Ok(StatusCode::NO_CONTENT)
}
