//! Postgres-backed store implementations.
//!
//! All queries are runtime-checked (`sqlx::query` / `query_as`); the schema
//! lives in `migrations/` and is applied at startup with `sqlx::migrate!`.

use crate::domain::models::{
    AnswerScale, CultureProfile, Direction, Question, SurveyDefinition, SurveyResponse,
};
use crate::store::{ProfileStore, ResponseStore, SurveyStore};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SurveyRow {
    id: Uuid,
    company_id: Uuid,
    title: String,
    scale_min: i32,
    scale_max: i32,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct QuestionRow {
    id: Uuid,
    prompt: String,
    metric: String,
    direction: String,
}

fn build_survey(row: SurveyRow, questions: Vec<Question>) -> SurveyDefinition {
    SurveyDefinition {
        id: row.id,
        company_id: row.company_id,
        title: row.title,
        scale: AnswerScale {
            min: row.scale_min,
            max: row.scale_max,
        },
        questions,
        created_at: row.created_at,
        closed_at: row.closed_at,
    }
}

fn build_question(row: QuestionRow) -> Result<Question> {
    let direction = Direction::try_from(row.direction.as_str())
        .map_err(|_| anyhow!("question {} has invalid direction {:?}", row.id, row.direction))?;
    Ok(Question {
        id: row.id,
        prompt: row.prompt,
        metric: row.metric,
        direction,
    })
}

async fn questions_for_survey(pool: &PgPool, survey_id: Uuid) -> Result<Vec<Question>> {
    let rows = sqlx::query_as::<_, QuestionRow>(
        r#"
        SELECT id, prompt, metric, direction
        FROM survey_questions
        WHERE survey_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(build_question).collect()
}

#[async_trait]
impl SurveyStore for PgStore {
    async fn insert(&self, survey: &SurveyDefinition) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO surveys (id, company_id, title, scale_min, scale_max, created_at, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(survey.id)
        .bind(survey.company_id)
        .bind(&survey.title)
        .bind(survey.scale.min)
        .bind(survey.scale.max)
        .bind(survey.created_at)
        .bind(survey.closed_at)
        .execute(&mut *tx)
        .await?;

        for (position, question) in survey.questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO survey_questions (id, survey_id, position, prompt, metric, direction)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(question.id)
            .bind(survey.id)
            .bind(position as i32)
            .bind(&question.prompt)
            .bind(&question.metric)
            .bind(question.direction.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SurveyDefinition>> {
        let row = sqlx::query_as::<_, SurveyRow>(
            r#"
            SELECT id, company_id, title, scale_min, scale_max, created_at, closed_at
            FROM surveys
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let questions = questions_for_survey(&self.pool, row.id).await?;
        Ok(Some(build_survey(row, questions)))
    }

    async fn list_for_company(&self, company_id: Uuid) -> Result<Vec<SurveyDefinition>> {
        let rows = sqlx::query_as::<_, SurveyRow>(
            r#"
            SELECT id, company_id, title, scale_min, scale_max, created_at, closed_at
            FROM surveys
            WHERE company_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let questions = questions_for_survey(&self.pool, row.id).await?;
            out.push(build_survey(row, questions));
        }
        Ok(out)
    }

    async fn close(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE surveys
            SET closed_at = COALESCE(closed_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn company_ids(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT company_id
            FROM surveys
            ORDER BY company_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.try_get::<Uuid, _>("company_id").map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl ResponseStore for PgStore {
    async fn insert_if_absent(&self, response: &SurveyResponse) -> Result<bool> {
        // The unique index on (survey_id, respondent_id) makes the duplicate
        // check atomic with the write; no read-then-write window.
        let answers = serde_json::to_value(&response.answers)?;
        let result = sqlx::query(
            r#"
            INSERT INTO survey_responses (id, survey_id, respondent_id, answers, submitted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (survey_id, respondent_id) DO NOTHING
            "#,
        )
        .bind(response.id)
        .bind(response.survey_id)
        .bind(&response.respondent_id)
        .bind(answers)
        .bind(response.submitted_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_surveys(&self, survey_ids: &[Uuid]) -> Result<Vec<SurveyResponse>> {
        let rows = sqlx::query(
            r#"
            SELECT id, survey_id, respondent_id, answers, submitted_at
            FROM survey_responses
            WHERE survey_id = ANY($1)
            ORDER BY submitted_at ASC, id ASC
            "#,
        )
        .bind(survey_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let answers: serde_json::Value = row.try_get("answers")?;
            let answers: BTreeMap<Uuid, i32> = serde_json::from_value(answers)?;
            out.push(SurveyResponse {
                id: row.try_get("id")?,
                survey_id: row.try_get("survey_id")?,
                respondent_id: row.try_get("respondent_id")?,
                answers,
                submitted_at: row.try_get("submitted_at")?,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get(&self, company_id: Uuid) -> Result<Option<CultureProfile>> {
        let row = sqlx::query(
            r#"
            SELECT company_id, metrics, sample_size, computed_at
            FROM culture_profiles
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let metrics: serde_json::Value = row.try_get("metrics")?;
        let metrics: BTreeMap<String, f64> = serde_json::from_value(metrics)?;
        Ok(Some(CultureProfile {
            company_id: row.try_get("company_id")?,
            metrics,
            sample_size: row.try_get("sample_size")?,
            computed_at: row.try_get("computed_at")?,
        }))
    }

    async fn put(&self, profile: &CultureProfile) -> Result<()> {
        // Full replace with computed_at-based last-write-wins: a stale
        // recompute racing a fresher one is dropped by the WHERE clause.
        let metrics = serde_json::to_value(&profile.metrics)?;
        sqlx::query(
            r#"
            INSERT INTO culture_profiles (company_id, metrics, sample_size, computed_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (company_id) DO UPDATE
            SET metrics = EXCLUDED.metrics,
                sample_size = EXCLUDED.sample_size,
                computed_at = EXCLUDED.computed_at
            WHERE culture_profiles.computed_at <= EXCLUDED.computed_at
            "#,
        )
        .bind(profile.company_id)
        .bind(metrics)
        .bind(profile.sample_size)
        .bind(profile.computed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
