pub mod memory;

use crate::domain::models::{CultureProfile, SurveyDefinition, SurveyResponse};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Survey definitions. Insert-only plus a close stamp; definitions are never
/// edited once created.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    async fn insert(&self, survey: &SurveyDefinition) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<SurveyDefinition>>;

    async fn list_for_company(&self, company_id: Uuid) -> Result<Vec<SurveyDefinition>>;

    /// Stamps `closed_at` if not already set. Returns `false` when no such
    /// survey exists. Closing an already-closed survey keeps the original
    /// stamp.
    async fn close(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// Every company that owns at least one survey. Drives the periodic
    /// recompute job.
    async fn company_ids(&self) -> Result<Vec<Uuid>>;
}

/// Append-only response log, unique on `(survey_id, respondent_id)`.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Atomically stores the response unless one already exists for its
    /// `(survey_id, respondent_id)`. Returns `false` on duplicate; the
    /// existing record is never overwritten. The duplicate check and the
    /// write must be one operation, not read-then-write.
    async fn insert_if_absent(&self, response: &SurveyResponse) -> Result<bool>;

    /// All responses for the given surveys, in a stable order
    /// (`submitted_at`, then id) so aggregation is reproducible.
    async fn list_for_surveys(&self, survey_ids: &[Uuid]) -> Result<Vec<SurveyResponse>>;
}

/// Latest computed profile per company.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, company_id: Uuid) -> Result<Option<CultureProfile>>;

    /// Full replace, never a partial merge. Last write wins by
    /// `computed_at`: a put older than the stored profile is dropped, so
    /// concurrent recomputes converge on the freshest result.
    async fn put(&self, profile: &CultureProfile) -> Result<()>;
}
