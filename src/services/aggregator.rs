use crate::domain::models::CultureProfile;
use crate::domain::scoring;
use crate::store::{ProfileStore, ResponseStore, SurveyStore};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Recomputes culture profiles from the full response set.
///
/// `recompute` is a pure function of stored data plus a timestamp, so it can
/// be triggered synchronously after a submit, from the cron job, or from the
/// on-demand endpoint without behavioral differences. Concurrent runs are
/// safe; the profile store keeps whichever result is freshest.
#[derive(Clone)]
pub struct Aggregator {
    surveys: Arc<dyn SurveyStore>,
    responses: Arc<dyn ResponseStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl Aggregator {
    pub fn new(
        surveys: Arc<dyn SurveyStore>,
        responses: Arc<dyn ResponseStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            surveys,
            responses,
            profiles,
        }
    }

    /// Rebuilds and stores the profile for one company across all of its
    /// surveys. A company with no responses yet gets an empty profile
    /// (`sample_size = 0`), not an error.
    pub async fn recompute(&self, company_id: Uuid) -> Result<CultureProfile> {
        let surveys = self.surveys.list_for_company(company_id).await?;
        let survey_ids: Vec<Uuid> = surveys.iter().map(|s| s.id).collect();

        let responses = if survey_ids.is_empty() {
            Vec::new()
        } else {
            self.responses.list_for_surveys(&survey_ids).await?
        };

        let profile = scoring::aggregate(company_id, &surveys, &responses, Utc::now());
        self.profiles.put(&profile).await?;

        tracing::info!(
            company_id = %company_id,
            sample_size = profile.sample_size,
            metrics = profile.metrics.len(),
            "profile recomputed"
        );
        Ok(profile)
    }

    /// Recomputes every company with at least one survey. Used by the
    /// scheduler; per-company failures are logged and do not abort the rest
    /// of the sweep.
    pub async fn recompute_all(&self) -> Result<()> {
        for company_id in self.surveys.company_ids().await? {
            if let Err(e) = self.recompute(company_id).await {
                tracing::error!(company_id = %company_id, "recompute failed: {e:#}");
            }
        }
        Ok(())
    }
}
