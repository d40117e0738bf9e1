//! In-memory store implementations. Used by the test suite and small
//! single-process deployments; the production path is the Postgres
//! implementation in `crate::db`.

use crate::domain::models::{CultureProfile, SurveyDefinition, SurveyResponse};
use crate::store::{ProfileStore, ResponseStore, SurveyStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct MemorySurveyStore {
    surveys: Arc<RwLock<HashMap<Uuid, SurveyDefinition>>>,
}

impl MemorySurveyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SurveyStore for MemorySurveyStore {
    async fn insert(&self, survey: &SurveyDefinition) -> Result<()> {
        self.surveys
            .write()
            .await
            .insert(survey.id, survey.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<SurveyDefinition>> {
        Ok(self.surveys.read().await.get(&id).cloned())
    }

    async fn list_for_company(&self, company_id: Uuid) -> Result<Vec<SurveyDefinition>> {
        let mut out: Vec<SurveyDefinition> = self
            .surveys
            .read()
            .await
            .values()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.created_at, s.id));
        Ok(out)
    }

    async fn close(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut surveys = self.surveys.write().await;
        match surveys.get_mut(&id) {
            Some(survey) => {
                survey.closed_at.get_or_insert(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn company_ids(&self) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self
            .surveys
            .read()
            .await
            .values()
            .map(|s| s.company_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[derive(Clone, Default)]
pub struct MemoryResponseStore {
    // (survey_id, respondent_id) -> response; the map key is the uniqueness
    // guard, held under one write lock so check-and-insert is atomic.
    responses: Arc<RwLock<HashMap<(Uuid, String), SurveyResponse>>>,
}

impl MemoryResponseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseStore for MemoryResponseStore {
    async fn insert_if_absent(&self, response: &SurveyResponse) -> Result<bool> {
        let key = (response.survey_id, response.respondent_id.clone());
        let mut responses = self.responses.write().await;
        if responses.contains_key(&key) {
            return Ok(false);
        }
        responses.insert(key, response.clone());
        Ok(true)
    }

    async fn list_for_surveys(&self, survey_ids: &[Uuid]) -> Result<Vec<SurveyResponse>> {
        let mut out: Vec<SurveyResponse> = self
            .responses
            .read()
            .await
            .values()
            .filter(|r| survey_ids.contains(&r.survey_id))
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.submitted_at, r.id));
        Ok(out)
    }
}

#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    profiles: Arc<RwLock<HashMap<Uuid, CultureProfile>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, company_id: Uuid) -> Result<Option<CultureProfile>> {
        Ok(self.profiles.read().await.get(&company_id).cloned())
    }

    async fn put(&self, profile: &CultureProfile) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        match profiles.get(&profile.company_id) {
            Some(stored) if stored.computed_at > profile.computed_at => {
                tracing::debug!(
                    company_id = %profile.company_id,
                    "dropping stale profile put ({} < {})",
                    profile.computed_at,
                    stored.computed_at
                );
            }
            _ => {
                profiles.insert(profile.company_id, profile.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn sample_response(survey_id: Uuid, respondent: &str) -> SurveyResponse {
        SurveyResponse {
            id: Uuid::new_v4(),
            survey_id,
            respondent_id: respondent.to_string(),
            answers: BTreeMap::new(),
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected_and_original_kept() {
        let store = MemoryResponseStore::new();
        let survey_id = Uuid::new_v4();

        let first = sample_response(survey_id, "resp-a");
        let second = sample_response(survey_id, "resp-a");

        assert!(store.insert_if_absent(&first).await.unwrap());
        assert!(!store.insert_if_absent(&second).await.unwrap());

        let stored = store.list_for_surveys(&[survey_id]).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, first.id);
    }

    #[tokio::test]
    async fn same_respondent_may_answer_different_surveys() {
        let store = MemoryResponseStore::new();
        let a = sample_response(Uuid::new_v4(), "resp-a");
        let b = sample_response(Uuid::new_v4(), "resp-a");

        assert!(store.insert_if_absent(&a).await.unwrap());
        assert!(store.insert_if_absent(&b).await.unwrap());
    }

    #[tokio::test]
    async fn profile_put_is_last_write_wins_by_computed_at() {
        let store = MemoryProfileStore::new();
        let company = Uuid::new_v4();
        let now = Utc::now();

        let fresh = CultureProfile {
            company_id: company,
            metrics: BTreeMap::from([("collaboration".to_string(), 75.0)]),
            sample_size: 4,
            computed_at: now,
        };
        let stale = CultureProfile {
            company_id: company,
            metrics: BTreeMap::from([("collaboration".to_string(), 10.0)]),
            sample_size: 1,
            computed_at: now - Duration::minutes(5),
        };

        store.put(&fresh).await.unwrap();
        store.put(&stale).await.unwrap();

        let stored = store.get(company).await.unwrap().unwrap();
        assert_eq!(stored.sample_size, 4);
        assert_eq!(stored.metrics.get("collaboration"), Some(&75.0));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_keeps_first_stamp() {
        let store = MemorySurveyStore::new();
        let survey = SurveyDefinition {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            title: "Pulse".to_string(),
            scale: crate::domain::models::AnswerScale::ONE_TO_FIVE,
            questions: vec![],
            created_at: Utc::now(),
            closed_at: None,
        };
        store.insert(&survey).await.unwrap();

        let first_close = Utc::now();
        assert!(store.close(survey.id, first_close).await.unwrap());
        assert!(store
            .close(survey.id, first_close + Duration::hours(1))
            .await
            .unwrap());

        let stored = store.get(survey.id).await.unwrap().unwrap();
        assert_eq!(stored.closed_at, Some(first_close));

        assert!(!store.close(Uuid::new_v4(), Utc::now()).await.unwrap());
    }
}
