use crate::domain::models::{SurveyDefinition, SurveyResponse};
use crate::store::{ResponseStore, SurveyStore};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("unknown survey")]
    UnknownSurvey,
    #[error("survey is closed")]
    SurveyClosed,
    #[error("a response already exists for this respondent")]
    DuplicateSubmission,
    #[error("invalid answer: {0}")]
    InvalidAnswer(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Validates and durably appends one survey response.
///
/// The duplicate guard lives in the response store, atomic with the write;
/// this service only decides whether the submission is admissible at all.
#[derive(Clone)]
pub struct IngestService {
    surveys: Arc<dyn SurveyStore>,
    responses: Arc<dyn ResponseStore>,
}

impl IngestService {
    pub fn new(surveys: Arc<dyn SurveyStore>, responses: Arc<dyn ResponseStore>) -> Self {
        Self { surveys, responses }
    }

    /// `company_id` is the submitting session's company; a survey owned by
    /// another company is reported as unknown rather than forbidden, so the
    /// endpoint does not confirm foreign survey ids exist.
    pub async fn submit(
        &self,
        company_id: Uuid,
        survey_id: Uuid,
        respondent_id: &str,
        answers: BTreeMap<Uuid, i32>,
    ) -> Result<SurveyResponse, SubmitError> {
        let survey = self
            .surveys
            .get(survey_id)
            .await?
            .filter(|s| s.company_id == company_id)
            .ok_or(SubmitError::UnknownSurvey)?;

        if !survey.is_open() {
            return Err(SubmitError::SurveyClosed);
        }

        validate_answers(&survey, &answers)?;

        let response = SurveyResponse {
            id: Uuid::new_v4(),
            survey_id,
            respondent_id: respondent_id.to_string(),
            answers,
            submitted_at: Utc::now(),
        };

        if !self.responses.insert_if_absent(&response).await? {
            return Err(SubmitError::DuplicateSubmission);
        }

        tracing::info!(survey_id = %survey_id, response_id = %response.id, "response accepted");
        Ok(response)
    }
}

fn validate_answers(
    survey: &SurveyDefinition,
    answers: &BTreeMap<Uuid, i32>,
) -> Result<(), SubmitError> {
    for question in &survey.questions {
        if !answers.contains_key(&question.id) {
            return Err(SubmitError::InvalidAnswer(format!(
                "missing answer for question {}",
                question.id
            )));
        }
    }

    for (question_id, value) in answers {
        if survey.question(*question_id).is_none() {
            return Err(SubmitError::InvalidAnswer(format!(
                "unknown question {question_id}"
            )));
        }
        if !survey.scale.contains(*value) {
            return Err(SubmitError::InvalidAnswer(format!(
                "value {value} outside scale {}..={}",
                survey.scale.min, survey.scale.max
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AnswerScale, Direction, Question};
    use crate::store::memory::{MemoryResponseStore, MemorySurveyStore};

    struct Fixture {
        ingest: IngestService,
        responses: Arc<MemoryResponseStore>,
        company_id: Uuid,
        survey: SurveyDefinition,
    }

    async fn fixture() -> Fixture {
        let surveys = Arc::new(MemorySurveyStore::new());
        let responses = Arc::new(MemoryResponseStore::new());
        let company_id = Uuid::new_v4();

        let survey = SurveyDefinition {
            id: Uuid::new_v4(),
            company_id,
            title: "Onboarding pulse".to_string(),
            scale: AnswerScale::ONE_TO_FIVE,
            questions: vec![
                Question {
                    id: Uuid::new_v4(),
                    prompt: "I can rely on my teammates".to_string(),
                    metric: "collaboration".to_string(),
                    direction: Direction::Forward,
                },
                Question {
                    id: Uuid::new_v4(),
                    prompt: "Deadlines feel unmanageable".to_string(),
                    metric: "pressure".to_string(),
                    direction: Direction::Reversed,
                },
            ],
            created_at: Utc::now(),
            closed_at: None,
        };
        surveys.insert(&survey).await.unwrap();

        let ingest = IngestService::new(surveys, responses.clone());
        Fixture {
            ingest,
            responses,
            company_id,
            survey,
        }
    }

    fn full_answers(survey: &SurveyDefinition, value: i32) -> BTreeMap<Uuid, i32> {
        survey.questions.iter().map(|q| (q.id, value)).collect()
    }

    #[tokio::test]
    async fn accepts_a_complete_in_scale_submission() {
        let fx = fixture().await;
        let answers = full_answers(&fx.survey, 4);

        let response = fx
            .ingest
            .submit(fx.company_id, fx.survey.id, "resp-1", answers)
            .await
            .unwrap();

        assert_eq!(response.survey_id, fx.survey.id);
        let stored = fx
            .responses
            .list_for_surveys(&[fx.survey.id])
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn rejects_unknown_survey() {
        let fx = fixture().await;
        let err = fx
            .ingest
            .submit(fx.company_id, Uuid::new_v4(), "resp-1", BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::UnknownSurvey));
    }

    #[tokio::test]
    async fn foreign_company_survey_reads_as_unknown() {
        let fx = fixture().await;
        let answers = full_answers(&fx.survey, 3);
        let err = fx
            .ingest
            .submit(Uuid::new_v4(), fx.survey.id, "resp-1", answers)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::UnknownSurvey));
    }

    #[tokio::test]
    async fn rejects_out_of_scale_value() {
        let fx = fixture().await;
        let mut answers = full_answers(&fx.survey, 3);
        let first = fx.survey.questions[0].id;
        answers.insert(first, 6);

        let err = fx
            .ingest
            .submit(fx.company_id, fx.survey.id, "resp-1", answers)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidAnswer(_)));
    }

    #[tokio::test]
    async fn rejects_missing_required_question() {
        let fx = fixture().await;
        let mut answers = full_answers(&fx.survey, 3);
        answers.remove(&fx.survey.questions[1].id);

        let err = fx
            .ingest
            .submit(fx.company_id, fx.survey.id, "resp-1", answers)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidAnswer(_)));
    }

    #[tokio::test]
    async fn rejects_unknown_question_id() {
        let fx = fixture().await;
        let mut answers = full_answers(&fx.survey, 3);
        answers.insert(Uuid::new_v4(), 3);

        let err = fx
            .ingest
            .submit(fx.company_id, fx.survey.id, "resp-1", answers)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidAnswer(_)));
    }

    #[tokio::test]
    async fn second_submission_is_a_duplicate_and_not_stored() {
        let fx = fixture().await;

        fx.ingest
            .submit(
                fx.company_id,
                fx.survey.id,
                "resp-1",
                full_answers(&fx.survey, 2),
            )
            .await
            .unwrap();
        let err = fx
            .ingest
            .submit(
                fx.company_id,
                fx.survey.id,
                "resp-1",
                full_answers(&fx.survey, 5),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitError::DuplicateSubmission));
        let stored = fx
            .responses
            .list_for_surveys(&[fx.survey.id])
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        // The original submission survives, not the retry.
        assert_eq!(stored[0].answers[&fx.survey.questions[0].id], 2);
    }

    #[tokio::test]
    async fn closed_survey_rejects_new_responses() {
        let fx = fixture().await;
        let surveys = Arc::new(MemorySurveyStore::new());
        let mut closed = fx.survey.clone();
        closed.closed_at = Some(Utc::now());
        surveys.insert(&closed).await.unwrap();
        let ingest = IngestService::new(surveys, Arc::new(MemoryResponseStore::new()));

        let err = ingest
            .submit(
                fx.company_id,
                closed.id,
                "resp-1",
                full_answers(&closed, 3),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::SurveyClosed));
    }
}
