use crate::domain::models::{
    AnswerScale, CultureProfile, Direction, SurveyDefinition, SurveyResponse,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Normalize one raw answer onto [0, 100].
///
/// Forward questions map `scale.min -> 0` and `scale.max -> 100`; reversed
/// questions invert so a low raw answer scores high.
pub fn normalize(value: i32, scale: AnswerScale, direction: Direction) -> f64 {
    let span = scale.span() as f64;
    match direction {
        Direction::Forward => (value - scale.min) as f64 / span * 100.0,
        Direction::Reversed => (scale.max - value) as f64 / span * 100.0,
    }
}

/// Recompute a company profile from the full response set.
///
/// Deterministic and re-derivable: the same surveys and responses (in the
/// same stored order) produce an identical profile, which is what lets
/// `recompute` run after every submit, on a timer, or on demand
/// interchangeably. Metrics with zero contributing answers are omitted
/// rather than defaulted to zero. No responses at all is a valid state and
/// yields `sample_size = 0` with an empty metric map.
pub fn aggregate(
    company_id: Uuid,
    surveys: &[SurveyDefinition],
    responses: &[SurveyResponse],
    computed_at: DateTime<Utc>,
) -> CultureProfile {
    let by_id: HashMap<Uuid, &SurveyDefinition> = surveys.iter().map(|s| (s.id, s)).collect();

    let mut sums: BTreeMap<String, (f64, u64)> = BTreeMap::new();
    let mut sample_size = 0i64;

    for response in responses {
        let Some(survey) = by_id.get(&response.survey_id) else {
            // Response to a survey another company owns, or one deleted
            // administratively. Skip rather than poison the profile.
            continue;
        };
        sample_size += 1;

        for (question_id, value) in &response.answers {
            let Some(question) = survey.question(*question_id) else {
                continue;
            };
            let normalized = normalize(*value, survey.scale, question.direction);
            let entry = sums.entry(question.metric.clone()).or_insert((0.0, 0));
            entry.0 += normalized;
            entry.1 += 1;
        }
    }

    let metrics = sums
        .into_iter()
        .map(|(metric, (sum, count))| (metric, sum / count as f64))
        .collect();

    CultureProfile {
        company_id,
        metrics,
        sample_size,
        computed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Question;

    fn survey(company_id: Uuid, questions: Vec<Question>) -> SurveyDefinition {
        SurveyDefinition {
            id: Uuid::new_v4(),
            company_id,
            title: "Quarterly pulse".to_string(),
            scale: AnswerScale::ONE_TO_FIVE,
            questions,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    fn question(metric: &str, direction: Direction) -> Question {
        Question {
            id: Uuid::new_v4(),
            prompt: format!("How would you rate {metric}?"),
            metric: metric.to_string(),
            direction,
        }
    }

    fn response(survey_id: Uuid, answers: Vec<(Uuid, i32)>) -> SurveyResponse {
        SurveyResponse {
            id: Uuid::new_v4(),
            survey_id,
            respondent_id: format!("r-{}", Uuid::new_v4()),
            answers: answers.into_iter().collect(),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn forward_normalization_maps_scale_endpoints() {
        let scale = AnswerScale::ONE_TO_FIVE;
        assert_eq!(normalize(1, scale, Direction::Forward), 0.0);
        assert_eq!(normalize(3, scale, Direction::Forward), 50.0);
        assert_eq!(normalize(5, scale, Direction::Forward), 100.0);
    }

    #[test]
    fn reversed_normalization_inverts_endpoints() {
        let scale = AnswerScale::ONE_TO_FIVE;
        assert_eq!(normalize(1, scale, Direction::Reversed), 100.0);
        assert_eq!(normalize(5, scale, Direction::Reversed), 0.0);
    }

    #[test]
    fn single_metric_mean_over_three_responses() {
        let company = Uuid::new_v4();
        let q = question("collaboration", Direction::Forward);
        let qid = q.id;
        let s = survey(company, vec![q]);

        let responses: Vec<SurveyResponse> = [1, 3, 5]
            .into_iter()
            .map(|v| response(s.id, vec![(qid, v)]))
            .collect();

        let profile = aggregate(company, &[s], &responses, Utc::now());
        assert_eq!(profile.sample_size, 3);
        assert_eq!(profile.metrics.get("collaboration"), Some(&50.0));
    }

    #[test]
    fn empty_response_set_yields_empty_profile() {
        let company = Uuid::new_v4();
        let s = survey(company, vec![question("collaboration", Direction::Forward)]);

        let profile = aggregate(company, &[s], &[], Utc::now());
        assert_eq!(profile.sample_size, 0);
        assert!(profile.metrics.is_empty());
    }

    #[test]
    fn unanswered_metric_is_omitted_not_zeroed() {
        let company = Uuid::new_v4();
        let answered = question("collaboration", Direction::Forward);
        let answered_id = answered.id;
        let unanswered = question("innovation", Direction::Forward);
        let s = survey(company, vec![answered, unanswered]);

        let r = response(s.id, vec![(answered_id, 4)]);
        let profile = aggregate(company, &[s], &[r], Utc::now());

        assert!(profile.metrics.contains_key("collaboration"));
        assert!(!profile.metrics.contains_key("innovation"));
    }

    #[test]
    fn aggregation_spans_all_company_surveys() {
        let company = Uuid::new_v4();
        let q1 = question("collaboration", Direction::Forward);
        let q1_id = q1.id;
        let s1 = survey(company, vec![q1]);
        let q2 = question("collaboration", Direction::Forward);
        let q2_id = q2.id;
        let s2 = survey(company, vec![q2]);

        // 0 from the first survey, 100 from the second.
        let responses = vec![
            response(s1.id, vec![(q1_id, 1)]),
            response(s2.id, vec![(q2_id, 5)]),
        ];

        let profile = aggregate(company, &[s1, s2], &responses, Utc::now());
        assert_eq!(profile.sample_size, 2);
        assert_eq!(profile.metrics.get("collaboration"), Some(&50.0));
    }

    #[test]
    fn recompute_is_idempotent_on_fixed_input() {
        let company = Uuid::new_v4();
        let q_fwd = question("collaboration", Direction::Forward);
        let q_fwd_id = q_fwd.id;
        let q_rev = question("pressure", Direction::Reversed);
        let q_rev_id = q_rev.id;
        let s = survey(company, vec![q_fwd, q_rev]);

        let responses = vec![
            response(s.id, vec![(q_fwd_id, 2), (q_rev_id, 4)]),
            response(s.id, vec![(q_fwd_id, 5), (q_rev_id, 1)]),
            response(s.id, vec![(q_fwd_id, 3), (q_rev_id, 3)]),
        ];

        let at = Utc::now();
        let first = aggregate(company, std::slice::from_ref(&s), &responses, at);
        let second = aggregate(company, std::slice::from_ref(&s), &responses, at);

        assert_eq!(first.sample_size, second.sample_size);
        assert_eq!(first.metrics, second.metrics);
    }

    #[test]
    fn all_scores_stay_in_range() {
        let company = Uuid::new_v4();
        let q_fwd = question("collaboration", Direction::Forward);
        let q_fwd_id = q_fwd.id;
        let q_rev = question("pressure", Direction::Reversed);
        let q_rev_id = q_rev.id;
        let s = survey(company, vec![q_fwd, q_rev]);

        let mut responses = Vec::new();
        for fwd in 1..=5 {
            for rev in 1..=5 {
                responses.push(response(s.id, vec![(q_fwd_id, fwd), (q_rev_id, rev)]));
            }
        }

        let profile = aggregate(company, &[s], &responses, Utc::now());
        for (metric, score) in &profile.metrics {
            assert!(
                (0.0..=100.0).contains(score),
                "{metric} out of range: {score}"
            );
        }
    }

    #[test]
    fn answers_to_unknown_questions_are_skipped() {
        let company = Uuid::new_v4();
        let q = question("collaboration", Direction::Forward);
        let qid = q.id;
        let s = survey(company, vec![q]);

        let r = response(s.id, vec![(qid, 5), (Uuid::new_v4(), 1)]);
        let profile = aggregate(company, &[s], &[r], Utc::now());

        assert_eq!(profile.metrics.get("collaboration"), Some(&100.0));
    }
}
