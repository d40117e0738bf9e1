use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Whether a high raw answer raises or lowers the metric it feeds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reversed,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reversed => "reversed",
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "reversed" | "reverse" => Ok(Direction::Reversed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Employee => "EMPLOYEE",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "EMPLOYEE" => Ok(Role::Employee),
            _ => Err(()),
        }
    }
}

/// Inclusive answer range for every question of a survey (e.g. 1..=5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerScale {
    pub min: i32,
    pub max: i32,
}

impl AnswerScale {
    pub const ONE_TO_FIVE: AnswerScale = AnswerScale { min: 1, max: 5 };

    pub fn is_valid(&self) -> bool {
        self.min < self.max
    }

    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn span(&self) -> i32 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub prompt: String,
    pub metric: String,
    pub direction: Direction,
}

/// Immutable once created. Closing only stamps `closed_at`; questions and
/// scale never change, or historical responses would stop being comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDefinition {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub scale: AnswerScale,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl SurveyDefinition {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn question(&self, id: Uuid) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// One respondent's full submission. Append-only; at most one per
/// `(survey_id, respondent_id)`. Answers are keyed by question id in a
/// BTreeMap so iteration and serialization order are stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub respondent_id: String,
    pub answers: BTreeMap<Uuid, i32>,
    pub submitted_at: DateTime<Utc>,
}

/// Derived per-company metric vector. Recomputed wholesale on every
/// aggregation run and replaced in full, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CultureProfile {
    pub company_id: Uuid,
    pub metrics: BTreeMap<String, f64>,
    pub sample_size: i64,
    pub computed_at: DateTime<Utc>,
}

impl CultureProfile {
    pub fn empty(company_id: Uuid, computed_at: DateTime<Utc>) -> Self {
        Self {
            company_id,
            metrics: BTreeMap::new(),
            sample_size: 0,
            computed_at,
        }
    }
}
