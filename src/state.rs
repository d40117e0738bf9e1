use crate::middleware::SubmitThrottle;
use crate::pseudonym::Pseudonymizer;
use crate::services::aggregator::Aggregator;
use crate::services::ingest::IngestService;
use crate::store::{ProfileStore, SurveyStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub surveys: Arc<dyn SurveyStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub ingest: IngestService,
    pub aggregator: Aggregator,
    pub pseudonyms: Pseudonymizer,
    pub session_key: Vec<u8>,
    /// Synchronous triggering policy: recompute the company profile right
    /// after each accepted submission.
    pub recompute_on_submit: bool,
    pub submit_throttle: SubmitThrottle,
}

pub type SharedState = Arc<AppState>;
