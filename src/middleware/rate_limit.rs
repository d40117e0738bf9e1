//! In-memory sliding-window throttle for survey submission, keyed by the
//! authenticated principal rather than by IP. Multi-instance deployments
//! would need a shared store; the duplicate-submission guard in the response
//! store is the real correctness backstop either way.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone)]
pub struct SubmitThrottle {
    windows: Arc<RwLock<HashMap<Uuid, VecDeque<Instant>>>>,
    max_per_window: usize,
    window: Duration,
}

impl SubmitThrottle {
    pub fn new(max_per_window: usize, window_secs: u64) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            max_per_window,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Records an attempt for this user and reports whether it is allowed.
    pub async fn allow(&self, user_id: Uuid) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let history = windows.entry(user_id).or_default();

        while let Some(&front) = history.front() {
            if now.duration_since(front) >= self.window {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() >= self.max_per_window {
            return false;
        }
        history.push_back(now);
        true
    }

    /// Drops users whose whole window has expired. Run from the scheduler.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        windows.retain(|_, history| {
            history
                .back()
                .map(|&last| now.duration_since(last) < self.window)
                .unwrap_or(false)
        });
        tracing::debug!("submit throttle cleanup: {} active users", windows.len());
    }
}
