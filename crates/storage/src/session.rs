use std::sync::Arc;

use chrono::Duration;
use honeymoon_core::{
    Clock, ItineraryPreview, PlannerSessionData, QuestionnaireAnswers, SystemClock,
};
use tracing::{debug, warn};

use crate::KeyValueStorage;

pub const SESSION_KEY: &str = "ai_planner_session";
pub const SESSION_TTL_MILLIS: i64 = 86_400_000;

pub fn session_ttl() -> Duration {
    Duration::milliseconds(SESSION_TTL_MILLIS)
}

/// Best-effort persistence of the latest recommendation set.
///
/// No operation surfaces an error: storage failures are logged and the
/// caller sees "no saved session".
#[derive(Clone)]
pub struct SessionStore<B> {
    backend: B,
    clock: Arc<dyn Clock>,
}

impl<B> SessionStore<B>
where
    B: KeyValueStorage,
{
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: B, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn save(
        &self,
        previews: &[ItineraryPreview],
        answers: Option<&QuestionnaireAnswers>,
    ) {
        let session = PlannerSessionData {
            recommended_tours: previews.to_vec(),
            timestamp: self.clock.now(),
            questionnaire_answers: answers.cloned(),
        };

        let encoded = match serde_json::to_string(&session) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(error = %error, "failed to encode planner session");
                return;
            }
        };

        match self.backend.set_item(SESSION_KEY, &encoded).await {
            Ok(()) => debug!(tours = previews.len(), "planner session saved"),
            Err(error) => warn!(error = %error, "failed to save planner session"),
        }
    }

    pub async fn load(&self) -> Option<PlannerSessionData> {
        let raw = match self.backend.get_item(SESSION_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                warn!(error = %error, "failed to read planner session");
                return None;
            }
        };

        let session = match serde_json::from_str::<PlannerSessionData>(&raw) {
            Ok(session) => session,
            Err(error) => {
                warn!(error = %error, "discarding corrupted planner session");
                self.clear().await;
                return None;
            }
        };

        let age = self.clock.now() - session.timestamp;
        if age >= session_ttl() {
            debug!(age_minutes = age.num_minutes(), "planner session expired");
            self.clear().await;
            return None;
        }

        if session.recommended_tours.is_empty() {
            debug!("discarding planner session without recommendations");
            self.clear().await;
            return None;
        }

        Some(session)
    }

    pub async fn clear(&self) {
        if let Err(error) = self.backend.remove_item(SESSION_KEY).await {
            warn!(error = %error, "failed to clear planner session");
        }
    }

    pub async fn has_valid(&self) -> bool {
        self.load()
            .await
            .is_some_and(|session| !session.recommended_tours.is_empty())
    }
}
