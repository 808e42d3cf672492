use std::sync::Arc;

use honeymoon_core::{ExportDocument, GatewayError, PlannerPhase, QuestionnaireAnswers};
use honeymoon_gateway::PlannerGateway;
use honeymoon_observability::PlannerMetrics;
use honeymoon_storage::{KeyValueStorage, SessionStore};
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

use crate::config::{PaymentMode, PlannerConfig};
use crate::error::PlannerError;
use crate::export::ItineraryRenderer;
use crate::state::{FailureReason, PlannerFailure, PlannerState, Recommendations};

const NO_MATCHES_MESSAGE: &str =
    "No itineraries matched your answers. Try different vibes, regions or budget.";

/// Result of an action that waited on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The planner moved to this phase.
    Applied(PlannerPhase),
    /// A newer action replaced this one while it was in flight; its result
    /// was dropped.
    Superseded,
}

struct Inner {
    state: PlannerState,
    generation: u64,
}

/// Drives one planning session through its phases.
///
/// Every action that waits on the gateway captures a generation number when
/// it starts. When the gateway answers, the result is applied only if no
/// other action has started since.
pub struct Planner<G, B> {
    gateway: G,
    sessions: SessionStore<B>,
    config: PlannerConfig,
    metrics: Arc<PlannerMetrics>,
    inner: Mutex<Inner>,
    // Held across the generation check and the storage write.
    save_lock: AsyncMutex<()>,
}

impl<G, B> Planner<G, B>
where
    G: PlannerGateway,
    B: KeyValueStorage,
{
    pub fn new(
        gateway: G,
        sessions: SessionStore<B>,
        config: PlannerConfig,
        metrics: Arc<PlannerMetrics>,
    ) -> Self {
        Self {
            gateway,
            sessions,
            config,
            metrics,
            inner: Mutex::new(Inner {
                state: PlannerState::Questionnaire,
                generation: 0,
            }),
            save_lock: AsyncMutex::new(()),
        }
    }

    pub fn state(&self) -> PlannerState {
        self.inner.lock().state.clone()
    }

    pub fn phase(&self) -> PlannerPhase {
        self.inner.lock().state.phase()
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// True while a backend request for the current phase is outstanding.
    /// Controls that trigger a new request should be disabled.
    pub fn is_loading(&self) -> bool {
        self.phase().is_loading()
    }

    pub fn sessions(&self) -> &SessionStore<B> {
        &self.sessions
    }

    pub fn metrics(&self) -> &Arc<PlannerMetrics> {
        &self.metrics
    }

    #[instrument(skip(self, answers))]
    pub async fn submit(&self, answers: QuestionnaireAnswers) -> Result<Transition, PlannerError> {
        let answers = answers.validated()?;

        let ticket = {
            let mut inner = self.inner.lock();
            let phase = inner.state.phase();
            if !matches!(
                phase,
                PlannerPhase::Questionnaire | PlannerPhase::LoadingPreview
            ) {
                return Err(PlannerError::InvalidTransition {
                    action: "submit answers",
                    phase,
                });
            }
            inner.generation += 1;
            inner.state = PlannerState::LoadingPreview {
                answers: answers.clone(),
            };
            inner.generation
        };

        self.metrics.inc_submission();
        info!(generation = ticket, duration = answers.duration, "requesting itinerary matches");

        let result = self.gateway.match_itinerary(&answers).await;

        let previews = {
            let mut inner = self.inner.lock();
            if inner.generation != ticket {
                drop(inner);
                return Ok(self.discard(ticket, "match"));
            }

            match result {
                Ok(Some(previews)) if !previews.is_empty() => {
                    inner.state = PlannerState::Preview {
                        recommendations: Recommendations {
                            previews: previews.clone(),
                            answers: Some(answers.clone()),
                        },
                    };
                    previews
                }
                Ok(_) => {
                    inner.state = failed(FailureReason::NoMatches, NO_MATCHES_MESSAGE);
                    drop(inner);
                    self.metrics.inc_no_match();
                    info!(generation = ticket, "matching returned no itineraries");
                    return Ok(Transition::Applied(PlannerPhase::Error));
                }
                Err(error) => {
                    inner.state = failed(FailureReason::Gateway, error.to_string());
                    drop(inner);
                    self.record_gateway_failure(ticket, "match", &error);
                    return Ok(Transition::Applied(PlannerPhase::Error));
                }
            }
        };

        self.metrics.inc_match();
        info!(generation = ticket, matches = previews.len(), "itinerary matches ready");

        let _save = self.save_lock.lock().await;
        if self.generation() == ticket {
            self.sessions.save(&previews, Some(&answers)).await;
        } else {
            debug!(generation = ticket, "skipping session save for superseded matches");
        }

        Ok(Transition::Applied(PlannerPhase::Preview))
    }

    /// Restores the last saved recommendation set, if one is still valid.
    /// Returns whether the planner moved to the preview phase.
    #[instrument(skip(self))]
    pub async fn resume_session(&self) -> Result<bool, PlannerError> {
        let ticket = self.expect_phase("resume a saved session", &[PlannerPhase::Questionnaire])?;

        let Some(session) = self.sessions.load().await else {
            return Ok(false);
        };

        let mut inner = self.inner.lock();
        if inner.generation != ticket || inner.state.phase() != PlannerPhase::Questionnaire {
            return Ok(false);
        }

        info!(tours = session.recommended_tours.len(), "resumed saved planner session");
        inner.state = PlannerState::Preview {
            recommendations: Recommendations {
                previews: session.recommended_tours,
                answers: session.questionnaire_answers,
            },
        };
        Ok(true)
    }

    /// Picks one of the previews. With simulated payment this unlocks the
    /// full itinerary immediately; otherwise it stops at the payment phase.
    #[instrument(skip(self))]
    pub async fn select(&self, itinerary_id: &str) -> Result<Transition, PlannerError> {
        let (ticket, recommendations) = {
            let mut inner = self.inner.lock();
            let phase = inner.state.phase();
            let PlannerState::Preview { recommendations } = &inner.state else {
                return Err(PlannerError::InvalidTransition {
                    action: "select an itinerary",
                    phase,
                });
            };
            if recommendations.find(itinerary_id).is_none() {
                return Err(PlannerError::UnknownItinerary(itinerary_id.to_string()));
            }
            let recommendations = recommendations.clone();

            inner.generation += 1;
            match self.config.payment_mode {
                PaymentMode::Required => {
                    inner.state = PlannerState::Payment {
                        recommendations,
                        itinerary_id: itinerary_id.to_string(),
                    };
                    info!(itinerary_id, "itinerary selected, awaiting payment");
                    return Ok(Transition::Applied(PlannerPhase::Payment));
                }
                PaymentMode::Simulated => {
                    inner.state = PlannerState::LoadingFull {
                        recommendations: recommendations.clone(),
                        itinerary_id: itinerary_id.to_string(),
                        payment: None,
                    };
                }
            }
            (inner.generation, recommendations)
        };

        Ok(self.unlock(ticket, itinerary_id, recommendations).await)
    }

    /// Requests a payment handle for the selected itinerary and, once it is
    /// granted, unlocks the full itinerary.
    #[instrument(skip(self))]
    pub async fn pay(&self) -> Result<Transition, PlannerError> {
        let (ticket, itinerary_id, recommendations) = {
            let mut inner = self.inner.lock();
            let phase = inner.state.phase();
            let PlannerState::Payment {
                recommendations,
                itinerary_id,
            } = &inner.state
            else {
                return Err(PlannerError::InvalidTransition {
                    action: "pay",
                    phase,
                });
            };
            let captured = (itinerary_id.clone(), recommendations.clone());
            inner.generation += 1;
            (inner.generation, captured.0, captured.1)
        };

        let result = self.gateway.create_payment_intent(&itinerary_id).await;

        {
            let mut inner = self.inner.lock();
            if inner.generation != ticket {
                drop(inner);
                return Ok(self.discard(ticket, "payment"));
            }

            match result {
                Ok(payment) => {
                    inner.state = PlannerState::LoadingFull {
                        recommendations: recommendations.clone(),
                        itinerary_id: itinerary_id.clone(),
                        payment: Some(payment),
                    };
                }
                Err(error) => {
                    inner.state = failed(FailureReason::Payment, error.to_string());
                    drop(inner);
                    self.record_gateway_failure(ticket, "payment", &error);
                    return Ok(Transition::Applied(PlannerPhase::Error));
                }
            }
        }

        info!(itinerary_id = %itinerary_id, "payment handle granted");
        Ok(self.unlock(ticket, &itinerary_id, recommendations).await)
    }

    /// Returns to the preview list from payment or a full itinerary.
    pub fn back_to_recommendations(&self) -> Result<(), PlannerError> {
        let mut inner = self.inner.lock();
        let recommendations = match &inner.state {
            PlannerState::Payment {
                recommendations, ..
            }
            | PlannerState::FullItinerary {
                recommendations, ..
            } => recommendations.clone(),
            other => {
                return Err(PlannerError::InvalidTransition {
                    action: "return to recommendations",
                    phase: other.phase(),
                })
            }
        };

        inner.generation += 1;
        inner.state = PlannerState::Preview { recommendations };
        Ok(())
    }

    pub fn export(&self, renderer: &dyn ItineraryRenderer) -> Result<ExportDocument, PlannerError> {
        let mut inner = self.inner.lock();
        let phase = inner.state.phase();
        let PlannerState::FullItinerary { itinerary, .. } = &inner.state else {
            return Err(PlannerError::InvalidTransition {
                action: "export",
                phase,
            });
        };

        let document = renderer
            .render(itinerary)
            .map_err(|error| PlannerError::Export(format!("{error:#}")))?;
        let itinerary = itinerary.clone();

        inner.generation += 1;
        inner.state = PlannerState::Export {
            itinerary,
            document: document.clone(),
        };
        drop(inner);

        self.metrics.inc_export();
        info!(file_name = %document.file_name, "itinerary exported");
        Ok(document)
    }

    /// Back to an empty questionnaire. Anything in flight becomes stale. The
    /// saved session is kept.
    pub fn restart(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state = PlannerState::Questionnaire;
        debug!(generation = inner.generation, "planner restarted");
    }

    async fn unlock(
        &self,
        ticket: u64,
        itinerary_id: &str,
        recommendations: Recommendations,
    ) -> Transition {
        let result = self.gateway.get_unlocked_itinerary(itinerary_id).await;

        let mut inner = self.inner.lock();
        if inner.generation != ticket {
            drop(inner);
            return self.discard(ticket, "unlock");
        }

        match result {
            Ok(Some(itinerary)) if itinerary.preview.id != itinerary_id => {
                let error = GatewayError::invalid(
                    "itinerary",
                    format!(
                        "requested {itinerary_id} but received {}",
                        itinerary.preview.id
                    ),
                );
                inner.state = failed(FailureReason::Gateway, error.to_string());
                drop(inner);
                self.record_gateway_failure(ticket, "unlock", &error);
                Transition::Applied(PlannerPhase::Error)
            }
            Ok(Some(itinerary)) => {
                inner.state = PlannerState::FullItinerary {
                    recommendations,
                    itinerary,
                };
                drop(inner);
                self.metrics.inc_unlock();
                info!(itinerary_id, "full itinerary unlocked");
                Transition::Applied(PlannerPhase::FullItinerary)
            }
            Ok(None) => {
                inner.state = failed(
                    FailureReason::NotFound,
                    format!("Itinerary {itinerary_id} could not be found."),
                );
                drop(inner);
                warn!(itinerary_id, "unlocked itinerary not found");
                Transition::Applied(PlannerPhase::Error)
            }
            Err(error) => {
                inner.state = failed(FailureReason::Gateway, error.to_string());
                drop(inner);
                self.record_gateway_failure(ticket, "unlock", &error);
                Transition::Applied(PlannerPhase::Error)
            }
        }
    }

    fn expect_phase(
        &self,
        action: &'static str,
        allowed: &[PlannerPhase],
    ) -> Result<u64, PlannerError> {
        let inner = self.inner.lock();
        let phase = inner.state.phase();
        if allowed.contains(&phase) {
            Ok(inner.generation)
        } else {
            Err(PlannerError::InvalidTransition { action, phase })
        }
    }

    fn discard(&self, ticket: u64, request: &'static str) -> Transition {
        self.metrics.inc_stale_discarded();
        debug!(generation = ticket, request, "discarding superseded response");
        Transition::Superseded
    }

    fn record_gateway_failure(&self, ticket: u64, request: &'static str, error: &GatewayError) {
        self.metrics.inc_gateway_failure();
        warn!(generation = ticket, request, error = %error, "backend request failed");
    }
}

fn failed(reason: FailureReason, message: impl Into<String>) -> PlannerState {
    PlannerState::Error {
        failure: PlannerFailure::new(reason, message),
    }
}
