use honeymoon_core::{AnswersError, PlannerPhase};
use thiserror::Error;

/// Errors returned directly to the caller of a planner action.
///
/// Backend failures are not in here: those move the planner into the
/// `error` phase instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerError {
    #[error("invalid answers: {0}")]
    InvalidAnswers(#[from] AnswersError),
    #[error("cannot {action} during the {phase} phase")]
    InvalidTransition {
        action: &'static str,
        phase: PlannerPhase,
    },
    #[error("itinerary {0} is not among the current recommendations")]
    UnknownItinerary(String),
    #[error("export failed: {0}")]
    Export(String),
}
