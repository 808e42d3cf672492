use honeymoon_core::{
    ExportDocument, FullItinerary, ItineraryPreview, PaymentIntent, PlannerPhase,
    QuestionnaireAnswers,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Matching succeeded but returned nothing; the user should adjust answers.
    NoMatches,
    Gateway,
    Payment,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerFailure {
    pub reason: FailureReason,
    pub message: String,
}

impl PlannerFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// The recommendation list a preview was built from, kept alive through
/// payment and unlock so the user can step back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub previews: Vec<ItineraryPreview>,
    pub answers: Option<QuestionnaireAnswers>,
}

impl Recommendations {
    pub fn find(&self, itinerary_id: &str) -> Option<&ItineraryPreview> {
        self.previews
            .iter()
            .find(|preview| preview.id == itinerary_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PlannerState {
    Questionnaire,
    LoadingPreview {
        answers: QuestionnaireAnswers,
    },
    Preview {
        recommendations: Recommendations,
    },
    Payment {
        recommendations: Recommendations,
        itinerary_id: String,
    },
    LoadingFull {
        recommendations: Recommendations,
        itinerary_id: String,
        payment: Option<PaymentIntent>,
    },
    FullItinerary {
        recommendations: Recommendations,
        itinerary: FullItinerary,
    },
    Export {
        itinerary: FullItinerary,
        document: ExportDocument,
    },
    Error {
        failure: PlannerFailure,
    },
}

impl PlannerState {
    pub fn phase(&self) -> PlannerPhase {
        match self {
            Self::Questionnaire => PlannerPhase::Questionnaire,
            Self::LoadingPreview { .. } => PlannerPhase::LoadingPreview,
            Self::Preview { .. } => PlannerPhase::Preview,
            Self::Payment { .. } => PlannerPhase::Payment,
            Self::LoadingFull { .. } => PlannerPhase::LoadingFull,
            Self::FullItinerary { .. } => PlannerPhase::FullItinerary,
            Self::Export { .. } => PlannerPhase::Export,
            Self::Error { .. } => PlannerPhase::Error,
        }
    }

    pub fn recommendations(&self) -> Option<&Recommendations> {
        match self {
            Self::Preview { recommendations }
            | Self::Payment {
                recommendations, ..
            }
            | Self::LoadingFull {
                recommendations, ..
            }
            | Self::FullItinerary {
                recommendations, ..
            } => Some(recommendations),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&PlannerFailure> {
        match self {
            Self::Error { failure } => Some(failure),
            _ => None,
        }
    }
}
