mod config;
pub mod payload;
mod query;
mod rest;

use std::sync::Arc;

use honeymoon_core::{
    Collection, Country, FullItinerary, GatewayError, ItineraryPreview, PaymentIntent,
    QuestionnaireAnswers, QuestionnaireQuestion, Tour, Vibe,
};

pub use config::GatewayConfig;
pub use query::{Order, TableQuery, TourFilter};
pub use rest::RestGateway;

/// Backend operations the planner drives through its phases.
pub trait PlannerGateway: Send + Sync {
    /// `Ok(None)` and `Ok(Some(vec![]))` both mean the matcher found nothing.
    async fn match_itinerary(
        &self,
        answers: &QuestionnaireAnswers,
    ) -> Result<Option<Vec<ItineraryPreview>>, GatewayError>;

    async fn create_payment_intent(&self, itinerary_id: &str)
        -> Result<PaymentIntent, GatewayError>;

    async fn get_unlocked_itinerary(
        &self,
        itinerary_id: &str,
    ) -> Result<Option<FullItinerary>, GatewayError>;
}

/// Read-only browsing surface over the relational tables.
pub trait CatalogGateway: Send + Sync {
    async fn list_countries(&self) -> Result<Vec<Country>, GatewayError>;
    async fn country_by_slug(&self, slug: &str) -> Result<Option<Country>, GatewayError>;
    async fn list_collections(&self) -> Result<Vec<Collection>, GatewayError>;
    async fn list_tours(&self, filter: &TourFilter) -> Result<Vec<Tour>, GatewayError>;
    async fn tour_by_slug(&self, slug: &str) -> Result<Option<Tour>, GatewayError>;
    async fn list_vibes(&self) -> Result<Vec<Vibe>, GatewayError>;
    async fn questionnaire_config(&self) -> Result<Vec<QuestionnaireQuestion>, GatewayError>;
}

impl<T: PlannerGateway> PlannerGateway for Arc<T> {
    async fn match_itinerary(
        &self,
        answers: &QuestionnaireAnswers,
    ) -> Result<Option<Vec<ItineraryPreview>>, GatewayError> {
        self.as_ref().match_itinerary(answers).await
    }

    async fn create_payment_intent(
        &self,
        itinerary_id: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        self.as_ref().create_payment_intent(itinerary_id).await
    }

    async fn get_unlocked_itinerary(
        &self,
        itinerary_id: &str,
    ) -> Result<Option<FullItinerary>, GatewayError> {
        self.as_ref().get_unlocked_itinerary(itinerary_id).await
    }
}
