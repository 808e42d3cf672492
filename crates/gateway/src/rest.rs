use honeymoon_core::{
    Collection, Country, FullItinerary, GatewayError, ItineraryPreview, PaymentIntent,
    QuestionnaireAnswers, QuestionnaireQuestion, Tour, Vibe,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::payload::{
    parse_match_response, parse_payment_intent, parse_rows, parse_unlocked_itinerary,
};
use crate::query::{Order, TableQuery, TourFilter};
use crate::{CatalogGateway, GatewayConfig, PlannerGateway};

#[derive(Clone)]
pub struct RestGateway {
    client: Client,
    config: GatewayConfig,
}

impl RestGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|error| GatewayError::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[instrument(skip(self, query), fields(table = query.table()))]
    pub async fn fetch_rows<T: DeserializeOwned>(
        &self,
        entity: &'static str,
        query: &TableQuery,
    ) -> Result<Vec<T>, GatewayError> {
        let mut url = self.config.rest_url(query.table())?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());

        let body = self.send(self.client.get(url)).await?;
        parse_rows(entity, body)
    }

    #[instrument(skip(self, body))]
    pub async fn invoke_function(&self, name: &str, body: &Value) -> Result<Value, GatewayError> {
        let url = self.config.function_url(name)?;
        let value = self.send(self.client.post(url).json(body)).await?;

        if let Some(message) = value.get("error").and_then(error_message) {
            warn!(function = %name, error = %message, "backend function reported an error");
            return Err(GatewayError::Function {
                function: name.to_string(),
                message,
            });
        }

        Ok(value)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, GatewayError> {
        let response = request
            .header("apikey", self.config.api_key.as_str())
            .bearer_auth(self.config.api_key.as_str())
            .send()
            .await
            .map_err(|error| GatewayError::transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| GatewayError::transport(error.to_string()))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::Unauthorized {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), bytes = body.len(), "backend responded");

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|error| GatewayError::invalid("response", error.to_string()))
    }

    async fn first_row<T: DeserializeOwned>(
        &self,
        entity: &'static str,
        query: TableQuery,
    ) -> Result<Option<T>, GatewayError> {
        let rows = self.fetch_rows(entity, &query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(object) => object
            .get("message")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}

impl PlannerGateway for RestGateway {
    async fn match_itinerary(
        &self,
        answers: &QuestionnaireAnswers,
    ) -> Result<Option<Vec<ItineraryPreview>>, GatewayError> {
        let body = serde_json::to_value(answers)
            .map_err(|error| GatewayError::invalid("answers", error.to_string()))?;
        let response = self
            .invoke_function(&self.config.match_function, &body)
            .await?;
        parse_match_response(response)
    }

    async fn create_payment_intent(
        &self,
        itinerary_id: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let response = self
            .invoke_function(
                &self.config.payment_function,
                &json!({ "itineraryId": itinerary_id }),
            )
            .await?;
        parse_payment_intent(response)
    }

    async fn get_unlocked_itinerary(
        &self,
        itinerary_id: &str,
    ) -> Result<Option<FullItinerary>, GatewayError> {
        let response = self
            .invoke_function(
                &self.config.unlock_function,
                &json!({ "itineraryId": itinerary_id }),
            )
            .await?;
        parse_unlocked_itinerary(response)
    }
}

impl CatalogGateway for RestGateway {
    async fn list_countries(&self) -> Result<Vec<Country>, GatewayError> {
        let query = TableQuery::from("countries").order("name", Order::Asc);
        self.fetch_rows("country", &query).await
    }

    async fn country_by_slug(&self, slug: &str) -> Result<Option<Country>, GatewayError> {
        self.first_row("country", TableQuery::from("countries").eq("slug", slug))
            .await
    }

    async fn list_collections(&self) -> Result<Vec<Collection>, GatewayError> {
        let query = TableQuery::from("collections").order("title", Order::Asc);
        self.fetch_rows("collection", &query).await
    }

    async fn list_tours(&self, filter: &TourFilter) -> Result<Vec<Tour>, GatewayError> {
        self.fetch_rows("tour", &filter.to_query()).await
    }

    async fn tour_by_slug(&self, slug: &str) -> Result<Option<Tour>, GatewayError> {
        self.first_row("tour", TableQuery::from("tours").eq("slug", slug))
            .await
    }

    async fn list_vibes(&self) -> Result<Vec<Vibe>, GatewayError> {
        let query = TableQuery::from("vibes").order("name", Order::Asc);
        self.fetch_rows("vibe", &query).await
    }

    async fn questionnaire_config(&self) -> Result<Vec<QuestionnaireQuestion>, GatewayError> {
        let query = TableQuery::from("questionnaire_config")
            .order("step", Order::Asc)
            .order("position", Order::Asc);
        self.fetch_rows("questionnaire question", &query).await
    }
}
