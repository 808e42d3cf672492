use std::env;
use std::time::Duration;

use honeymoon_core::GatewayError;
use url::Url;

const DEFAULT_MATCH_FUNCTION: &str = "match-itinerary";
const DEFAULT_PAYMENT_FUNCTION: &str = "create-payment-intent";
const DEFAULT_UNLOCK_FUNCTION: &str = "get-unlocked-itinerary";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: Url,
    pub api_key: String,
    pub match_function: String,
    pub payment_function: String,
    pub unlock_function: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, GatewayError> {
        let mut base_url = Url::parse(base_url.trim())
            .map_err(|error| GatewayError::Config(format!("invalid backend url: {error}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GatewayError::Config("backend key is empty".to_string()));
        }

        Ok(Self {
            base_url,
            api_key,
            match_function: DEFAULT_MATCH_FUNCTION.to_string(),
            payment_function: DEFAULT_PAYMENT_FUNCTION.to_string(),
            unlock_function: DEFAULT_UNLOCK_FUNCTION.to_string(),
            timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(6),
        })
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        let base_url = env::var("HONEYMOON_BACKEND_URL")
            .map_err(|_| GatewayError::Config("HONEYMOON_BACKEND_URL is not set".to_string()))?;
        let api_key = env::var("HONEYMOON_BACKEND_KEY")
            .map_err(|_| GatewayError::Config("HONEYMOON_BACKEND_KEY is not set".to_string()))?;

        let mut config = Self::new(&base_url, api_key)?;
        if let Some(name) = non_empty_var("HONEYMOON_MATCH_FUNCTION") {
            config.match_function = name;
        }
        if let Some(name) = non_empty_var("HONEYMOON_PAYMENT_FUNCTION") {
            config.payment_function = name;
        }
        if let Some(name) = non_empty_var("HONEYMOON_UNLOCK_FUNCTION") {
            config.unlock_function = name;
        }
        config.timeout = Duration::from_secs(
            env::var("HONEYMOON_HTTP_TIMEOUT_SECONDS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(20),
        );

        Ok(config)
    }

    pub(crate) fn rest_url(&self, table: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(&format!("rest/v1/{table}"))
            .map_err(|error| GatewayError::Config(error.to_string()))
    }

    pub(crate) fn function_url(&self, name: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(&format!("functions/v1/{name}"))
            .map_err(|error| GatewayError::Config(error.to_string()))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
