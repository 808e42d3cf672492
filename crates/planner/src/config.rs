use std::env;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Selecting an itinerary unlocks it straight away.
    #[default]
    Simulated,
    Required,
}

impl PaymentMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "simulated" | "bypass" | "off" => Some(Self::Simulated),
            "required" | "on" | "stripe" => Some(Self::Required),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlannerConfig {
    pub payment_mode: PaymentMode,
}

impl PlannerConfig {
    pub fn from_env() -> Self {
        let payment_mode = env::var("HONEYMOON_PAYMENT_MODE")
            .ok()
            .and_then(|value| PaymentMode::parse(&value))
            .unwrap_or_default();

        Self { payment_mode }
    }
}
