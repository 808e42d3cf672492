//! Typed parsing of backend responses.
//!
//! Everything arriving from the backend is untrusted. These functions turn raw
//! JSON into the core entities and reject anything that does not fit.

use std::collections::HashSet;

use honeymoon_core::{FullItinerary, GatewayError, ItineraryPreview, PaymentIntent};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub fn parse_match_response(
    value: Value,
) -> Result<Option<Vec<ItineraryPreview>>, GatewayError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(_) => parse_previews(value).map(Some),
        Value::Object(mut object) => match object.remove("recommendations") {
            Some(Value::Null) => Ok(None),
            Some(recommendations) => parse_previews(recommendations).map(Some),
            None => Err(GatewayError::invalid(
                "match",
                "response has no recommendations field",
            )),
        },
        other => Err(GatewayError::invalid(
            "match",
            format!("unexpected {} response", kind_of(&other)),
        )),
    }
}

pub fn parse_payment_intent(value: Value) -> Result<PaymentIntent, GatewayError> {
    let intent: PaymentIntent = serde_json::from_value(value)
        .map_err(|error| GatewayError::invalid("payment intent", error.to_string()))?;

    if intent.client_secret.trim().is_empty() {
        return Err(GatewayError::invalid(
            "payment intent",
            "client secret is empty",
        ));
    }

    Ok(intent)
}

pub fn parse_unlocked_itinerary(value: Value) -> Result<Option<FullItinerary>, GatewayError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(mut object) if object.contains_key("itinerary") => {
            match object.remove("itinerary") {
                Some(Value::Null) | None => Ok(None),
                Some(inner) => parse_full_itinerary(inner).map(Some),
            }
        }
        value @ Value::Object(_) => parse_full_itinerary(value).map(Some),
        other => Err(GatewayError::invalid(
            "itinerary",
            format!("unexpected {} response", kind_of(&other)),
        )),
    }
}

pub fn parse_rows<T: DeserializeOwned>(
    entity: &'static str,
    value: Value,
) -> Result<Vec<T>, GatewayError> {
    if !value.is_array() {
        return Err(GatewayError::invalid(
            entity,
            format!("expected a row array, got {}", kind_of(&value)),
        ));
    }

    serde_json::from_value(value).map_err(|error| GatewayError::invalid(entity, error.to_string()))
}

fn parse_previews(value: Value) -> Result<Vec<ItineraryPreview>, GatewayError> {
    let previews: Vec<ItineraryPreview> = parse_rows("itinerary preview", value)?;
    for preview in &previews {
        validate_preview(preview)?;
    }
    Ok(previews)
}

fn parse_full_itinerary(value: Value) -> Result<FullItinerary, GatewayError> {
    let mut itinerary: FullItinerary = serde_json::from_value(value)
        .map_err(|error| GatewayError::invalid("itinerary", error.to_string()))?;

    validate_preview(&itinerary.preview)?;

    itinerary.days.sort_by_key(|day| day.day);
    let mut seen = HashSet::new();
    for day in &itinerary.days {
        if day.day == 0 {
            return Err(GatewayError::invalid("itinerary", "day numbers start at 1"));
        }
        if !seen.insert(day.day) {
            return Err(GatewayError::invalid(
                "itinerary",
                format!("day {} appears more than once", day.day),
            ));
        }
    }

    if let Some(map) = itinerary.map_data.as_ref() {
        for marker in &map.markers {
            let latitude_ok = marker.latitude.is_finite() && marker.latitude.abs() <= 90.0;
            let longitude_ok = marker.longitude.is_finite() && marker.longitude.abs() <= 180.0;
            if !latitude_ok || !longitude_ok {
                return Err(GatewayError::invalid(
                    "itinerary",
                    format!("map marker '{}' has invalid coordinates", marker.label),
                ));
            }
        }
    }

    Ok(itinerary)
}

fn validate_preview(preview: &ItineraryPreview) -> Result<(), GatewayError> {
    let entity = "itinerary preview";

    if preview.id.trim().is_empty() {
        return Err(GatewayError::invalid(entity, "id is empty"));
    }
    if preview.title.trim().is_empty() {
        return Err(GatewayError::invalid(
            entity,
            format!("{} has an empty title", preview.id),
        ));
    }
    if preview.slug.trim().is_empty() {
        return Err(GatewayError::invalid(
            entity,
            format!("{} has an empty slug", preview.id),
        ));
    }
    if preview.duration == 0 {
        return Err(GatewayError::invalid(
            entity,
            format!("{} has a zero-day duration", preview.id),
        ));
    }
    if let Some(price) = preview.guide_price {
        if !price.is_finite() || price < 0.0 {
            return Err(GatewayError::invalid(
                entity,
                format!("{} has an invalid guide price", preview.id),
            ));
        }
    }
    if preview.similarity.is_some_and(|score| !score.is_finite()) {
        return Err(GatewayError::invalid(
            entity,
            format!("{} has an invalid similarity score", preview.id),
        ));
    }

    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
