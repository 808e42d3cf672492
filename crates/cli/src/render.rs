use std::fmt::{self, Write as _};

use honeymoon_core::{FullItinerary, ItineraryPreview, PlannerSessionData};
use honeymoon_planner::{FailureReason, PlannerState, Recommendations};

pub fn render_state(state: &PlannerState) -> Result<String, fmt::Error> {
    let text = match state {
        PlannerState::Questionnaire => "Tell us about your honeymoon to get matched.".to_string(),
        PlannerState::LoadingPreview { .. } => "Finding itineraries that fit you...".to_string(),
        PlannerState::Preview { recommendations } => render_recommendations(recommendations)?,
        PlannerState::Payment { itinerary_id, .. } => {
            format!("Itinerary {itinerary_id} selected. Payment is required to unlock it.")
        }
        PlannerState::LoadingFull { itinerary_id, .. } => {
            format!("Unlocking itinerary {itinerary_id}...")
        }
        PlannerState::FullItinerary { itinerary, .. } => render_full_itinerary(itinerary)?,
        PlannerState::Export { document, .. } => format!(
            "Exported {} ({}, {} bytes)",
            document.file_name,
            document.content_type,
            document.body.len()
        ),
        PlannerState::Error { failure } => match failure.reason {
            FailureReason::NoMatches => format!(
                "{}\nRun `planner plan` again with different answers.",
                failure.message
            ),
            _ => format!("Something went wrong: {}", failure.message),
        },
    };
    Ok(text)
}

pub fn render_recommendations(recommendations: &Recommendations) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(
        out,
        "{} itinerar{} matched:",
        recommendations.previews.len(),
        if recommendations.previews.len() == 1 { "y" } else { "ies" }
    )?;
    for (index, preview) in recommendations.previews.iter().enumerate() {
        writeln!(out, "{}. {}", index + 1, preview_line(preview)?)?;
    }
    Ok(out.trim_end().to_string())
}

pub fn render_session(session: &PlannerSessionData) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(
        out,
        "Saved {} ({} itineraries)",
        session.timestamp.format("%Y-%m-%d %H:%M UTC"),
        session.recommended_tours.len()
    )?;
    for (index, preview) in session.recommended_tours.iter().enumerate() {
        writeln!(out, "{}. {}", index + 1, preview_line(preview)?)?;
    }
    Ok(out.trim_end().to_string())
}

fn preview_line(preview: &ItineraryPreview) -> Result<String, fmt::Error> {
    let mut line = format!("{} [{}] {} days", preview.title, preview.id, preview.duration);
    if !preview.countries.is_empty() {
        write!(line, ", {}", preview.countries.join(" / "))?;
    }
    if let Some(price) = preview.guide_price {
        write!(line, ", from {:.0}", price)?;
    }
    if let Some(score) = preview.similarity {
        write!(line, " (match {:.0}%)", score * 100.0)?;
    }
    Ok(line)
}

fn render_full_itinerary(itinerary: &FullItinerary) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{}", itinerary.preview.title)?;
    if !itinerary.preview.summary.is_empty() {
        writeln!(out, "{}", itinerary.preview.summary)?;
    }
    for day in &itinerary.days {
        writeln!(out, "\nDay {}: {}", day.day, day.title)?;
        for activity in &day.activities {
            writeln!(out, "  - {activity}")?;
        }
        if let Some(stay) = day.accommodation.as_deref() {
            writeln!(out, "  stay: {stay}")?;
        }
    }
    Ok(out.trim_end().to_string())
}
