use std::fmt::Write as _;

use anyhow::Result;
use honeymoon_core::{ExportDocument, FullItinerary};

/// Turns an unlocked itinerary into a downloadable document.
pub trait ItineraryRenderer: Send + Sync {
    fn render(&self, itinerary: &FullItinerary) -> Result<ExportDocument>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl ItineraryRenderer for MarkdownRenderer {
    fn render(&self, itinerary: &FullItinerary) -> Result<ExportDocument> {
        let preview = &itinerary.preview;
        let mut body = String::new();

        writeln!(body, "# {}", preview.title)?;
        writeln!(body)?;
        if !preview.summary.is_empty() {
            writeln!(body, "{}", preview.summary)?;
            writeln!(body)?;
        }

        write!(body, "**Duration:** {} days", preview.duration)?;
        if !preview.countries.is_empty() {
            write!(body, " | **Countries:** {}", preview.countries.join(", "))?;
        }
        if let Some(price) = preview.guide_price {
            write!(body, " | **Guide price:** {:.0} per person", price)?;
        }
        writeln!(body)?;

        if let Some(highlights) = itinerary.highlights.as_ref().filter(|h| !h.is_empty()) {
            writeln!(body)?;
            writeln!(body, "## Highlights")?;
            writeln!(body)?;
            for highlight in highlights {
                writeln!(body, "- {highlight}")?;
            }
        }

        for day in &itinerary.days {
            writeln!(body)?;
            writeln!(body, "## Day {}: {}", day.day, day.title)?;
            writeln!(body)?;
            if !day.description.is_empty() {
                writeln!(body, "{}", day.description)?;
                writeln!(body)?;
            }
            for activity in &day.activities {
                writeln!(body, "- {activity}")?;
            }
            if let Some(stay) = day.accommodation.as_deref() {
                writeln!(body)?;
                writeln!(body, "_Stay:_ {stay}")?;
            }
        }

        Ok(ExportDocument {
            file_name: format!("{}.md", preview.slug),
            content_type: "text/markdown".to_string(),
            body,
        })
    }
}
