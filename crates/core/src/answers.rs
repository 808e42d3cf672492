use std::collections::BTreeSet;

use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

use crate::models::QuestionnaireAnswers;

pub const MIN_TRIP_DAYS: u32 = 1;
pub const MAX_TRIP_DAYS: u32 = 60;
pub const MAX_FREE_TEXT_GRAPHEMES: usize = 500;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnswersError {
    #[error("at least one vibe must be selected")]
    MissingVibe,
    #[error("trip duration must be between 1 and 60 days, got {0}")]
    DurationOutOfRange(u32),
    #[error("budget per person must be a positive amount, got {0}")]
    InvalidBudget(f64),
    #[error("free-text query is limited to 500 grapheme clusters, got {0}")]
    FreeTextTooLong(usize),
}

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

pub fn normalize_tags(tags: &BTreeSet<String>) -> BTreeSet<String> {
    tags.iter()
        .map(|tag| normalize_text(tag).to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

impl QuestionnaireAnswers {
    /// Normalises every free-form field and checks the answers can be sent to
    /// the matcher. Returns the cleaned copy; `self` is left untouched.
    pub fn validated(&self) -> Result<Self, AnswersError> {
        let vibe = normalize_tags(&self.vibe);
        if vibe.is_empty() {
            return Err(AnswersError::MissingVibe);
        }

        if !(MIN_TRIP_DAYS..=MAX_TRIP_DAYS).contains(&self.duration) {
            return Err(AnswersError::DurationOutOfRange(self.duration));
        }

        if !self.budget_range.is_finite() || self.budget_range <= 0.0 {
            return Err(AnswersError::InvalidBudget(self.budget_range));
        }

        let free_text_query = match self.free_text_query.as_deref().map(normalize_text) {
            Some(query) if query.is_empty() => None,
            Some(query) => {
                let length = query.graphemes(true).count();
                if length > MAX_FREE_TEXT_GRAPHEMES {
                    return Err(AnswersError::FreeTextTooLong(length));
                }
                Some(query)
            }
            None => None,
        };

        Ok(Self {
            vibe,
            duration: self.duration,
            regions: normalize_tags(&self.regions),
            interests: normalize_tags(&self.interests),
            budget_range: self.budget_range,
            free_text_query,
            avoid: self.avoid.as_ref().map(normalize_tags),
            timing: self.timing.as_ref().map(normalize_tags),
            pace: self.pace.as_ref().map(normalize_tags),
        })
    }
}
