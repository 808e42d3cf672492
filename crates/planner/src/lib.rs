mod config;
mod error;
mod export;
mod machine;
mod state;

pub use config::{PaymentMode, PlannerConfig};
pub use error::PlannerError;
pub use export::{ItineraryRenderer, MarkdownRenderer};
pub use machine::{Planner, Transition};
pub use state::{FailureReason, PlannerFailure, PlannerState, Recommendations};
