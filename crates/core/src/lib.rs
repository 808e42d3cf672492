pub mod answers;
pub mod clock;
pub mod error;
pub mod models;

pub use answers::{normalize_tags, normalize_text, AnswersError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GatewayError;
pub use models::*;
