use thiserror::Error;

/// Failure raised at the remote backend boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend rejected credentials ({status})")]
    Unauthorized { status: u16 },
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("function {function} failed: {message}")]
    Function { function: String, message: String },
    #[error("invalid {entity} payload: {message}")]
    InvalidPayload { entity: &'static str, message: String },
    #[error("gateway misconfigured: {0}")]
    Config(String),
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn invalid(entity: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            entity,
            message: message.into(),
        }
    }
}
