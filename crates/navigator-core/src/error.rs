use crate::events::MAX_MESSAGE_SIZE;

/// Failure to turn raw transport bytes into a [`StatusMessage`](crate::events::StatusMessage).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty message")]
    Empty,
    #[error("message too large: {0} bytes (max {MAX_MESSAGE_SIZE})")]
    TooLarge(usize),
    #[error("message is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Misuse of the reconciler's connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("already connected to {endpoint}")]
    AlreadyConnected { endpoint: String },
    #[error("endpoint must not be empty")]
    EmptyEndpoint,
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be {requirement}")]
    Invalid {
        field: &'static str,
        requirement: &'static str,
    },
    #[error("agent names must not be empty")]
    EmptyAgentName,
    #[error("duplicate agent name: {0}")]
    DuplicateAgent(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, requirement: &'static str) -> Self {
        Self::Invalid { field, requirement }
    }
}
