use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Maximum accepted size of one inbound status message in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

/// Status vocabulary reported by backend agents.
///
/// The wire value is a loose string; anything this client does not know is
/// kept as [`StatusKind::Unknown`] so newer backends never break older
/// dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusKind {
    Queued,
    Processing,
    Complete,
    Error,
    Unknown(String),
}

impl StatusKind {
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "queued" => Self::Queued,
            "processing" => Self::Processing,
            "complete" => Self::Complete,
            "error" => Self::Error,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for StatusKind {
    fn from(raw: String) -> Self {
        Self::from_wire(&raw)
    }
}

impl From<StatusKind> for String {
    fn from(kind: StatusKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing metrics attached to a status update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    /// Expected total duration of the unit of work, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Time spent so far, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_processed: Option<f64>,
}

impl AgentMetrics {
    /// Percentage of `duration` covered by `processing_time`, clamped to
    /// `[0, 100]`. `None` unless both are present, finite, and the duration
    /// is positive.
    pub fn progress_percent(&self) -> Option<f64> {
        let elapsed = self.processing_time?;
        let total = self.duration?;
        if !elapsed.is_finite() || !total.is_finite() || total <= 0.0 {
            return None;
        }
        Some((elapsed / total * 100.0).clamp(0.0, 100.0))
    }
}

/// Optional body of a status message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AgentMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One status event from the agent backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Name of the agent the event is about.
    pub agent: String,
    pub status: StatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<StatusPayload>,
}

impl StatusMessage {
    pub fn new(agent: impl Into<String>, status: StatusKind) -> Self {
        Self {
            agent: agent.into(),
            status,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: StatusPayload) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Decode a JSON text frame into a [`StatusMessage`].
pub fn decode_status_message(text: &str) -> Result<StatusMessage, DecodeError> {
    if text.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(DecodeError::TooLarge(text.len()));
    }
    Ok(serde_json::from_str(text)?)
}

/// Decode a binary frame that carries UTF-8 JSON.
pub fn decode_status_bytes(data: &[u8]) -> Result<StatusMessage, DecodeError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(DecodeError::TooLarge(data.len()));
    }
    decode_status_message(std::str::from_utf8(data)?)
}
