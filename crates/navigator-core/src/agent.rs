use serde::{Deserialize, Serialize};

use crate::events::{AgentMetrics, StatusKind, StatusPayload};

/// Lifecycle state of one monitored agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    #[default]
    Idle,
    Queued,
    Processing,
    Done,
    Error,
}

impl AgentState {
    pub const ALL: [AgentState; 5] = [
        AgentState::Idle,
        AgentState::Queued,
        AgentState::Processing,
        AgentState::Done,
        AgentState::Error,
    ];

    /// Done and Error only leave through an explicit reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// State reached from `self` on a status event. Events with no legal
    /// transition, unknown statuses included, leave the state unchanged.
    pub fn on_status(self, status: &StatusKind) -> AgentState {
        match (self, status) {
            (_, StatusKind::Error) => Self::Error,
            (state, _) if state.is_terminal() => state,
            (Self::Idle, StatusKind::Queued) => Self::Queued,
            (Self::Idle | Self::Queued | Self::Processing, StatusKind::Processing) => {
                Self::Processing
            },
            (Self::Processing, StatusKind::Complete) => Self::Done,
            (state, _) => state,
        }
    }

    /// Whether `to` is reachable from `self` in one step of the table above.
    pub fn can_transition_to(self, to: AgentState) -> bool {
        if self == to {
            return true;
        }
        match (self, to) {
            (_, Self::Error) => true,
            (Self::Idle, Self::Queued) => true,
            (Self::Idle | Self::Queued, Self::Processing) => true,
            (Self::Processing, Self::Done) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Per-agent state shown in the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: String,
    pub name: String,
    pub state: AgentState,
    /// Percentage in `[0, 100]`, only meaningful while processing.
    pub progress: f64,
    /// Append-only partial results; cleared only by [`AgentStatus::reset`].
    pub findings: Vec<String>,
    pub metrics: Option<AgentMetrics>,
    pub detail: String,
}

impl AgentStatus {
    pub fn idle(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.to_lowercase(),
            name,
            state: AgentState::Idle,
            progress: 0.0,
            findings: Vec::new(),
            metrics: None,
            detail: String::new(),
        }
    }

    /// Fold one status event into this agent.
    pub fn apply(&mut self, status: &StatusKind, payload: Option<&StatusPayload>) {
        let previous = self.state;
        self.state = previous.on_status(status);

        let mut reported = None;
        if let Some(payload) = payload {
            if let Some(summary) = &payload.summary {
                self.findings.push(summary.clone());
            }
            if let Some(metrics) = payload.metrics {
                self.metrics = Some(metrics);
                reported = metrics.progress_percent();
            }
            if let Some(message) = &payload.error_message {
                self.detail = message.clone();
            }
        }

        match self.state {
            AgentState::Queued => self.progress = 0.0,
            AgentState::Processing => {
                if let Some(percent) = reported {
                    self.progress = if previous == AgentState::Processing {
                        self.progress.max(percent)
                    } else {
                        percent
                    };
                }
            },
            AgentState::Done => self.progress = 100.0,
            AgentState::Idle | AgentState::Error => {},
        }
    }

    /// Return to the freshly seeded idle snapshot.
    pub fn reset(&mut self) {
        *self = Self::idle(std::mem::take(&mut self.name));
    }
}
