use serde::{Deserialize, Serialize};

use crate::agent::{AgentState, AgentStatus};

/// State of the reconciler's single stream connection.
///
/// Kept apart from any agent's `Error` state: a dropped socket says nothing
/// about how the agents themselves are doing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting {
        endpoint: String,
    },
    Connected {
        endpoint: String,
    },
    /// Terminal until the caller connects again.
    Failed {
        endpoint: String,
        reason: String,
    },
}

impl ConnectionStatus {
    /// Connecting or connected.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Connecting { .. } | Self::Connected { .. })
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Disconnected => None,
            Self::Connecting { endpoint }
            | Self::Connected { endpoint }
            | Self::Failed { endpoint, .. } => Some(endpoint),
        }
    }
}

/// Full state published to subscribers after every applied change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Increases by one for every published change.
    pub revision: u64,
    pub agents: Vec<AgentStatus>,
    pub connection: ConnectionStatus,
}

impl Snapshot {
    pub fn agent(&self, name: &str) -> Option<&AgentStatus> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn stats(&self) -> DashboardStats {
        let mut stats = DashboardStats::default();
        for agent in &self.agents {
            match agent.state {
                AgentState::Idle => stats.idle += 1,
                AgentState::Queued => stats.queued += 1,
                AgentState::Processing => stats.processing += 1,
                AgentState::Done => stats.done += 1,
                AgentState::Error => stats.errored += 1,
            }
            stats.findings += agent.findings.len() as u32;
        }
        stats
    }
}

/// Aggregate counts for the dashboard header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub idle: u32,
    pub queued: u32,
    pub processing: u32,
    pub done: u32,
    pub errored: u32,
    pub findings: u32,
}

impl DashboardStats {
    /// True once every agent has reached Done or Error.
    pub fn all_settled(&self) -> bool {
        self.idle == 0 && self.queued == 0 && self.processing == 0
    }
}
