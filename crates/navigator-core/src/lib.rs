pub mod agent;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod graph;
pub mod interaction;
pub mod reconciler;
pub mod viewport;

pub use agent::{AgentState, AgentStatus};
pub use config::NavigatorConfig;
pub use dashboard::{ConnectionStatus, DashboardStats, Snapshot};
pub use error::{ConfigError, DecodeError, ReconcileError};
pub use events::{StatusKind, StatusMessage};
pub use graph::{Graph, GraphEdge, GraphNode};
pub use interaction::{MouseButton, PointerController};
pub use reconciler::{ApplyOutcome, ConnectionHandle, StreamReconciler, Subscription};
pub use viewport::{GraphViewport, ViewportGeometry, ViewportTransform};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::events::{AgentMetrics, StatusPayload};
    use crate::graph::{Graph, GraphEdge, GraphNode};
    use crate::reconciler::StreamReconciler;

    /// Agents seeded by the default configuration.
    pub const DEFAULT_AGENTS: [&str; 4] = ["Orchestrator", "Summarizer", "Linker", "Visualizer"];

    /// A reconciler seeded with [`DEFAULT_AGENTS`].
    pub fn seeded_reconciler() -> StreamReconciler {
        StreamReconciler::new(DEFAULT_AGENTS)
    }

    /// Wire JSON for a bare status event.
    pub fn status_json(agent: &str, status: &str) -> String {
        serde_json::json!({ "agent": agent, "status": status }).to_string()
    }

    /// Wire JSON for a status event with a summary and timing metrics.
    pub fn status_json_with_metrics(
        agent: &str,
        status: &str,
        summary: &str,
        processing_time: f64,
        duration: f64,
    ) -> String {
        let payload = StatusPayload {
            summary: Some(summary.to_string()),
            metrics: Some(AgentMetrics {
                duration: Some(duration),
                processing_time: Some(processing_time),
                tokens_processed: None,
            }),
            error_message: None,
        };
        serde_json::json!({ "agent": agent, "status": status, "payload": payload }).to_string()
    }

    /// Three concepts where `A` links to `B` and `C` stands alone. `A` is
    /// tagged with the `concept` group.
    pub fn sample_graph() -> Graph {
        Graph::new(
            vec![
                GraphNode::new("A", "Alpha").with_group("concept"),
                GraphNode::new("B", "Beta"),
                GraphNode::new("C", "Gamma"),
            ],
            vec![GraphEdge::new("A", "B")],
        )
    }
}
