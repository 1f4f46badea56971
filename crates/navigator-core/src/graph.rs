use std::collections::HashMap;
use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::DecodeError;

/// One concept in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Category tag, used for colour only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// A relation between two nodes, by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl GraphEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
        }
    }
}

/// Immutable node/edge snapshot handed to a viewport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self { nodes, edges }
    }

    /// Parse the visualizer's `{"nodes": [...], "edges": [...]}` output.
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        if text.trim().is_empty() {
            return Err(DecodeError::Empty);
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Node index by id. On duplicate ids the first node wins.
    pub fn index(&self) -> HashMap<&str, usize> {
        let mut index = HashMap::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            if index.contains_key(node.id.as_str()) {
                tracing::warn!(node = %node.id, "Duplicate node id, keeping the first");
                continue;
            }
            index.insert(node.id.as_str(), i);
        }
        index
    }
}

/// Radius of the layout circle for `count` nodes.
pub fn layout_radius(count: usize, config: &LayoutConfig) -> f32 {
    (config.radius_per_node * count as f32).min(config.radius_cap)
}

/// Place `count` nodes evenly on a circle centred at the origin, node `i` at
/// angle `2π·i/count`. Pure in its inputs.
pub fn circular_layout(count: usize, config: &LayoutConfig) -> Vec<Vec2> {
    let radius = layout_radius(count, config);
    (0..count)
        .map(|i| {
            let angle = TAU * i as f32 / count as f32;
            Vec2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_layout() {
        assert!(circular_layout(0, &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn radius_grows_then_caps() {
        let cfg = LayoutConfig::default();
        assert_eq!(layout_radius(2, &cfg), 120.0);
        assert_eq!(layout_radius(100, &cfg), cfg.radius_cap);
    }

    #[test]
    fn first_node_sits_on_positive_x_axis() {
        let cfg = LayoutConfig::default();
        let positions = circular_layout(4, &cfg);
        assert!((positions[0] - Vec2::new(240.0, 0.0)).length() < 1e-3);
        assert!((positions[1] - Vec2::new(0.0, 240.0)).length() < 1e-3);
    }

    #[test]
    fn positions_are_distinct_and_deterministic() {
        let cfg = LayoutConfig::default();
        for count in 2..64 {
            let positions = circular_layout(count, &cfg);
            assert_eq!(positions, circular_layout(count, &cfg));
            for i in 0..count {
                for j in (i + 1)..count {
                    assert!(
                        positions[i].distance(positions[j]) > 1e-2,
                        "nodes {i} and {j} overlap for {count} nodes"
                    );
                }
            }
        }
    }

    #[test]
    fn graph_from_json() {
        let graph = Graph::from_json(
            r#"{
                "nodes": [
                    {"id": "a", "label": "Alpha", "group": "concept"},
                    {"id": "b", "label": "Beta"}
                ],
                "edges": [{"from": "a", "to": "b", "label": "mentions"}]
            }"#,
        )
        .unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].group.as_deref(), Some("concept"));
        assert_eq!(graph.edges[0].label.as_deref(), Some("mentions"));
    }

    #[test]
    fn graph_from_json_rejects_empty_input() {
        assert!(matches!(Graph::from_json(""), Err(DecodeError::Empty)));
    }

    #[test]
    fn index_keeps_first_duplicate() {
        let graph = Graph::new(
            vec![
                GraphNode::new("a", "first"),
                GraphNode::new("a", "second"),
            ],
            vec![],
        );
        assert_eq!(graph.index()["a"], 0);
    }
}
