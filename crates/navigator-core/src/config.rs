use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default config file looked up in the working directory.
pub const CONFIG_FILE: &str = "navigator.toml";

/// Top-level configuration, loaded from `navigator.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    pub agents: AgentsConfig,
    pub layout: LayoutConfig,
    pub zoom: ZoomConfig,
    pub highlight: HighlightConfig,
    pub transport: TransportConfig,
}

/// Agents seeded into the status table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub names: Vec<String>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            names: ["Orchestrator", "Summarizer", "Linker", "Visualizer"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Circular layout parameters, in logical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Upper bound on the layout circle's radius.
    pub radius_cap: f32,
    /// Radius contributed by each node until the cap is reached.
    pub radius_per_node: f32,
    /// Hit-test radius of a rendered node.
    pub node_radius: f32,
    /// Margin around the layout circle in the initial view.
    pub padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            radius_cap: 400.0,
            radius_per_node: 60.0,
            node_radius: 24.0,
            padding: 100.0,
        }
    }
}

/// Zoom step factors and extent limits. Factors scale the visible extent:
/// below 1 zooms in, above 1 zooms out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Zoom-out factor per wheel notch; zoom-in uses its reciprocal.
    pub wheel_factor: f32,
    pub button_in: f32,
    pub button_out: f32,
    pub min_extent: f32,
    pub max_extent: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            wheel_factor: 1.1,
            button_in: 0.8,
            button_out: 1.25,
            min_extent: 1.0,
            max_extent: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Opacity applied to nodes and edges outside the hover set.
    pub dimmed_opacity: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            dimmed_opacity: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// WebSocket endpoint that streams agent status events.
    pub endpoint: String,
    /// Snapshots buffered per subscriber before it starts skipping.
    pub snapshot_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8000/ws".to_string(),
            snapshot_capacity: crate::reconciler::DEFAULT_SNAPSHOT_CAPACITY,
        }
    }
}

impl ZoomConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.wheel_factor.is_finite() && self.wheel_factor > 1.0) {
            return Err(ConfigError::invalid("zoom.wheel_factor", "greater than 1"));
        }
        if !(self.button_in > 0.0 && self.button_in < 1.0) {
            return Err(ConfigError::invalid("zoom.button_in", "between 0 and 1"));
        }
        if !(self.button_out.is_finite() && self.button_out > 1.0) {
            return Err(ConfigError::invalid("zoom.button_out", "greater than 1"));
        }
        if !(self.min_extent.is_finite() && self.min_extent > 0.0) {
            return Err(ConfigError::invalid("zoom.min_extent", "a positive number"));
        }
        if !(self.max_extent.is_finite() && self.max_extent >= self.min_extent) {
            return Err(ConfigError::invalid(
                "zoom.max_extent",
                "at least zoom.min_extent",
            ));
        }
        Ok(())
    }
}

impl NavigatorConfig {
    /// Check every section, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for name in &self.agents.names {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyAgentName);
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateAgent(name.clone()));
            }
        }

        let layout = &self.layout;
        if !(layout.radius_cap.is_finite() && layout.radius_cap > 0.0) {
            return Err(ConfigError::invalid("layout.radius_cap", "a positive number"));
        }
        if !(layout.radius_per_node.is_finite() && layout.radius_per_node > 0.0) {
            return Err(ConfigError::invalid(
                "layout.radius_per_node",
                "a positive number",
            ));
        }
        if !(layout.node_radius.is_finite() && layout.node_radius >= 0.0) {
            return Err(ConfigError::invalid("layout.node_radius", "zero or positive"));
        }
        if !(layout.padding.is_finite() && layout.padding >= 0.0) {
            return Err(ConfigError::invalid("layout.padding", "zero or positive"));
        }

        self.zoom.validate()?;

        if !(0.0..=1.0).contains(&self.highlight.dimmed_opacity) {
            return Err(ConfigError::invalid(
                "highlight.dimmed_opacity",
                "between 0 and 1",
            ));
        }

        if self.transport.snapshot_capacity == 0 {
            return Err(ConfigError::invalid(
                "transport.snapshot_capacity",
                "greater than 0",
            ));
        }
        Ok(())
    }

    /// Load config from `navigator.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<NavigatorConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to parse config: {e}, using defaults");
                    NavigatorConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                NavigatorConfig::default()
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `NAVIGATOR_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("NAVIGATOR_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.transport.endpoint = endpoint;
        }
        if let Some(names) = lookup("NAVIGATOR_AGENTS")
            && !names.trim().is_empty()
        {
            self.agents.names = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(val) = lookup("NAVIGATOR_SNAPSHOT_CAPACITY")
            && let Ok(n) = val.parse::<usize>()
        {
            self.transport.snapshot_capacity = n;
        }
    }
}
