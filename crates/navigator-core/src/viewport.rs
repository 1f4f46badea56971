use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::{HighlightConfig, LayoutConfig, NavigatorConfig, ZoomConfig};
use crate::graph::{Graph, circular_layout};

/// Logical window mapped onto the screen.
///
/// `size` is kept strictly positive by every [`GraphViewport`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    /// Logical top-left corner.
    pub origin: Vec2,
    /// Logical width and height.
    pub size: Vec2,
}

impl ViewportTransform {
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self {
            origin: center - size * 0.5,
            size,
        }
    }

    pub fn to_screen(&self, logical: Vec2, screen: Vec2) -> Vec2 {
        (logical - self.origin) * screen / self.size
    }

    pub fn to_logical(&self, point: Vec2, screen: Vec2) -> Vec2 {
        self.origin + point * self.size / screen
    }

    fn is_valid(&self) -> bool {
        self.origin.is_finite() && self.size.is_finite() && self.size.cmpgt(Vec2::ZERO).all()
    }
}

/// Hover styling of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeHighlight {
    /// Nothing is hovered.
    Neutral,
    Hovered,
    /// Directly linked to the hovered node.
    Connected,
    Dimmed,
}

impl NodeHighlight {
    pub fn opacity(self, dimmed: f32) -> f32 {
        if self == Self::Dimmed { dimmed } else { 1.0 }
    }
}

/// Hover styling of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeHighlight {
    Neutral,
    /// One endpoint is the hovered node.
    Emphasized,
    Dimmed,
}

impl EdgeHighlight {
    pub fn opacity(self, dimmed: f32) -> f32 {
        if self == Self::Dimmed { dimmed } else { 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeGeometry<'a> {
    pub id: &'a str,
    pub label: &'a str,
    pub group: Option<&'a str>,
    pub position: Vec2,
    pub highlight: NodeHighlight,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub label: Option<&'a str>,
    pub start: Vec2,
    pub end: Vec2,
    pub highlight: EdgeHighlight,
    pub opacity: f32,
}

/// Render-ready screen-space geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewportGeometry<'a> {
    pub nodes: Vec<NodeGeometry<'a>>,
    pub edges: Vec<EdgeGeometry<'a>>,
}

impl<'a> ViewportGeometry<'a> {
    pub fn node(&self, id: &str) -> Option<&NodeGeometry<'a>> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeGeometry<'a>> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }
}

/// An edge whose endpoints both resolved to nodes.
#[derive(Debug, Clone, Copy)]
struct ResolvedEdge {
    edge: usize,
    from: usize,
    to: usize,
}

/// Pan/zoom/hover state over one immutable graph.
///
/// Node positions are laid out once at construction; a new graph needs a
/// new viewport.
pub struct GraphViewport {
    graph: Graph,
    positions: Vec<Vec2>,
    edges: Vec<ResolvedEdge>,
    neighbors: Vec<Vec<usize>>,
    index: HashMap<String, usize>,
    transform: ViewportTransform,
    screen: Vec2,
    hovered: Option<usize>,
    active: Vec<bool>,
    layout: LayoutConfig,
    zoom: ZoomConfig,
    highlight: HighlightConfig,
}

impl GraphViewport {
    pub fn new(graph: Graph, screen: Vec2) -> Self {
        Self::with_config(graph, screen, &NavigatorConfig::default())
    }

    pub fn with_config(graph: Graph, screen: Vec2, config: &NavigatorConfig) -> Self {
        let positions = circular_layout(graph.nodes.len(), &config.layout);
        let index: HashMap<String, usize> = graph
            .index()
            .into_iter()
            .map(|(id, i)| (id.to_string(), i))
            .collect();

        let mut edges = Vec::with_capacity(graph.edges.len());
        let mut neighbors = vec![Vec::new(); graph.nodes.len()];
        for (i, edge) in graph.edges.iter().enumerate() {
            let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) else {
                tracing::debug!(from = %edge.from, to = %edge.to, "Skipping edge with missing endpoint");
                continue;
            };
            edges.push(ResolvedEdge { edge: i, from, to });
            neighbors[from].push(to);
            neighbors[to].push(from);
        }

        let screen = sanitize_screen(screen);
        let mut viewport = Self {
            active: vec![false; graph.nodes.len()],
            graph,
            positions,
            edges,
            neighbors,
            index,
            transform: ViewportTransform::new(Vec2::ZERO, Vec2::ONE),
            screen,
            hovered: None,
            layout: config.layout,
            zoom: usable_zoom(&config.zoom),
            highlight: config.highlight,
        };
        viewport.transform = viewport.default_transform();
        viewport
    }

    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    /// Replace the transform wholesale. Degenerate transforms are refused.
    pub fn set_transform(&mut self, transform: ViewportTransform) -> bool {
        if !transform.is_valid() {
            return false;
        }
        self.transform = transform;
        true
    }

    pub fn screen_size(&self) -> Vec2 {
        self.screen
    }

    /// Logical position assigned to a node by the layout.
    pub fn node_position(&self, id: &str) -> Option<Vec2> {
        self.index.get(id).map(|&i| self.positions[i])
    }

    pub fn to_screen(&self, logical: Vec2) -> Vec2 {
        self.transform.to_screen(logical, self.screen)
    }

    pub fn to_logical(&self, point: Vec2) -> Vec2 {
        self.transform.to_logical(point, self.screen)
    }

    /// Square-pixel view of the full layout circle plus padding, centred on
    /// the origin.
    fn default_transform(&self) -> ViewportTransform {
        let width = 2.0 * (self.layout.radius_cap + self.layout.padding);
        let width = width.max(self.zoom.min_extent).min(self.zoom.max_extent);
        let height = width * self.screen.y / self.screen.x;
        ViewportTransform::centered(Vec2::ZERO, Vec2::new(width, height))
    }

    /// Track a resized canvas, keeping the zoom level and top-left corner.
    pub fn resize(&mut self, screen: Vec2) {
        if !(screen.is_finite() && screen.cmpgt(Vec2::ZERO).all()) {
            return;
        }
        let size = self.transform.size * screen / self.screen;
        if size.is_finite() && size.cmpgt(Vec2::ZERO).all() {
            self.transform.size = size;
        }
        self.screen = screen;
    }

    /// Frame every node with the configured padding.
    pub fn fit_to_content(&mut self) {
        if self.positions.is_empty() {
            self.transform = self.default_transform();
            return;
        }
        let (min, max) = self.positions.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(lo, hi), &p| (lo.min(p), hi.max(p)),
        );
        let margin = self.layout.node_radius + self.layout.padding;
        let content = (max - min) + Vec2::splat(2.0 * margin);
        let aspect = self.screen.x / self.screen.y;
        let width = content
            .x
            .max(content.y * aspect)
            .max(self.zoom.min_extent)
            .min(self.zoom.max_extent);
        let size = Vec2::new(width, width / aspect);
        self.transform = ViewportTransform::centered((min + max) * 0.5, size);
    }

    /// Move the view by a pointer delta in pixels. Content follows the
    /// pointer at the same on-screen speed at every zoom level.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let delta = Vec2::new(dx, dy) * self.transform.size / self.screen;
        let origin = self.transform.origin - delta;
        if origin.is_finite() {
            self.transform.origin = origin;
        }
    }

    /// Scale the visible extent by `factor` (below 1 zooms in), keeping the
    /// logical point under `anchor` on the same pixel. The factor is clamped
    /// so the extent stays within the configured limits. Returns false for
    /// non-positive or non-finite factors.
    pub fn zoom_at(&mut self, anchor: Vec2, factor: f32) -> bool {
        if !(factor.is_finite() && factor > 0.0) || !anchor.is_finite() {
            return false;
        }
        let size = self.transform.size;
        let lower = self.zoom.min_extent / size.min_element();
        let upper = (self.zoom.max_extent / size.max_element()).max(lower);
        let factor = factor.clamp(lower, upper);

        let pinned = self.to_logical(anchor);
        let new_size = size * factor;
        let candidate = ViewportTransform::new(pinned - anchor * new_size / self.screen, new_size);
        self.set_transform(candidate)
    }

    pub fn zoom_centered(&mut self, factor: f32) -> bool {
        self.zoom_at(self.screen * 0.5, factor)
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_centered(self.zoom.button_in)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_centered(self.zoom.button_out)
    }

    /// Scroll-wheel zoom at the pointer. Positive `delta_y` (scrolling down)
    /// zooms out.
    pub fn on_wheel(&mut self, anchor: Vec2, delta_y: f32) -> bool {
        if delta_y > 0.0 {
            self.zoom_at(anchor, self.zoom.wheel_factor)
        } else if delta_y < 0.0 {
            self.zoom_at(anchor, self.zoom.wheel_factor.recip())
        } else {
            false
        }
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.map(|i| self.graph.nodes[i].id.as_str())
    }

    /// Hover a node by id, or clear the hover with `None`. Unknown ids clear
    /// it too. Returns whether the hovered node changed.
    pub fn set_hover(&mut self, id: Option<&str>) -> bool {
        let next = id.and_then(|id| self.index.get(id).copied());
        if next == self.hovered {
            return false;
        }
        self.hovered = next;
        self.active.iter_mut().for_each(|a| *a = false);
        if let Some(hovered) = next {
            self.active[hovered] = true;
            for &n in &self.neighbors[hovered] {
                self.active[n] = true;
            }
        }
        true
    }

    /// Topmost node whose disc contains the screen point.
    pub fn node_at(&self, point: Vec2) -> Option<&str> {
        let logical = self.to_logical(point);
        let radius = self.layout.node_radius;
        self.positions
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, p)| p.distance(logical) <= radius)
            .min_by(|(_, a), (_, b)| a.distance(logical).total_cmp(&b.distance(logical)))
            .map(|(i, _)| self.graph.nodes[i].id.as_str())
    }

    pub fn node_highlight(&self, index: usize) -> NodeHighlight {
        match self.hovered {
            None => NodeHighlight::Neutral,
            Some(h) if h == index => NodeHighlight::Hovered,
            Some(_) if self.active[index] => NodeHighlight::Connected,
            Some(_) => NodeHighlight::Dimmed,
        }
    }

    fn edge_highlight(&self, edge: &ResolvedEdge) -> EdgeHighlight {
        match self.hovered {
            None => EdgeHighlight::Neutral,
            Some(h) if edge.from == h || edge.to == h => EdgeHighlight::Emphasized,
            Some(_) => EdgeHighlight::Dimmed,
        }
    }

    /// Screen-space geometry for the current transform and hover state.
    pub fn geometry(&self) -> ViewportGeometry<'_> {
        let dimmed = self.highlight.dimmed_opacity;
        let nodes = self
            .graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let highlight = self.node_highlight(i);
                NodeGeometry {
                    id: &node.id,
                    label: &node.label,
                    group: node.group.as_deref(),
                    position: self.to_screen(self.positions[i]),
                    highlight,
                    opacity: highlight.opacity(dimmed),
                }
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|resolved| {
                let edge = &self.graph.edges[resolved.edge];
                let highlight = self.edge_highlight(resolved);
                EdgeGeometry {
                    from: &edge.from,
                    to: &edge.to,
                    label: edge.label.as_deref(),
                    start: self.to_screen(self.positions[resolved.from]),
                    end: self.to_screen(self.positions[resolved.to]),
                    highlight,
                    opacity: highlight.opacity(dimmed),
                }
            })
            .collect();
        ViewportGeometry { nodes, edges }
    }
}

fn usable_zoom(zoom: &ZoomConfig) -> ZoomConfig {
    match zoom.validate() {
        Ok(()) => *zoom,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid zoom settings, using defaults");
            ZoomConfig::default()
        },
    }
}

fn sanitize_screen(screen: Vec2) -> Vec2 {
    if screen.is_finite() && screen.cmpgt(Vec2::ZERO).all() {
        screen
    } else {
        tracing::warn!(?screen, "Invalid screen size, falling back to 1x1");
        Vec2::ONE
    }
}
