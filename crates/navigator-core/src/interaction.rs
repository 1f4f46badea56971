use std::collections::HashSet;

use glam::Vec2;

use crate::viewport::GraphViewport;

/// Pointer travel, in pixels, below which a press-release counts as a click.
pub const CLICK_SLOP: f32 = 4.0;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Translates raw pointer events into viewport pans, zooms and hovers.
///
/// Dragging with the left button pans; moving without a button held hovers
/// whatever node is under the cursor.
#[derive(Debug, Default)]
pub struct PointerController {
    /// Mouse buttons currently held.
    buttons: HashSet<MouseButton>,
    /// Cursor position in CSS pixels relative to the canvas.
    cursor: Vec2,
    /// Total travel since the left button went down.
    drag_distance: f32,
}

impl PointerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    /// True once the left button has travelled past [`CLICK_SLOP`].
    pub fn is_dragging(&self) -> bool {
        self.is_mouse_down(MouseButton::Left) && self.drag_distance > CLICK_SLOP
    }

    pub fn on_mouse_down(&mut self, button: MouseButton, at: Vec2) {
        self.cursor = at;
        if self.buttons.insert(button) && button == MouseButton::Left {
            self.drag_distance = 0.0;
        }
    }

    pub fn on_mouse_move(&mut self, viewport: &mut GraphViewport, at: Vec2) {
        let delta = at - self.cursor;
        self.cursor = at;
        if self.is_mouse_down(MouseButton::Left) {
            self.drag_distance += delta.length();
            viewport.pan(delta.x, delta.y);
            return;
        }
        let hit = viewport.node_at(at).map(str::to_owned);
        viewport.set_hover(hit.as_deref());
    }

    /// Release a button. Returns the clicked node's id when the left button
    /// went up without dragging over a node.
    pub fn on_mouse_up(
        &mut self,
        viewport: &mut GraphViewport,
        button: MouseButton,
        at: Vec2,
    ) -> Option<String> {
        let was_click = button == MouseButton::Left
            && self.buttons.contains(&button)
            && self.drag_distance <= CLICK_SLOP;
        self.buttons.remove(&button);
        self.cursor = at;
        self.drag_distance = 0.0;
        let hit = viewport.node_at(at).map(str::to_owned);
        viewport.set_hover(hit.as_deref());
        if was_click { hit } else { None }
    }

    /// Pointer left the canvas: end any drag and clear the hover.
    pub fn on_mouse_leave(&mut self, viewport: &mut GraphViewport) {
        self.buttons.clear();
        self.drag_distance = 0.0;
        viewport.set_hover(None);
    }

    pub fn on_wheel(&mut self, viewport: &mut GraphViewport, delta_y: f32) -> bool {
        viewport.on_wheel(self.cursor, delta_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, GraphEdge, GraphNode};

    fn viewport() -> GraphViewport {
        GraphViewport::new(
            Graph::new(
                vec![GraphNode::new("A", "Alpha"), GraphNode::new("B", "Beta")],
                vec![GraphEdge::new("A", "B")],
            ),
            Vec2::new(1000.0, 1000.0),
        )
    }

    fn screen_pos(viewport: &GraphViewport, id: &str) -> Vec2 {
        viewport.to_screen(viewport.node_position(id).unwrap())
    }

    #[test]
    fn hovering_follows_the_cursor() {
        let mut vp = viewport();
        let mut pointer = PointerController::new();
        let a = screen_pos(&vp, "A");

        pointer.on_mouse_move(&mut vp, a);
        assert_eq!(vp.hovered(), Some("A"));

        pointer.on_mouse_move(&mut vp, Vec2::new(500.0, 500.0));
        assert_eq!(vp.hovered(), None);
    }

    #[test]
    fn left_drag_pans() {
        let mut vp = viewport();
        let mut pointer = PointerController::new();
        let origin = vp.transform().origin;

        pointer.on_mouse_down(MouseButton::Left, Vec2::new(100.0, 100.0));
        pointer.on_mouse_move(&mut vp, Vec2::new(150.0, 120.0));
        assert!(pointer.is_dragging());
        let clicked = pointer.on_mouse_up(&mut vp, MouseButton::Left, Vec2::new(150.0, 120.0));

        assert_eq!(clicked, None);
        assert_eq!(vp.transform().origin, origin - Vec2::new(50.0, 20.0));
        assert!(!pointer.is_dragging());
    }

    #[test]
    fn click_on_node_reports_it() {
        let mut vp = viewport();
        let mut pointer = PointerController::new();
        let b = screen_pos(&vp, "B");

        pointer.on_mouse_down(MouseButton::Left, b);
        let clicked = pointer.on_mouse_up(&mut vp, MouseButton::Left, b);
        assert_eq!(clicked.as_deref(), Some("B"));
    }

    #[test]
    fn right_button_does_not_pan() {
        let mut vp = viewport();
        let mut pointer = PointerController::new();
        let origin = vp.transform().origin;

        pointer.on_mouse_down(MouseButton::Right, Vec2::new(10.0, 10.0));
        pointer.on_mouse_move(&mut vp, Vec2::new(200.0, 200.0));
        assert_eq!(vp.transform().origin, origin);
        assert!(pointer.is_mouse_down(MouseButton::Right));
    }

    #[test]
    fn leaving_clears_hover_and_drag() {
        let mut vp = viewport();
        let mut pointer = PointerController::new();
        let a = screen_pos(&vp, "A");
        pointer.on_mouse_move(&mut vp, a);
        pointer.on_mouse_down(MouseButton::Left, Vec2::ZERO);

        pointer.on_mouse_leave(&mut vp);
        assert_eq!(vp.hovered(), None);
        assert!(!pointer.is_mouse_down(MouseButton::Left));
    }

    #[test]
    fn wheel_zooms_at_cursor() {
        let mut vp = viewport();
        let mut pointer = PointerController::new();
        pointer.on_mouse_move(&mut vp, Vec2::new(250.0, 750.0));
        let pinned = vp.to_logical(pointer.cursor());

        assert!(pointer.on_wheel(&mut vp, -120.0));
        assert!(vp.transform().size.x < 1000.0);
        assert!((vp.to_screen(pinned) - Vec2::new(250.0, 750.0)).length() < 1e-2);
    }
}
