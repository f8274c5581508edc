use eframe::egui::Vec2;
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::physics::Simulation;

/// The node currently held by the pointer and where it is being held.
#[derive(Clone, Debug, PartialEq)]
pub struct DraggedElement {
    pub node_id: String,
    pub position: Vec2,
    /// Position the node had when the gesture started.
    pub origin: Vec2,
}

/// Sole writer of the drag state. At most one gesture is active; a second `begin`
/// while one is running is ignored.
#[derive(Debug, Default)]
pub struct DragController {
    active: Option<DraggedElement>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Option<&DraggedElement> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_dragging(&self, node_id: &str) -> bool {
        self.active
            .as_ref()
            .is_some_and(|dragged| dragged.node_id == node_id)
    }

    /// Starts holding `node_id` at `pointer`. Returns `Ok(false)` when the node cannot be
    /// dragged (an anchor) or another drag is already running.
    pub fn begin(
        &mut self,
        node_id: &str,
        pointer: Vec2,
        simulation: &mut Simulation,
    ) -> Result<bool> {
        let Some(body) = simulation.body(node_id) else {
            return Err(GraphError::InvalidDragTarget {
                node_id: node_id.to_owned(),
            });
        };

        if let Some(active) = &self.active {
            debug!(active = %active.node_id, ignored = %node_id, "drag already in progress");
            return Ok(false);
        }
        if body.anchored {
            return Ok(false);
        }
        if !pointer.x.is_finite() || !pointer.y.is_finite() {
            return Ok(false);
        }

        let origin = body.position;
        simulation.pin(node_id, pointer);
        self.active = Some(DraggedElement {
            node_id: node_id.to_owned(),
            position: pointer,
            origin,
        });
        Ok(true)
    }

    /// Moves the held node to `pointer`. No-op without an active drag.
    pub fn update(&mut self, pointer: Vec2, simulation: &mut Simulation) -> bool {
        if !pointer.x.is_finite() || !pointer.y.is_finite() {
            return false;
        }
        let Some(active) = &mut self.active else {
            return false;
        };
        active.position = pointer;
        simulation.pin(&active.node_id, pointer);
        true
    }

    /// Lets go of the held node, which stays where it was dropped and rejoins the simulation.
    pub fn end(&mut self, simulation: &mut Simulation) -> Option<DraggedElement> {
        let released = self.active.take()?;
        simulation.release(&released.node_id);
        Some(released)
    }

    /// Drops the drag if its node left the simulation or became an anchor;
    /// otherwise re-applies the pin after a snapshot replacement.
    pub fn retain(&mut self, simulation: &mut Simulation) {
        let Some(active) = &self.active else {
            return;
        };

        let still_draggable = simulation
            .body(&active.node_id)
            .is_some_and(|body| !body.anchored);
        if still_draggable {
            simulation.pin(&active.node_id, active.position);
        } else {
            debug!(node_id = %active.node_id, "dragged node is gone; clearing drag");
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::config::SimulationConfig;
    use crate::data::{GraphEdge, GraphNode};

    fn simulation() -> Simulation {
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.sync(
            [("R", vec2(0.0, 0.0)), ("A", vec2(100.0, 0.0))],
            &[GraphNode::outside("X", "x"), GraphNode::outside("Y", "y")],
            &[GraphEdge::outside("X", "A")],
        );
        simulation
    }

    #[test]
    fn drag_pins_and_follows_the_pointer() {
        let mut simulation = simulation();
        let mut drag = DragController::new();

        assert!(drag.begin("X", vec2(50.0, 50.0), &mut simulation).unwrap());
        simulation.advance(10);
        assert_eq!(simulation.position("X"), Some(vec2(50.0, 50.0)));

        assert!(drag.update(vec2(-20.0, 5.0), &mut simulation));
        simulation.step();
        assert_eq!(drag.state().unwrap().position, vec2(-20.0, 5.0));
        assert_eq!(simulation.position("X"), Some(vec2(-20.0, 5.0)));
    }

    #[test]
    fn ending_releases_the_body_where_it_was_dropped() {
        let mut simulation = simulation();
        let mut drag = DragController::new();
        drag.begin("X", vec2(50.0, 50.0), &mut simulation).unwrap();

        let released = drag.end(&mut simulation).unwrap();
        assert_eq!(released.position, vec2(50.0, 50.0));
        assert!(drag.state().is_none());

        let body = simulation.body("X").unwrap();
        assert!(body.is_free());
        assert_eq!(body.position, vec2(50.0, 50.0));
    }

    #[test]
    fn second_drag_is_ignored() {
        let mut simulation = simulation();
        let mut drag = DragController::new();
        drag.begin("X", vec2(1.0, 1.0), &mut simulation).unwrap();

        assert!(!drag.begin("Y", vec2(2.0, 2.0), &mut simulation).unwrap());
        assert!(drag.is_dragging("X"));
        assert!(simulation.body("Y").unwrap().is_free());
    }

    #[test]
    fn anchors_and_unknown_nodes_are_rejected() {
        let mut simulation = simulation();
        let mut drag = DragController::new();

        assert!(!drag.begin("A", vec2(0.0, 0.0), &mut simulation).unwrap());
        assert_eq!(
            drag.begin("ghost", vec2(0.0, 0.0), &mut simulation),
            Err(GraphError::InvalidDragTarget {
                node_id: "ghost".to_owned()
            })
        );
        assert!(!drag.is_active());
    }

    #[test]
    fn retain_clears_a_drag_whose_node_disappeared() {
        let mut simulation = simulation();
        let mut drag = DragController::new();
        drag.begin("Y", vec2(3.0, 3.0), &mut simulation).unwrap();

        simulation.sync(
            [("R", vec2(0.0, 0.0)), ("A", vec2(100.0, 0.0))],
            &[GraphNode::outside("X", "x")],
            &[GraphEdge::outside("X", "A")],
        );
        drag.retain(&mut simulation);
        assert!(!drag.is_active());
    }

    #[test]
    fn retain_keeps_a_drag_whose_node_survived() {
        let mut simulation = simulation();
        let mut drag = DragController::new();
        drag.begin("X", vec2(3.0, 3.0), &mut simulation).unwrap();

        simulation.sync(
            [("R", vec2(0.0, 0.0)), ("A", vec2(100.0, 0.0))],
            &[GraphNode::outside("X", "x"), GraphNode::outside("Z", "z")],
            &[GraphEdge::outside("X", "A")],
        );
        drag.retain(&mut simulation);
        simulation.advance(5);

        assert!(drag.is_dragging("X"));
        assert_eq!(simulation.position("X"), Some(vec2(3.0, 3.0)));
    }
}
