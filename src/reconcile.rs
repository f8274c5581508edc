//! One lookup from node id to display position.
//!
//! Precedence, identical for nodes and edge endpoints: the dragged node's live
//! pointer position, then the tree position of hierarchy nodes, then the
//! simulated position.

use std::collections::HashMap;

use eframe::egui::{Rect, Vec2};

use crate::data::{EdgeKind, GraphEdge, GraphNode, NodeId};
use crate::drag::DraggedElement;
use crate::physics::Simulation;
use crate::tree::TreeLayout;

/// Which position source won for a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    Dragged,
    Tree,
    Simulation,
    /// No source had a finite position; the node's last known position (or the origin) is used.
    Fallback,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkShape {
    /// Both ends share a depth.
    Arc,
    /// Horizontal cubic between different depths.
    Curve,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodePlacement {
    pub id: NodeId,
    pub label: String,
    pub position: Vec2,
    pub radius: f32,
    pub depth: Option<usize>,
    pub in_hierarchy: bool,
    pub authority: Authority,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEdge {
    pub key: String,
    pub source: NodeId,
    pub target: NodeId,
    pub from: Vec2,
    pub to: Vec2,
    pub kind: EdgeKind,
    pub weight: Option<f32>,
    pub shape: LinkShape,
}

fn finite(position: Vec2) -> Option<Vec2> {
    (position.x.is_finite() && position.y.is_finite()).then_some(position)
}

/// The precedence rule itself. `None` only when no source knows the node.
pub fn resolve_position(
    node_id: &str,
    dragged: Option<&DraggedElement>,
    tree: &TreeLayout,
    simulation: &Simulation,
) -> Option<(Vec2, Authority)> {
    dragged
        .filter(|dragged| dragged.node_id == node_id)
        .and_then(|dragged| finite(dragged.position))
        .map(|position| (position, Authority::Dragged))
        .or_else(|| {
            tree.placement(node_id)
                .and_then(|placement| finite(placement.position))
                .map(|position| (position, Authority::Tree))
        })
        .or_else(|| {
            simulation
                .position(node_id)
                .and_then(finite)
                .map(|position| (position, Authority::Simulation))
        })
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionMap {
    nodes: Vec<NodePlacement>,
    index_by_id: HashMap<NodeId, usize>,
}

impl PositionMap {
    pub fn build<'a>(
        nodes: impl IntoIterator<Item = &'a GraphNode>,
        dragged: Option<&DraggedElement>,
        tree: &TreeLayout,
        simulation: &Simulation,
    ) -> Self {
        let mut map = Self::default();
        for node in nodes {
            if map.index_by_id.contains_key(&node.id) {
                continue;
            }

            let (position, authority) = resolve_position(&node.id, dragged, tree, simulation)
                .unwrap_or_else(|| {
                    (
                        finite(node.position).unwrap_or(Vec2::ZERO),
                        Authority::Fallback,
                    )
                });

            map.index_by_id.insert(node.id.clone(), map.nodes.len());
            map.nodes.push(NodePlacement {
                id: node.id.clone(),
                label: node.label.clone(),
                position,
                radius: node.radius,
                depth: tree.placement(&node.id).map(|placement| placement.depth),
                in_hierarchy: node.in_hierarchy,
                authority,
            });
        }
        map
    }

    pub fn get(&self, id: &str) -> Option<&NodePlacement> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn position(&self, id: &str) -> Option<Vec2> {
        self.get(id).map(|placement| placement.position)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodePlacement> + '_ {
        self.nodes.iter()
    }

    pub fn into_nodes(self) -> Vec<NodePlacement> {
        self.nodes
    }

    /// Extent of the node discs, radius included.
    pub fn bounds(&self) -> Option<Rect> {
        let mut iter = self.nodes.iter();
        let first = iter.next()?;
        let mut rect =
            Rect::from_center_size(first.position.to_pos2(), Vec2::splat(first.radius * 2.0));
        for node in iter {
            rect = rect.union(Rect::from_center_size(
                node.position.to_pos2(),
                Vec2::splat(node.radius * 2.0),
            ));
        }
        Some(rect)
    }

    /// Resolves both endpoints of every edge through this map. Edges with an
    /// endpoint outside the map are left out and returned separately.
    pub fn resolve_edges<'a>(
        &self,
        edges: impl IntoIterator<Item = &'a GraphEdge>,
    ) -> (Vec<ResolvedEdge>, Vec<&'a GraphEdge>) {
        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();

        for edge in edges {
            match (self.get(&edge.source), self.get(&edge.target)) {
                (Some(source), Some(target)) => {
                    let shape = if source.depth == target.depth {
                        LinkShape::Arc
                    } else {
                        LinkShape::Curve
                    };
                    resolved.push(ResolvedEdge {
                        key: edge.key(),
                        source: source.id.clone(),
                        target: target.id.clone(),
                        from: source.position,
                        to: target.position,
                        kind: edge.kind,
                        weight: edge.weight,
                        shape,
                    });
                }
                _ => unresolved.push(edge),
            }
        }

        (resolved, unresolved)
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::config::{SimulationConfig, TreeLayoutConfig};
    use crate::data::HierarchyTree;
    use crate::tree::layout_tree;

    struct Fixture {
        nodes: Vec<GraphNode>,
        tree: TreeLayout,
        simulation: Simulation,
    }

    fn fixture() -> Fixture {
        let hierarchy = HierarchyTree::new(vec![
            GraphNode::hierarchy("R", "root", None),
            GraphNode::hierarchy("A", "a", Some("R")),
        ]);
        let tree = layout_tree(&hierarchy, &TreeLayoutConfig::default()).unwrap();

        let outside = vec![GraphNode::outside("X", "x")];
        let mut simulation = Simulation::new(SimulationConfig::default());
        simulation.sync(
            tree.iter().map(|(id, placement)| (id, placement.position)),
            &outside,
            &[GraphEdge::outside("X", "A")],
        );
        simulation.advance(20);

        let nodes = hierarchy.nodes().iter().cloned().chain(outside).collect();
        Fixture {
            nodes,
            tree,
            simulation,
        }
    }

    #[test]
    fn tree_and_simulation_fill_their_own_nodes() {
        let fixture = fixture();
        let map = PositionMap::build(&fixture.nodes, None, &fixture.tree, &fixture.simulation);

        let a = map.get("A").unwrap();
        assert_eq!(a.authority, Authority::Tree);
        assert_eq!(a.position, vec2(100.0, 0.0));
        assert_eq!(a.depth, Some(1));

        let x = map.get("X").unwrap();
        assert_eq!(x.authority, Authority::Simulation);
        assert_eq!(Some(x.position), fixture.simulation.position("X"));
        assert_eq!(x.depth, None);
    }

    #[test]
    fn drag_wins_for_nodes_and_edge_endpoints() {
        let fixture = fixture();
        let dragged = DraggedElement {
            node_id: "X".to_owned(),
            position: vec2(50.0, 50.0),
            origin: Vec2::ZERO,
        };
        let map = PositionMap::build(
            &fixture.nodes,
            Some(&dragged),
            &fixture.tree,
            &fixture.simulation,
        );
        assert_eq!(map.position("X"), Some(vec2(50.0, 50.0)));
        assert_eq!(map.get("X").unwrap().authority, Authority::Dragged);

        let edge = GraphEdge::outside("X", "A");
        let (edges, unresolved) = map.resolve_edges([&edge]);
        assert!(unresolved.is_empty());
        assert_eq!(edges[0].from, vec2(50.0, 50.0));
        assert_eq!(edges[0].to, vec2(100.0, 0.0));
        assert_eq!(edges[0].shape, LinkShape::Curve);
    }

    #[test]
    fn unknown_endpoints_are_left_out() {
        let fixture = fixture();
        let map = PositionMap::build(&fixture.nodes, None, &fixture.tree, &fixture.simulation);

        let edges = [GraphEdge::outside("X", "A"), GraphEdge::outside("X", "gone")];
        let (resolved, unresolved) = map.resolve_edges(&edges);
        assert_eq!(resolved.len(), 1);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].target, "gone");
    }

    #[test]
    fn unknown_nodes_still_get_a_finite_position() {
        let fixture = fixture();
        let mut stray = GraphNode::outside("S", "stray");
        stray.position = vec2(f32::NAN, 1.0);

        let map = PositionMap::build([&stray], None, &fixture.tree, &fixture.simulation);
        let placement = map.get("S").unwrap();
        assert_eq!(placement.authority, Authority::Fallback);
        assert_eq!(placement.position, Vec2::ZERO);
    }

    #[test]
    fn same_depth_edges_are_arcs() {
        let fixture = fixture();
        let map = PositionMap::build(&fixture.nodes, None, &fixture.tree, &fixture.simulation);
        let edge = GraphEdge::outside("A", "A");
        let (edges, _) = map.resolve_edges([&edge]);
        assert_eq!(edges[0].shape, LinkShape::Arc);
    }
}
