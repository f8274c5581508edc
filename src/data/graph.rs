use std::collections::HashSet;

use eframe::egui::Vec2;

pub type NodeId = String;

pub const DEFAULT_NODE_RADIUS: f32 = 6.0;

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    pub in_hierarchy: bool,
    pub parent_id: Option<NodeId>,
    pub position: Vec2,
    /// Set for hierarchy nodes once the tree has been laid out.
    pub fixed_position: Option<Vec2>,
    pub radius: f32,
}

impl GraphNode {
    pub fn outside(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            in_hierarchy: false,
            parent_id: None,
            position: Vec2::ZERO,
            fixed_position: None,
            radius: DEFAULT_NODE_RADIUS,
        }
    }

    pub fn hierarchy(
        id: impl Into<NodeId>,
        label: impl Into<String>,
        parent_id: Option<&str>,
    ) -> Self {
        Self {
            in_hierarchy: true,
            parent_id: parent_id.map(str::to_owned),
            ..Self::outside(id, label)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Parent to child link implied by the hierarchy itself.
    TreeLink,
    /// Explicit edge whose endpoints both sit inside the hierarchy.
    WithinHierarchy,
    /// Edge touching at least one node outside the hierarchy.
    Outside,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
    pub id: Option<String>,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: Option<f32>,
    pub kind: EdgeKind,
}

impl GraphEdge {
    pub fn outside(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
            weight: None,
            kind: EdgeKind::Outside,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn key(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}->{}", self.source, self.target))
    }
}

/// Hierarchy nodes in input order. Structural validity is checked when the tree is laid out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HierarchyTree {
    nodes: Vec<GraphNode>,
}

impl HierarchyTree {
    pub fn new(nodes: Vec<GraphNode>) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|mut node| {
                node.in_hierarchy = true;
                node
            })
            .collect();
        Self { nodes }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }
}

/// One full replacement of the graph as supplied by the data layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphSnapshot {
    pub hierarchy: HierarchyTree,
    pub outside_nodes: Vec<GraphNode>,
    pub outside_edges: Vec<GraphEdge>,
    pub hierarchy_edges: Vec<GraphEdge>,
}

impl GraphSnapshot {
    pub fn node_ids(&self) -> HashSet<&str> {
        self.hierarchy
            .nodes()
            .iter()
            .chain(self.outside_nodes.iter())
            .map(|node| node.id.as_str())
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.hierarchy
            .nodes()
            .iter()
            .chain(self.outside_nodes.iter())
            .find(|node| node.id == id)
    }

    pub fn with_node_radius(mut self, radius: f32) -> Self {
        for node in self
            .hierarchy
            .nodes
            .iter_mut()
            .chain(self.outside_nodes.iter_mut())
        {
            node.radius = radius;
        }
        self
    }
}
