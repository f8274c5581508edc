use serde::Deserialize;
use serde_json::Value;

use super::graph::{EdgeKind, GraphEdge, GraphNode, GraphSnapshot, HierarchyTree};

#[derive(Clone, Debug, Deserialize)]
struct RawNode {
    id: String,
    #[serde(default, alias = "label")]
    name: String,
    #[serde(default, rename = "parentId", alias = "parent")]
    parent_id: Option<String>,
    #[serde(default)]
    children: Vec<RawNode>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawHierarchy {
    Nested(RawNode),
    Flat(Vec<RawNode>),
}

#[derive(Clone, Debug, Deserialize)]
struct RawEdge {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "start")]
    source: String,
    #[serde(alias = "end")]
    target: String,
    #[serde(default)]
    weight: Option<f32>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default, alias = "nodeTree")]
    hierarchy: Option<RawHierarchy>,
    #[serde(default, rename = "outsideNodes", alias = "nodesOutsideAbstraction")]
    outside_nodes: Vec<RawNode>,
    #[serde(default, rename = "outsideEdges", alias = "edgesOutsideAbstraction")]
    outside_edges: Vec<RawEdge>,
    #[serde(default, rename = "hierarchyEdges", alias = "edgesBelowAbstraction")]
    hierarchy_edges: Vec<RawEdge>,
}

fn flatten_nested(root: RawNode) -> Vec<GraphNode> {
    let mut nodes = Vec::new();
    let mut stack = vec![(root, None::<String>)];

    while let Some((raw, parent_id)) = stack.pop() {
        let RawNode {
            id, name, children, ..
        } = raw;

        for child in children.into_iter().rev() {
            stack.push((child, Some(id.clone())));
        }

        nodes.push(GraphNode::hierarchy(id, name, parent_id.as_deref()));
    }

    nodes
}

fn flatten_flat(raw_nodes: Vec<RawNode>) -> Vec<GraphNode> {
    raw_nodes
        .into_iter()
        .map(|raw| GraphNode::hierarchy(raw.id, raw.name, raw.parent_id.as_deref()))
        .collect()
}

fn convert_edge(raw: RawEdge, kind: EdgeKind) -> GraphEdge {
    GraphEdge {
        id: raw.id,
        source: raw.source,
        target: raw.target,
        weight: raw.weight.filter(|weight| weight.is_finite()),
        kind,
    }
}

impl From<RawSnapshot> for GraphSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        let hierarchy_nodes = match raw.hierarchy {
            Some(RawHierarchy::Nested(root)) => flatten_nested(root),
            Some(RawHierarchy::Flat(nodes)) => flatten_flat(nodes),
            None => Vec::new(),
        };

        let outside_nodes = raw
            .outside_nodes
            .into_iter()
            .map(|node| GraphNode::outside(node.id, node.name))
            .collect();

        Self {
            hierarchy: HierarchyTree::new(hierarchy_nodes),
            outside_nodes,
            outside_edges: raw
                .outside_edges
                .into_iter()
                .map(|edge| convert_edge(edge, EdgeKind::Outside))
                .collect(),
            hierarchy_edges: raw
                .hierarchy_edges
                .into_iter()
                .map(|edge| convert_edge(edge, EdgeKind::WithinHierarchy))
                .collect(),
        }
    }
}

impl GraphSnapshot {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawSnapshot>(raw).map(Self::from)
    }

    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value::<RawSnapshot>(value).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_tree_flattens_in_preorder_with_parents() {
        let snapshot = GraphSnapshot::from_value(json!({
            "nodeTree": {
                "id": "R", "name": "Root",
                "children": [
                    { "id": "A", "name": "a", "children": [ { "id": "A1", "name": "a1" } ] },
                    { "id": "B", "name": "b" }
                ]
            }
        }))
        .unwrap();

        let ids = snapshot
            .hierarchy
            .nodes()
            .iter()
            .map(|node| node.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["R", "A", "A1", "B"]);

        let a1 = snapshot.node("A1").unwrap();
        assert_eq!(a1.parent_id.as_deref(), Some("A"));
        assert!(a1.in_hierarchy);
        assert_eq!(snapshot.node("R").unwrap().parent_id, None);
    }

    #[test]
    fn flat_hierarchy_and_edge_aliases() {
        let snapshot = GraphSnapshot::from_value(json!({
            "hierarchy": [
                { "id": "R", "name": "root" },
                { "id": "A", "name": "a", "parentId": "R" }
            ],
            "nodesOutsideAbstraction": [ { "id": "X", "name": "x" } ],
            "edgesOutsideAbstraction": [ { "id": "e1", "start": "X", "end": "A", "weight": 2.0 } ],
            "hierarchyEdges": [ { "source": "A", "target": "R" } ]
        }))
        .unwrap();

        assert_eq!(snapshot.hierarchy.len(), 2);
        assert_eq!(snapshot.outside_nodes[0].id, "X");
        assert!(!snapshot.outside_nodes[0].in_hierarchy);

        let edge = &snapshot.outside_edges[0];
        assert_eq!((edge.source.as_str(), edge.target.as_str()), ("X", "A"));
        assert_eq!(edge.weight, Some(2.0));
        assert_eq!(edge.kind, EdgeKind::Outside);
        assert_eq!(snapshot.hierarchy_edges[0].kind, EdgeKind::WithinHierarchy);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot = GraphSnapshot::from_json("{}").unwrap();
        assert!(snapshot.hierarchy.is_empty());
        assert!(snapshot.outside_nodes.is_empty());
    }
}
