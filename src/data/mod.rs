mod graph;
mod parse;

pub use graph::{EdgeKind, GraphEdge, GraphNode, GraphSnapshot, HierarchyTree, NodeId};
