use std::fmt;

/// Why a hierarchy could not be laid out as a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HierarchyDefect {
    MissingRoot,
    MultipleRoots(Vec<String>),
    Cycle(Vec<String>),
    UnknownParent { node_id: String, parent_id: String },
    DuplicateNode(String),
}

impl fmt::Display for HierarchyDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot => write!(f, "hierarchy has no root"),
            Self::MultipleRoots(roots) => {
                write!(f, "hierarchy has {} roots: {}", roots.len(), roots.join(", "))
            }
            Self::Cycle(members) => {
                write!(f, "hierarchy contains a cycle through: {}", members.join(", "))
            }
            Self::UnknownParent { node_id, parent_id } => {
                write!(f, "node {node_id} names unknown parent {parent_id}")
            }
            Self::DuplicateNode(id) => write!(f, "node {id} appears more than once"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("malformed hierarchy: {0}")]
    MalformedHierarchy(HierarchyDefect),
    #[error("edge {source_id} -> {target_id} references an unknown node")]
    UnresolvedEdgeEndpoint { source_id: String, target_id: String },
    #[error("drag target {node_id} is not a node in the current graph")]
    InvalidDragTarget { node_id: String },
}

impl GraphError {
    pub fn unresolved_edge(source: &str, target: &str) -> Self {
        Self::UnresolvedEdgeEndpoint {
            source_id: source.to_owned(),
            target_id: target.to_owned(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// Rejected engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config field {field} = {value} {requirement}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        requirement: &'static str,
    },
    #[error("config field {low_field} ({low}) must not exceed {high_field} ({high})")]
    Inverted {
        low_field: &'static str,
        low: f32,
        high_field: &'static str,
        high: f32,
    },
}
