//! Layout and interaction engine for a graph that mixes a fixed tidy tree with
//! force-directed nodes linked to it.

pub mod config;
pub mod data;
pub mod drag;
pub mod engine;
pub mod error;
pub mod physics;
pub mod reconcile;
pub mod tree;
pub mod util;
pub mod zoom;

pub use config::{EngineConfig, SimulationConfig, TreeLayoutConfig, TreeOrientation, ZoomConfig};
pub use data::{EdgeKind, GraphEdge, GraphNode, GraphSnapshot, HierarchyTree, NodeId};
pub use drag::{DragController, DraggedElement};
pub use engine::{FrameStats, GraphEngine, IntakeOutcome, RenderFlags, RenderFrame};
pub use error::{ConfigError, GraphError, HierarchyDefect, Result};
pub use physics::{Body, BodySeed, Simulation, SyncReport};
pub use reconcile::{Authority, LinkShape, NodePlacement, PositionMap, ResolvedEdge};
pub use tree::{TreeLayout, TreePlacement, layout_tree};
pub use zoom::{ViewTransform, ZoomController, bounds_of};
