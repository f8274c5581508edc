//! Frame driver tying the layout components together.
//!
//! The engine never runs on its own. The caller hands it snapshots with
//! [`GraphEngine::ingest`], advances it with [`GraphEngine::tick`] and reads a
//! [`RenderFrame`] whenever it paints.

use eframe::egui::{Pos2, Rect, Vec2};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::data::{EdgeKind, GraphEdge, GraphNode, GraphSnapshot, HierarchyTree, NodeId};
use crate::drag::{DragController, DraggedElement};
use crate::error::{GraphError, Result};
use crate::physics::Simulation;
use crate::reconcile::{NodePlacement, PositionMap, ResolvedEdge};
use crate::tree::{TreeLayout, layout_tree};
use crate::zoom::{ViewTransform, ZoomController};

/// Flags owned by the host application and passed through untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderFlags {
    /// Include outside nodes and their edges in frames. Simulation runs either way.
    pub show_links: bool,
    /// New data is on its way; skip all recomputation.
    pub is_loading: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self {
            show_links: true,
            is_loading: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IntakeOutcome {
    /// Loading gate was set; nothing changed.
    Skipped,
    Applied {
        /// The simulation was revived by this snapshot.
        material: bool,
        settle_steps: usize,
        dropped_edges: usize,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub nodes: usize,
    pub edges: usize,
    pub dropped_edges: usize,
    pub alpha: f32,
    pub settled: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderFrame {
    pub nodes: Vec<NodePlacement>,
    pub edges: Vec<ResolvedEdge>,
    pub transform: ViewTransform,
    pub dragged: Option<DraggedElement>,
    /// Set when the last snapshot was rejected; the frame is then empty.
    pub error: Option<GraphError>,
    pub stats: FrameStats,
}

impl RenderFrame {
    /// Nearest node in this frame whose disc contains `world`.
    pub fn node_at(&self, world: Vec2) -> Option<&NodePlacement> {
        nearest_node(&self.nodes, world)
    }
}

fn nearest_node<'a>(
    nodes: impl IntoIterator<Item = &'a NodePlacement>,
    world: Vec2,
) -> Option<&'a NodePlacement> {
    nodes
        .into_iter()
        .filter_map(|node| {
            let distance = (node.position - world).length();
            (distance <= node.radius).then_some((node, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(node, _)| node)
}

type NodeClickHandler = Box<dyn FnMut(&str)>;

pub struct GraphEngine {
    config: EngineConfig,
    flags: RenderFlags,
    snapshot: GraphSnapshot,
    tree: TreeLayout,
    simulation: Simulation,
    drag: DragController,
    zoom: ZoomController,
    error: Option<GraphError>,
    on_node_click: Option<NodeClickHandler>,
}

impl GraphEngine {
    pub fn new(config: EngineConfig) -> Self {
        let simulation = Simulation::new(config.simulation.clone());
        let zoom = ZoomController::new(config.zoom.clone());
        Self {
            config,
            flags: RenderFlags::default(),
            snapshot: GraphSnapshot::default(),
            tree: TreeLayout::default(),
            simulation,
            drag: DragController::new(),
            zoom,
            error: None,
            on_node_click: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn flags(&self) -> RenderFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: RenderFlags) {
        self.flags = flags;
    }

    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    pub fn tree(&self) -> &TreeLayout {
        &self.tree
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn drag_state(&self) -> Option<&DraggedElement> {
        self.drag.state()
    }

    pub fn error(&self) -> Option<&GraphError> {
        self.error.as_ref()
    }

    pub fn zoom(&self) -> &ZoomController {
        &self.zoom
    }

    pub fn zoom_mut(&mut self) -> &mut ZoomController {
        &mut self.zoom
    }

    /// Installs the navigation callback fired by [`GraphEngine::click_node`].
    pub fn set_on_node_click(&mut self, handler: impl FnMut(&str) + 'static) {
        self.on_node_click = Some(Box::new(handler));
    }

    /// Replaces the graph with `snapshot`. A malformed hierarchy empties the graph
    /// and is returned to the caller; unresolved edges are only logged.
    pub fn ingest(&mut self, snapshot: GraphSnapshot, flags: RenderFlags) -> Result<IntakeOutcome> {
        self.flags = flags;
        if flags.is_loading {
            debug!("loading; snapshot ignored");
            return Ok(IntakeOutcome::Skipped);
        }

        let mut snapshot = snapshot.with_node_radius(self.config.node_radius);
        let tree = if snapshot.hierarchy.is_empty() {
            Ok(TreeLayout::default())
        } else {
            layout_tree(&snapshot.hierarchy, &self.config.tree)
        };

        let tree = match tree {
            Ok(tree) => tree,
            Err(error) => {
                warn!(%error, "rejecting snapshot");
                self.clear();
                self.error = Some(error.clone());
                return Err(error);
            }
        };

        apply_tree_positions(&mut snapshot, &tree);
        let report = self.simulation.sync(
            tree.iter().map(|(id, placement)| (id, placement.position)),
            &snapshot.outside_nodes,
            &snapshot.outside_edges,
        );
        self.drag.retain(&mut self.simulation);

        let mut dropped_edges = report.dropped_links.len();
        for edge in &snapshot.hierarchy_edges {
            if !tree.contains(&edge.source) || !tree.contains(&edge.target) {
                let error = GraphError::unresolved_edge(&edge.source, &edge.target);
                warn!(%error, "dropping hierarchy edge");
                dropped_edges += 1;
            }
        }

        let settle_steps = if report.is_material() {
            let steps = self.simulation.advance(self.config.settle_iterations);
            debug!(steps, alpha = self.simulation.alpha(), "pre-settled layout");
            steps
        } else {
            0
        };

        self.sync_outside_positions(&mut snapshot);
        self.snapshot = snapshot;
        self.tree = tree;
        self.error = None;

        Ok(IntakeOutcome::Applied {
            material: report.is_material(),
            settle_steps,
            dropped_edges,
        })
    }

    fn clear(&mut self) {
        self.drag.end(&mut self.simulation);
        self.simulation.sync(std::iter::empty(), &[], &[]);
        self.snapshot = GraphSnapshot::default();
        self.tree = TreeLayout::default();
    }

    fn sync_outside_positions(&self, snapshot: &mut GraphSnapshot) {
        for node in &mut snapshot.outside_nodes {
            if let Some(position) = self.simulation.position(&node.id) {
                node.position = position;
            }
        }
    }

    /// Advances the simulation and any zoom animation by one frame. Returns whether
    /// another frame is wanted.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.flags.is_loading {
            return false;
        }

        let animating = self.zoom.tick(dt);
        let idle = self.simulation.is_settled() && !self.drag.is_active();
        let simulating = if idle || self.simulation.free_body_count() == 0 {
            false
        } else {
            self.simulation.step();
            !self.simulation.is_settled() || self.drag.is_active()
        };
        animating || simulating
    }

    /// Runs up to `steps` simulation ticks, stopping once settled.
    pub fn advance(&mut self, steps: usize) -> usize {
        if self.flags.is_loading {
            return 0;
        }
        self.simulation.advance(steps)
    }

    fn visible_nodes(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        let outside: &[GraphNode] = if self.flags.show_links {
            &self.snapshot.outside_nodes
        } else {
            &[]
        };
        self.snapshot.hierarchy.nodes().iter().chain(outside)
    }

    fn position_map(&self) -> PositionMap {
        PositionMap::build(
            self.visible_nodes(),
            self.drag.state(),
            &self.tree,
            &self.simulation,
        )
    }

    fn visible_edges(&self) -> Vec<GraphEdge> {
        let mut edges = self
            .tree
            .links()
            .iter()
            .map(|(parent, child)| GraphEdge {
                id: None,
                source: parent.clone(),
                target: child.clone(),
                weight: None,
                kind: EdgeKind::TreeLink,
            })
            .collect::<Vec<_>>();
        edges.extend(self.snapshot.hierarchy_edges.iter().cloned());
        if self.flags.show_links {
            edges.extend(self.snapshot.outside_edges.iter().cloned());
        }
        edges
    }

    /// The reconciled view of the graph for one paint.
    pub fn frame(&self) -> RenderFrame {
        let transform = self.zoom.transform();
        if let Some(error) = &self.error {
            return RenderFrame {
                transform,
                error: Some(error.clone()),
                ..RenderFrame::default()
            };
        }

        let map = self.position_map();
        let edges = self.visible_edges();
        let (resolved, unresolved) = map.resolve_edges(&edges);
        let nodes = map.into_nodes();

        RenderFrame {
            stats: FrameStats {
                nodes: nodes.len(),
                edges: resolved.len(),
                dropped_edges: unresolved.len(),
                alpha: self.simulation.alpha(),
                settled: self.simulation.is_settled(),
            },
            nodes,
            edges: resolved,
            transform,
            dragged: self.drag.state().cloned(),
            error: None,
        }
    }

    /// Nearest visible node whose disc contains `world`.
    pub fn node_at(&self, world: Vec2) -> Option<NodeId> {
        nearest_node(self.position_map().iter(), world).map(|node| node.id.clone())
    }

    pub fn node_at_screen(&self, screen: Pos2) -> Option<NodeId> {
        self.node_at(self.zoom.screen_to_world(screen))
    }

    /// Starts dragging `node_id` with the pointer at `world`. Unknown ids are logged and ignored.
    pub fn begin_drag(&mut self, node_id: &str, world: Vec2) -> bool {
        if self.flags.is_loading {
            return false;
        }
        match self.drag.begin(node_id, world, &mut self.simulation) {
            Ok(started) => {
                if started {
                    self.simulation.reheat(self.config.simulation.drag_alpha);
                }
                started
            }
            Err(error) => {
                warn!(%error, "ignoring drag gesture");
                false
            }
        }
    }

    pub fn drag_to(&mut self, world: Vec2) -> bool {
        let moved = self.drag.update(world, &mut self.simulation);
        if moved {
            self.simulation.reheat(self.config.simulation.drag_alpha);
        }
        moved
    }

    pub fn end_drag(&mut self) -> Option<DraggedElement> {
        let released = self.drag.end(&mut self.simulation)?;
        if let Some(node) = self
            .snapshot
            .outside_nodes
            .iter_mut()
            .find(|node| node.id == released.node_id)
        {
            node.position = released.position;
        }
        Some(released)
    }

    /// Forwards a click to the navigation callback. Ids not in the current graph are dropped.
    pub fn click_node(&mut self, node_id: &str) -> bool {
        if self.snapshot.node(node_id).is_none() {
            warn!(node_id, "click on unknown node ignored");
            return false;
        }
        match self.on_node_click.as_mut() {
            Some(handler) => {
                handler(node_id);
                true
            }
            None => false,
        }
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.zoom.set_viewport(viewport);
    }

    pub fn zoom_in(&mut self) {
        self.zoom.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.zoom_out();
    }

    pub fn zoom_at(&mut self, screen: Pos2, factor: f32) {
        self.zoom.zoom_at(screen, factor);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.zoom.pan_by(delta);
    }

    /// Fits every visible node into the viewport.
    pub fn zoom_fit(&mut self, animate: bool) {
        let bounds = self.position_map().bounds();
        self.zoom.zoom_fit(bounds, animate);
    }
}

fn apply_tree_positions(snapshot: &mut GraphSnapshot, tree: &TreeLayout) {
    let mut nodes = snapshot.hierarchy.nodes().to_vec();
    for node in &mut nodes {
        if let Some(placement) = tree.placement(&node.id) {
            node.position = placement.position;
            node.fixed_position = Some(placement.position);
        }
    }
    snapshot.hierarchy = HierarchyTree::new(nodes);
}
