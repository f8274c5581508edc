//! Force-directed relaxation for the nodes outside the hierarchy.
//!
//! Hierarchy nodes enter as anchored bodies: they repel and hold springs like
//! any other body but never move. The simulation never ticks on its own; the
//! driver calls [`Simulation::step`] or [`Simulation::advance`].

mod forces;
mod quadtree;

use std::collections::{HashMap, HashSet};

use eframe::egui::Vec2;
use tracing::{debug, warn};

use crate::config::SimulationConfig;
use crate::data::{GraphEdge, GraphNode, NodeId};
use crate::error::GraphError;
use crate::util::{phyllotaxis, stable_jitter};
use forces::{ChargeParams, accumulate_charge_for_body, apply_centering, apply_springs};
use quadtree::QuadNode;

#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub id: NodeId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub anchored: bool,
    pinned: Option<Vec2>,
}

impl Body {
    fn new(seed: BodySeed) -> Self {
        Self {
            id: seed.id,
            position: seed.position,
            velocity: Vec2::ZERO,
            anchored: seed.anchored,
            pinned: None,
        }
    }

    pub fn pinned(&self) -> Option<Vec2> {
        self.pinned
    }

    /// Subject to forces: neither an anchor nor held by a drag.
    pub fn is_free(&self) -> bool {
        !self.anchored && self.pinned.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BodySeed {
    pub id: NodeId,
    pub position: Vec2,
    pub anchored: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Spring {
    source: usize,
    target: usize,
    strength: f32,
    bias: f32,
}

/// What a [`Simulation::sync`] call changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncReport {
    pub added: usize,
    pub removed: usize,
    pub anchors_moved: usize,
    pub links_changed: bool,
    pub dropped_links: Vec<(NodeId, NodeId)>,
}

impl SyncReport {
    /// New, removed or displaced bodies or a different spring set leave the layout unrelaxed.
    pub fn is_material(&self) -> bool {
        self.added > 0 || self.removed > 0 || self.anchors_moved > 0 || self.links_changed
    }

    pub fn unresolved_edges(&self) -> impl Iterator<Item = GraphError> + '_ {
        self.dropped_links
            .iter()
            .map(|(source, target)| GraphError::unresolved_edge(source, target))
    }
}

type LinkSignature = Vec<(NodeId, NodeId, Option<u32>)>;

pub struct Simulation {
    config: SimulationConfig,
    bodies: Vec<Body>,
    index_by_id: HashMap<NodeId, usize>,
    edges: Vec<GraphEdge>,
    springs: Vec<Spring>,
    alpha: f32,
    positions_scratch: Vec<Vec2>,
    velocity_scratch: Vec<Vec2>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        let alpha = config.alpha_max;
        Self {
            config,
            bodies: Vec::new(),
            index_by_id: HashMap::new(),
            edges: Vec::new(),
            springs: Vec::new(),
            alpha,
            positions_scratch: Vec::new(),
            velocity_scratch: Vec::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.config.alpha_min
    }

    /// Raises the energy back to its maximum.
    pub fn reset(&mut self) {
        self.alpha = self.config.alpha_max;
    }

    /// Lifts the energy to at least `alpha` so the other bodies react to a dragged one.
    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = self.alpha.max(alpha.min(self.config.alpha_max));
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.index_by_id.get(id).map(|&index| &self.bodies[index])
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn position(&self, id: &str) -> Option<Vec2> {
        self.body(id).map(|body| body.position)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    /// Bodies outside the hierarchy, pinned or not.
    pub fn free_body_count(&self) -> usize {
        self.bodies.iter().filter(|body| !body.anchored).count()
    }

    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    fn insert_body(&mut self, seed: BodySeed) -> bool {
        if self.index_by_id.contains_key(&seed.id) {
            return false;
        }
        self.index_by_id.insert(seed.id.clone(), self.bodies.len());
        self.bodies.push(Body::new(seed));
        true
    }

    /// Inserts bodies whose ids are not yet simulated. Revives the simulation if any were added.
    pub fn add_bodies(&mut self, seeds: impl IntoIterator<Item = BodySeed>) -> usize {
        let mut added = 0;
        for seed in seeds {
            if self.insert_body(seed) {
                added += 1;
            }
        }

        if added > 0 {
            self.rebuild_springs();
            self.reset();
        }
        added
    }

    /// Drops the named bodies and every spring touching them.
    pub fn remove_bodies<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let doomed = ids.iter().map(AsRef::as_ref).collect::<HashSet<_>>();
        let before = self.bodies.len();
        self.bodies.retain(|body| !doomed.contains(body.id.as_str()));
        let removed = before - self.bodies.len();

        if removed > 0 {
            self.reindex();
            self.rebuild_springs();
            self.reset();
        }
        removed
    }

    /// Replaces the spring set. Edges naming unknown bodies are skipped and returned.
    pub fn set_links(&mut self, edges: &[GraphEdge]) -> Vec<(NodeId, NodeId)> {
        self.edges = edges.to_vec();
        self.rebuild_springs()
    }

    fn reindex(&mut self) {
        self.index_by_id.clear();
        for (index, body) in self.bodies.iter().enumerate() {
            self.index_by_id.insert(body.id.clone(), index);
        }
    }

    fn rebuild_springs(&mut self) -> Vec<(NodeId, NodeId)> {
        let mut resolved = Vec::with_capacity(self.edges.len());
        let mut dropped = Vec::new();
        for edge in &self.edges {
            match (
                self.index_by_id.get(&edge.source),
                self.index_by_id.get(&edge.target),
            ) {
                (Some(&source), Some(&target)) if source != target => {
                    let strength = edge
                        .weight
                        .map_or(self.config.link_strength, |weight| {
                            weight * self.config.link_strength
                        });
                    resolved.push((source, target, strength));
                }
                (Some(_), Some(_)) => {}
                _ => dropped.push((edge.source.clone(), edge.target.clone())),
            }
        }

        let mut degree = vec![0usize; self.bodies.len()];
        for &(source, target, _) in &resolved {
            degree[source] += 1;
            degree[target] += 1;
        }

        self.springs = resolved
            .into_iter()
            .map(|(source, target, strength)| Spring {
                source,
                target,
                strength,
                bias: degree[source] as f32 / (degree[source] + degree[target]) as f32,
            })
            .collect();
        dropped
    }

    fn link_signature(edges: &[GraphEdge]) -> LinkSignature {
        let mut signature = edges
            .iter()
            .map(|edge| {
                (
                    edge.source.clone(),
                    edge.target.clone(),
                    edge.weight.map(f32::to_bits),
                )
            })
            .collect::<Vec<_>>();
        signature.sort();
        signature
    }

    /// Starting point for a new free body: at rest length from the nodes it links to,
    /// on the side facing away from the anchors.
    fn seed_position(&self, node: &GraphNode, edges: &[GraphEdge], ordinal: usize) -> Vec2 {
        let mut neighbour_sum = Vec2::ZERO;
        let mut neighbour_count = 0usize;
        for edge in edges {
            let other = if edge.source == node.id {
                &edge.target
            } else if edge.target == node.id {
                &edge.source
            } else {
                continue;
            };
            if let Some(position) = self.position(other) {
                neighbour_sum += position;
                neighbour_count += 1;
            }
        }

        if neighbour_count == 0 {
            return phyllotaxis(self.bodies.len() + ordinal);
        }

        let neighbours = neighbour_sum / neighbour_count as f32;
        let mut anchor_sum = Vec2::ZERO;
        let mut anchor_count = 0usize;
        for body in self.bodies.iter().filter(|body| body.anchored) {
            anchor_sum += body.position;
            anchor_count += 1;
        }
        let anchors = if anchor_count > 0 {
            anchor_sum / anchor_count as f32
        } else {
            Vec2::ZERO
        };

        let jitter = stable_jitter(&node.id, 1.0);
        let outward = neighbours - anchors;
        let direction = if outward.length_sq() > 1e-6 {
            (outward.normalized() + jitter * 0.25).normalized()
        } else if jitter.length_sq() > 1e-6 {
            jitter.normalized()
        } else {
            phyllotaxis(ordinal + 1).normalized()
        };

        neighbours + direction * self.config.link_distance
    }

    /// Makes the simulated body set match a full snapshot: anchors at their tree positions,
    /// free bodies for the outside nodes, springs for the outside edges.
    pub fn sync<'a>(
        &mut self,
        anchors: impl IntoIterator<Item = (&'a str, Vec2)>,
        free: &[GraphNode],
        edges: &[GraphEdge],
    ) -> SyncReport {
        let mut report = SyncReport::default();

        let anchors = anchors
            .into_iter()
            .map(|(id, position)| (id.to_owned(), position))
            .collect::<HashMap<_, _>>();
        let mut free_ids = HashSet::with_capacity(free.len());
        let mut free_nodes = Vec::with_capacity(free.len());
        for node in free {
            if anchors.contains_key(&node.id) {
                debug!(node_id = %node.id, "outside node is also in the hierarchy; anchoring it");
                continue;
            }
            if free_ids.insert(node.id.as_str()) {
                free_nodes.push(node);
            }
        }

        let stale = self
            .bodies
            .iter()
            .filter(|body| !anchors.contains_key(&body.id) && !free_ids.contains(body.id.as_str()))
            .map(|body| body.id.clone())
            .collect::<Vec<_>>();
        report.removed = self.remove_bodies(&stale);

        for body in &mut self.bodies {
            match anchors.get(&body.id) {
                Some(&position) => {
                    if !body.anchored || body.position != position {
                        report.anchors_moved += 1;
                    }
                    body.anchored = true;
                    body.pinned = None;
                    body.position = position;
                    body.velocity = Vec2::ZERO;
                }
                None if body.anchored => {
                    body.anchored = false;
                    report.anchors_moved += 1;
                }
                None => {}
            }
        }

        let mut anchor_order = anchors
            .iter()
            .filter(|(id, _)| !self.index_by_id.contains_key(id.as_str()))
            .map(|(id, position)| BodySeed {
                id: id.clone(),
                position: *position,
                anchored: true,
            })
            .collect::<Vec<_>>();
        anchor_order.sort_by(|a, b| a.id.cmp(&b.id));
        for seed in anchor_order {
            if self.insert_body(seed) {
                report.added += 1;
            }
        }

        for (ordinal, node) in free_nodes.into_iter().enumerate() {
            if self.index_by_id.contains_key(&node.id) {
                continue;
            }
            let position = self.seed_position(node, edges, ordinal);
            if self.insert_body(BodySeed {
                id: node.id.clone(),
                position,
                anchored: false,
            }) {
                report.added += 1;
            }
        }

        report.links_changed = Self::link_signature(&self.edges) != Self::link_signature(edges);
        report.dropped_links = self.set_links(edges);
        for error in report.unresolved_edges() {
            warn!(%error, "dropping outside edge");
        }

        if report.is_material() {
            self.reset();
            debug!(
                added = report.added,
                removed = report.removed,
                anchors_moved = report.anchors_moved,
                links_changed = report.links_changed,
                "simulation revived"
            );
        }
        report
    }

    /// Holds a free body at `position` until [`Simulation::release`].
    pub fn pin(&mut self, id: &str, position: Vec2) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };
        let body = &mut self.bodies[index];
        if body.anchored {
            return false;
        }
        body.pinned = Some(position);
        body.position = position;
        body.velocity = Vec2::ZERO;
        true
    }

    /// Returns a pinned body to the forces, leaving it where it was held.
    pub fn release(&mut self, id: &str) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };
        let body = &mut self.bodies[index];
        let Some(position) = body.pinned.take() else {
            return false;
        };
        body.position = position;
        body.velocity = Vec2::ZERO;
        true
    }

    /// One relaxation tick. A graph with nothing but anchors is left untouched.
    pub fn step(&mut self) -> bool {
        if self.bodies.iter().all(|body| body.anchored) {
            return false;
        }

        self.alpha += (self.config.alpha_target - self.alpha) * self.config.alpha_decay;
        let alpha = self.alpha;

        self.apply_charge(alpha);
        apply_centering(&mut self.bodies, self.config.center_strength, alpha);
        apply_springs(
            &mut self.bodies,
            &self.springs,
            self.config.link_distance,
            alpha,
        );

        let retain = (1.0 - self.config.velocity_decay).clamp(0.0, 1.0);
        let mut any_motion = false;
        for body in &mut self.bodies {
            if body.anchored {
                body.velocity = Vec2::ZERO;
                continue;
            }
            if let Some(pinned) = body.pinned {
                body.position = pinned;
                body.velocity = Vec2::ZERO;
                continue;
            }

            body.velocity *= retain;
            let next = body.position + body.velocity;
            if !next.x.is_finite() || !next.y.is_finite() {
                warn!(node_id = %body.id, "discarding non-finite simulation step");
                body.velocity = Vec2::ZERO;
                continue;
            }
            if body.velocity.length_sq() > 1e-8 {
                any_motion = true;
            }
            body.position = next;
        }

        any_motion
    }

    /// Runs up to `steps` ticks, stopping early once settled. Returns the ticks run.
    pub fn advance(&mut self, steps: usize) -> usize {
        if self.free_body_count() == 0 {
            return 0;
        }
        let mut ran = 0;
        while ran < steps && !self.is_settled() {
            self.step();
            ran += 1;
        }
        ran
    }

    fn apply_charge(&mut self, alpha: f32) {
        let body_count = self.bodies.len();
        self.positions_scratch.clear();
        self.positions_scratch
            .extend(self.bodies.iter().map(|body| body.position));
        self.velocity_scratch.clear();
        self.velocity_scratch.resize(body_count, Vec2::ZERO);

        let Some(quadtree) = QuadNode::build(&self.positions_scratch) else {
            return;
        };

        let params = ChargeParams {
            strength: self.config.charge_strength * alpha,
            distance_min_sq: self.config.charge_distance_min * self.config.charge_distance_min,
            distance_max_sq: self.config.charge_distance_max * self.config.charge_distance_max,
            theta: self.config.barnes_hut_theta,
        };

        for (index, body) in self.bodies.iter().enumerate() {
            if !body.is_free() {
                continue;
            }
            accumulate_charge_for_body(
                &quadtree,
                index,
                &self.positions_scratch,
                params,
                &mut self.velocity_scratch[index],
            );
        }

        for (body, delta) in self.bodies.iter_mut().zip(&self.velocity_scratch) {
            body.velocity += *delta;
        }
    }
}
