use eframe::egui::Vec2;

use super::quadtree::QuadNode;
use super::{Body, Spring};
use crate::util::fallback_direction;

#[derive(Clone, Copy, Debug)]
pub(super) struct ChargeParams {
    /// Charge strength already scaled by alpha.
    pub(super) strength: f32,
    pub(super) distance_min_sq: f32,
    pub(super) distance_max_sq: f32,
    pub(super) theta: f32,
}

/// Velocity change on `index` caused by `mass` bodies of charge at `delta` from it.
fn charge_between(delta: Vec2, mass: f32, params: ChargeParams) -> Vec2 {
    let mut distance_sq = delta.length_sq();
    if distance_sq < params.distance_min_sq {
        distance_sq = (params.distance_min_sq * distance_sq).sqrt();
    }
    delta * (params.strength * mass / distance_sq)
}

pub(super) fn accumulate_charge_for_body(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];
    if node.bounds.distance_sq_to_point(point) >= params.distance_max_sq {
        return;
    }

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }

            let mut delta = positions[other_index] - point;
            if delta.length_sq() <= f32::EPSILON {
                delta = fallback_direction(index, other_index) * 1e-3;
            }
            if delta.length_sq() >= params.distance_max_sq {
                continue;
            }
            *velocity += charge_between(delta, 1.0, params);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance_sq = delta.length_sq().max(1e-6);
    let side = node.bounds.side_length();
    let can_approximate = !node.bounds.contains(point)
        && (side * side) / (params.theta * params.theta) < distance_sq;

    if can_approximate {
        if distance_sq < params.distance_max_sq {
            *velocity += charge_between(delta, node.mass, params);
        }
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge_for_body(child, index, positions, params, velocity);
    }
}

/// Hooke springs along links, sharing the correction between the two ends by degree.
pub(super) fn apply_springs(bodies: &mut [Body], springs: &[Spring], rest_length: f32, alpha: f32) {
    for spring in springs {
        let (source, target) = (spring.source, spring.target);
        if source == target || source >= bodies.len() || target >= bodies.len() {
            continue;
        }

        let mut delta = (bodies[target].position + bodies[target].velocity)
            - (bodies[source].position + bodies[source].velocity);
        if delta.length_sq() <= f32::EPSILON {
            delta = fallback_direction(source, target) * 1e-3;
        }
        let distance = delta.length();
        let stretch = (distance - rest_length) / distance * alpha * spring.strength;
        let correction = delta * stretch;

        bodies[target].velocity -= correction * spring.bias;
        bodies[source].velocity += correction * (1.0 - spring.bias);
    }
}

/// Pulls each free body toward the x = 0 and y = 0 lines.
pub(super) fn apply_centering(bodies: &mut [Body], strength: f32, alpha: f32) {
    for body in bodies.iter_mut().filter(|body| body.is_free()) {
        body.velocity -= body.position * (strength * alpha);
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    fn params() -> ChargeParams {
        ChargeParams {
            strength: -500.0,
            distance_min_sq: 1.0,
            distance_max_sq: 100.0 * 100.0,
            theta: 0.9,
        }
    }

    #[test]
    fn charge_repels_and_ignores_distant_bodies() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(500.0, 0.0)];
        let root = QuadNode::build(&positions).unwrap();

        let mut velocity = Vec2::ZERO;
        accumulate_charge_for_body(&root, 0, &positions, params(), &mut velocity);

        // Only the body at distance 10 is within range: -500 * 10 / 100.
        assert!((velocity.x - -50.0).abs() < 1e-3, "{velocity:?}");
        assert_eq!(velocity.y, 0.0);
    }

    #[test]
    fn coincident_bodies_still_push_apart() {
        let positions = vec![vec2(1.0, 1.0), vec2(1.0, 1.0)];
        let root = QuadNode::build(&positions).unwrap();

        let mut velocity = Vec2::ZERO;
        accumulate_charge_for_body(&root, 0, &positions, params(), &mut velocity);
        assert!(velocity.length() > 0.0);
        assert!(velocity.x.is_finite() && velocity.y.is_finite());
    }
}
