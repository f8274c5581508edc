use std::collections::hash_map::DefaultHasher;
use std::f32::consts::PI;
use std::hash::{Hash, Hasher};

use eframe::egui::{Vec2, vec2};

const PHYLLOTAXIS_RADIUS: f32 = 10.0;

/// Deterministic pseudo-random pair in `[-1, 1]` derived from a node id.
pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

pub fn stable_jitter(id: &str, magnitude: f32) -> Vec2 {
    let (jx, jy) = stable_pair(id);
    vec2(jx, jy) * magnitude
}

/// Sunflower seed placement for bodies that have nothing to start next to.
pub fn phyllotaxis(index: usize) -> Vec2 {
    let radius = PHYLLOTAXIS_RADIUS * (0.5 + index as f32).sqrt();
    let angle = index as f32 * PI * (3.0 - 5.0_f32.sqrt());
    vec2(angle.cos(), angle.sin()) * radius
}

/// Unit vector used when two points coincide and no natural direction exists.
pub fn fallback_direction(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let first = stable_pair("node-7");
        assert_eq!(first, stable_pair("node-7"));
        assert!((-1.0..=1.0).contains(&first.0));
        assert!((-1.0..=1.0).contains(&first.1));
    }

    #[test]
    fn phyllotaxis_spreads_consecutive_seeds() {
        let a = phyllotaxis(0);
        let b = phyllotaxis(1);
        assert!((a - b).length() > 1.0);
        assert!(phyllotaxis(40).length() > phyllotaxis(4).length());
    }
}
