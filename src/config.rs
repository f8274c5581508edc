use serde::Deserialize;

use crate::error::ConfigError;

/// Which screen axis the tree's depth grows along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeOrientation {
    /// Depth grows along +x, siblings spread along y.
    #[default]
    Horizontal,
    /// Depth grows along +y, siblings spread along x.
    Vertical,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TreeLayoutConfig {
    /// World units between adjacent siblings.
    pub breadth_spacing: f32,
    /// World units between consecutive depths.
    pub depth_spacing: f32,
    pub sibling_separation: f32,
    pub non_sibling_separation: f32,
    pub orientation: TreeOrientation,
}

impl Default for TreeLayoutConfig {
    fn default() -> Self {
        Self {
            breadth_spacing: 25.0,
            depth_spacing: 100.0,
            sibling_separation: 1.0,
            non_sibling_separation: 2.0,
            orientation: TreeOrientation::Horizontal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub alpha_max: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub alpha_target: f32,
    /// Fraction of velocity removed on every tick.
    pub velocity_decay: f32,
    /// Negative values repel.
    pub charge_strength: f32,
    pub charge_distance_min: f32,
    /// Pairs farther apart than this exert no charge on each other.
    pub charge_distance_max: f32,
    pub barnes_hut_theta: f32,
    pub center_strength: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    /// Energy floor held while a node is being dragged.
    pub drag_alpha: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            alpha_max: 1.0,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.6,
            charge_strength: -500.0,
            charge_distance_min: 1.0,
            charge_distance_max: 2000.0,
            barnes_hut_theta: 0.9,
            center_strength: 0.02,
            link_distance: 50.0,
            link_strength: 0.4,
            drag_alpha: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Multiplier applied by a single zoom-in step.
    pub step_factor: f32,
    /// Screen-space padding kept around the content by zoom-fit.
    pub fit_margin: f32,
    pub animation_seconds: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 8.0,
            step_factor: 1.5,
            fit_margin: 20.0,
            animation_seconds: 0.35,
            viewport_width: 960.0,
            viewport_height: 600.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tree: TreeLayoutConfig,
    pub simulation: SimulationConfig,
    pub zoom: ZoomConfig,
    pub node_radius: f32,
    /// Ticks run before the first frame after the graph changes.
    pub settle_iterations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tree: TreeLayoutConfig::default(),
            simulation: SimulationConfig::default(),
            zoom: ZoomConfig::default(),
            node_radius: 6.0,
            settle_iterations: 500,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a possibly partial JSON config.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the layout and zoom code cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tree.validate()?;
        self.simulation.validate()?;
        self.zoom.validate()?;
        positive("node_radius", self.node_radius)
    }
}

impl TreeLayoutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tree.breadth_spacing", self.breadth_spacing)?;
        positive("tree.depth_spacing", self.depth_spacing)?;
        positive("tree.sibling_separation", self.sibling_separation)?;
        positive("tree.non_sibling_separation", self.non_sibling_separation)
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("simulation.alpha_min", self.alpha_min)?;
        positive("simulation.alpha_max", self.alpha_max)?;
        ordered(
            ("simulation.alpha_min", self.alpha_min),
            ("simulation.alpha_max", self.alpha_max),
        )?;
        unit_interval("simulation.alpha_decay", self.alpha_decay)?;
        non_negative("simulation.alpha_target", self.alpha_target)?;
        unit_interval("simulation.velocity_decay", self.velocity_decay)?;
        finite("simulation.charge_strength", self.charge_strength)?;
        non_negative("simulation.charge_distance_min", self.charge_distance_min)?;
        positive("simulation.charge_distance_max", self.charge_distance_max)?;
        ordered(
            ("simulation.charge_distance_min", self.charge_distance_min),
            ("simulation.charge_distance_max", self.charge_distance_max),
        )?;
        non_negative("simulation.barnes_hut_theta", self.barnes_hut_theta)?;
        non_negative("simulation.center_strength", self.center_strength)?;
        non_negative("simulation.link_distance", self.link_distance)?;
        non_negative("simulation.link_strength", self.link_strength)?;
        non_negative("simulation.drag_alpha", self.drag_alpha)
    }
}

impl ZoomConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("zoom.min_scale", self.min_scale)?;
        positive("zoom.max_scale", self.max_scale)?;
        ordered(
            ("zoom.min_scale", self.min_scale),
            ("zoom.max_scale", self.max_scale),
        )?;
        if !self.step_factor.is_finite() || self.step_factor <= 1.0 {
            return Err(out_of_range(
                "zoom.step_factor",
                self.step_factor,
                "must be finite and greater than 1",
            ));
        }
        non_negative("zoom.fit_margin", self.fit_margin)?;
        non_negative("zoom.animation_seconds", self.animation_seconds)?;
        non_negative("zoom.viewport_width", self.viewport_width)?;
        non_negative("zoom.viewport_height", self.viewport_height)
    }
}

fn out_of_range(field: &'static str, value: f32, requirement: &'static str) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value,
        requirement,
    }
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(out_of_range(field, value, "must be finite"))
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "must be finite and positive"))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(out_of_range(field, value, "must be finite and not negative"))
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(field, value, "must lie in [0, 1]"))
    }
}

fn ordered(low: (&'static str, f32), high: (&'static str, f32)) -> Result<(), ConfigError> {
    if low.1 <= high.1 {
        Ok(())
    } else {
        Err(ConfigError::Inverted {
            low_field: low.0,
            low: low.1,
            high_field: high.0,
            high: high.1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let raw = r#"{
            "settle_iterations": 120,
            "zoom": { "max_scale": 4.0 },
            "tree": { "orientation": "vertical" }
        }"#;
        let config = EngineConfig::from_json(raw).unwrap();

        assert_eq!(config.settle_iterations, 120);
        assert_eq!(config.zoom.max_scale, 4.0);
        assert_eq!(config.zoom.min_scale, 0.1);
        assert_eq!(config.tree.orientation, TreeOrientation::Vertical);
        assert_eq!(config.simulation, SimulationConfig::default());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_scale_range_is_rejected() {
        let raw = r#"{ "zoom": { "min_scale": 4.0, "max_scale": 2.0 } }"#;
        let error = EngineConfig::from_json(raw).unwrap_err();
        assert!(matches!(
            error,
            ConfigError::Inverted {
                low_field: "zoom.min_scale",
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let cases = [
            r#"{ "zoom": { "step_factor": 0.5 } }"#,
            r#"{ "zoom": { "fit_margin": -1.0 } }"#,
            r#"{ "simulation": { "velocity_decay": 1.5 } }"#,
            r#"{ "simulation": { "barnes_hut_theta": -0.1 } }"#,
            r#"{ "simulation": { "alpha_min": 2.0 } }"#,
            r#"{ "node_radius": 0.0 }"#,
        ];
        for raw in cases {
            assert!(EngineConfig::from_json(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn unparsable_json_is_a_parse_error() {
        let error = EngineConfig::from_json("{ zoom: }").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn default_decay_reaches_alpha_min_in_about_300_ticks() {
        let config = SimulationConfig::default();
        let mut alpha = config.alpha_max;
        for _ in 0..300 {
            alpha += (config.alpha_target - alpha) * config.alpha_decay;
        }
        assert!((alpha - config.alpha_min).abs() < 1e-4);
    }
}
