//! Project-wide physics settings.
//!
//! Settings are stored as RON files so they can be hand-edited next to level
//! files. Missing fields fall back to their defaults.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::resolver::ResolverKind;
use crate::types::LayerSettings;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub gravity: Vec2,
    /// How far a contact normal may lean away from "up" and still count as ground
    /// (`1 - up·normal`, so 0 is flat only and 1 accepts vertical walls).
    pub groundedness: f32,
    /// Fraction of positional correction withheld on ground contacts.
    pub stickiness: f32,
    pub minimum_post_bounce_magnitude: f32,
    pub minimum_post_friction_magnitude: f32,
    pub collision_resolver: ResolverKind,
    /// Broad-phase grid cell edge length.
    pub cell_size: f32,
    pub time_step: f32,
    pub layers: LayerSettings,
    pub enable_timing: bool,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.8),
            groundedness: 0.35,
            stickiness: 0.1,
            minimum_post_bounce_magnitude: 1.5,
            minimum_post_friction_magnitude: 0.2,
            collision_resolver: ResolverKind::Default,
            cell_size: 4.0,
            time_step: 1.0 / 60.0,
            layers: LayerSettings::default(),
            enable_timing: false,
        }
    }
}

impl PhysicsSettings {
    /// Reject values the simulation cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));
        if !self.gravity.is_finite() {
            return invalid(format!("gravity must be finite, got {}", self.gravity));
        }
        if !self.groundedness.is_finite() || self.groundedness < 0.0 {
            return invalid(format!("groundedness must be >= 0, got {}", self.groundedness));
        }
        if !(0.0..=1.0).contains(&self.stickiness) {
            return invalid(format!("stickiness must be within [0, 1], got {}", self.stickiness));
        }
        for (name, value) in [
            ("minimum_post_bounce_magnitude", self.minimum_post_bounce_magnitude),
            ("minimum_post_friction_magnitude", self.minimum_post_friction_magnitude),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{} must be >= 0, got {}", name, value));
            }
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return invalid(format!("cell_size must be > 0, got {}", self.cell_size));
        }
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return invalid(format!("time_step must be > 0, got {}", self.time_step));
        }
        Ok(())
    }

    /// Parse and validate settings from a RON string.
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let settings: PhysicsSettings = ron::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}
