use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ExplosionError;

/// Tunables for a single explosion.
///
/// Every field has a default, so option files only need to name what they
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionOptions {
    /// Rays per axis of the sampling cube.
    pub ray_resolution: u32,
    /// Distance advanced per ray step.
    pub step_length: f64,
    /// Per-voxel ignition probability, 1.0 unless configured. Zero disables fire.
    pub fire_chance: f64,
    /// When false, tracing records no affected blocks.
    pub block_breaking: bool,
    /// Blocks below this y are never destroyed.
    pub min_height: i32,
    /// When false, entities in range take zero damage.
    pub does_damage: bool,
}

impl Default for ExplosionOptions {
    fn default() -> Self {
        Self {
            ray_resolution: 16,
            step_length: 0.3,
            fire_chance: 1.0,
            block_breaking: true,
            min_height: i32::MIN,
            does_damage: true,
        }
    }
}

impl ExplosionOptions {
    pub fn incendiary(mut self, fire_chance: f64) -> Self {
        self.fire_chance = fire_chance;
        self
    }

    pub fn with_min_height(mut self, min_height: i32) -> Self {
        self.min_height = min_height;
        self
    }

    pub fn with_resolution(mut self, ray_resolution: u32) -> Self {
        self.ray_resolution = ray_resolution;
        self
    }

    /// Reject values the tracer cannot work with.
    pub fn validate(&self) -> Result<(), ExplosionError> {
        if self.ray_resolution < 2 {
            return Err(ExplosionError::InvalidRayResolution(self.ray_resolution));
        }
        if !(self.step_length.is_finite() && self.step_length > 0.0) {
            return Err(ExplosionError::InvalidStepLength(self.step_length));
        }
        if !(0.0..=1.0).contains(&self.fire_chance) {
            return Err(ExplosionError::FireChanceOutOfRange(self.fire_chance));
        }
        Ok(())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ExplosionError> {
        let options: Self = serde_yaml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ExplosionError> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExplosionError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&contents),
            "json" => Self::from_json_str(&contents),
            _ => Err(ExplosionError::UnsupportedFormat(ext)),
        }
    }
}
