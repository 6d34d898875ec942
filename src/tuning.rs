//! Data-driven game balance
//!
//! Every design constant of the placement core lives here so a run can be
//! re-tuned from JSON without touching the simulation code.

use serde::{Deserialize, Serialize};

use crate::TowerError;

/// Where a freshly spawned block begins its oscillation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnOrigin {
    /// Directly above the current top block
    #[default]
    AboveTop,
    /// At the negative oscillation boundary
    Edge,
}

/// Game balance knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    // === Oscillation ===
    /// Units moved per reference frame
    pub oscillation_speed: f32,
    /// Half-width of the oscillation lane
    pub oscillation_boundary: f32,
    /// Where new blocks appear
    pub spawn_origin: SpawnOrigin,

    // === Judgment ===
    /// |offset| at or below this is Perfect
    pub perfect_threshold: f32,
    /// |offset| at or below this (and above perfect) is Overhang
    pub overhang_threshold: f32,
    /// Tilt (radians about z) applied to overhanging placements
    pub overhang_tilt: f32,

    // === Physics ===
    /// Mass given to a block once committed
    pub block_mass: f32,
    /// Vertical gravity (negative is down)
    pub gravity: f32,

    // === Collapse ===
    /// Scales the whole collapse velocity profile
    pub collapse_intensity: f32,
    /// Horizontal launch speed at intensity 1
    pub collapse_horizontal_speed: f32,
    /// Downward launch speed at intensity 1
    pub collapse_drop_speed: f32,
    /// Spin about z at intensity 1 (rad/s)
    pub collapse_spin: f32,
    /// Horizontal speed the corrective hook never lets decay below
    pub collapse_min_horizontal_speed: f32,
    /// Spin the corrective hook never lets decay below
    pub collapse_min_spin: f32,
    /// Seconds between the Miss and the game-over signal
    pub game_over_delay: f32,
    /// Start a fresh run right after game over
    pub auto_restart: bool,

    // === Reaper ===
    /// Bodies below this height are released
    pub reap_floor_y: f32,
    /// Live body count that triggers eviction
    pub reap_body_cap: usize,
    /// Live body count eviction trims down to
    pub reap_retain: usize,
    /// Ticks between sweeps (1 = every tick)
    pub reap_interval_ticks: u32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            oscillation_speed: 0.1,
            oscillation_boundary: 5.0,
            spawn_origin: SpawnOrigin::AboveTop,

            perfect_threshold: 0.5,
            overhang_threshold: 2.0,
            overhang_tilt: 0.2,

            block_mass: 1.0,
            gravity: crate::consts::GRAVITY,

            collapse_intensity: 1.0,
            collapse_horizontal_speed: 3.0,
            collapse_drop_speed: 2.0,
            collapse_spin: 2.5,
            collapse_min_horizontal_speed: 2.0,
            collapse_min_spin: 1.5,
            game_over_delay: 2.0,
            auto_restart: true,

            reap_floor_y: -20.0,
            reap_body_cap: 20,
            reap_retain: 10,
            reap_interval_ticks: 1,
        }
    }
}

impl TuningConfig {
    /// Parse and validate tuning from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, TowerError> {
        let tuning: TuningConfig = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Check the invariants the simulation relies on
    pub fn validate(&self) -> Result<(), TowerError> {
        if !(self.oscillation_speed > 0.0) {
            return Err(TowerError::InvalidTuning(
                "oscillation_speed must be positive".into(),
            ));
        }
        if !(self.oscillation_boundary > 0.0) {
            return Err(TowerError::InvalidTuning(
                "oscillation_boundary must be positive".into(),
            ));
        }
        if !(self.perfect_threshold >= 0.0 && self.perfect_threshold <= self.overhang_threshold) {
            return Err(TowerError::InvalidTuning(format!(
                "thresholds must satisfy 0 <= perfect ({}) <= overhang ({})",
                self.perfect_threshold, self.overhang_threshold
            )));
        }
        if !(self.block_mass > 0.0) {
            return Err(TowerError::InvalidTuning("block_mass must be positive".into()));
        }
        if !(self.game_over_delay >= 0.0) {
            return Err(TowerError::InvalidTuning(
                "game_over_delay must not be negative".into(),
            ));
        }
        if self.reap_retain > self.reap_body_cap {
            return Err(TowerError::InvalidTuning(format!(
                "reap_retain ({}) exceeds reap_body_cap ({})",
                self.reap_retain, self.reap_body_cap
            )));
        }
        if self.reap_interval_ticks == 0 {
            return Err(TowerError::InvalidTuning(
                "reap_interval_ticks must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
