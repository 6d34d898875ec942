//! Tower Stack - a stack-the-falling-block arcade game
//!
//! Core modules:
//! - `sim`: Placement judgment, collapse reaction and the run state machine
//! - `physics`: Rigid-body collaborator contract plus a small built-in world
//! - `render`: Scene collaborator contract, headless recorder, canvas renderer
//! - `ui`: Presentation events (score, timer, game over)
//! - `tuning`: Data-driven game balance

pub mod audio;
pub mod error;
pub mod highscores;
pub mod physics;
pub mod render;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod ui;

pub use error::TowerError;
pub use highscores::HighScores;
pub use settings::Settings;
pub use tuning::TuningConfig;

use glam::Vec3;

/// Game configuration constants
pub mod consts {
    use glam::Vec3;

    /// Fixed physics timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum physics substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 5;
    /// Largest frame delta accepted by a tick (tab switches, debugger pauses)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Frame rate the oscillation speed is expressed against
    pub const REFERENCE_RATE: f32 = 60.0;

    /// Every block (ground included) is a 5x1x5 box
    pub const BLOCK_HALF_EXTENTS: Vec3 = Vec3::new(2.5, 0.5, 2.5);
    /// Ground center; its top face sits at y = 0
    pub const GROUND_CENTER: Vec3 = Vec3::new(0.0, -0.5, 0.0);

    /// World gravity (m/s², y up)
    pub const GRAVITY: f32 = -9.82;
}

/// Full box size from half extents
#[inline]
pub fn full_size(half_extents: Vec3) -> Vec3 {
    half_extents * 2.0
}

/// Sign of a horizontal offset, treating zero as positive
#[inline]
pub fn offset_sign(offset: f32) -> f32 {
    if offset < 0.0 { -1.0 } else { 1.0 }
}
