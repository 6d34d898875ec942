//! Error types for the tower core
//!
//! Invalid invocations (committing outside Dropping, etc.) are not errors:
//! they are ignored no-ops. Errors here cover collaborators that cannot
//! serve a request and configuration that cannot be loaded.

use thiserror::Error;

use crate::physics::BodyHandle;
use crate::render::VisualHandle;
use crate::sim::BlockId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TowerError {
    /// An operation needed the ground/top block before `start()` ran
    #[error("tower has not been started")]
    NotStarted,

    /// The physics world no longer knows this body
    #[error("physics body {0:?} is not registered")]
    MissingBody(BodyHandle),

    /// The scene no longer knows this visual
    #[error("visual {0:?} is not registered")]
    MissingVisual(VisualHandle),

    /// A block id has no entity in the tower state
    #[error("block {0:?} is not tracked")]
    UnknownBlock(BlockId),

    /// Tuning JSON could not be parsed
    #[error("tuning parse error: {0}")]
    TuningParse(String),

    /// Tuning values violate an invariant
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),
}

impl From<serde_json::Error> for TowerError {
    fn from(e: serde_json::Error) -> Self {
        TowerError::TuningParse(e.to_string())
    }
}
