//! Placement and collapse simulation
//!
//! All gameplay decisions live here:
//! - Fixed-rate oscillation of the sliding block
//! - Pure placement judgment
//! - Collapse hand-off to physics and the delayed game-over signal
//! - Run lifecycle and resource bounding
//!
//! Physics and rendering are reached only through the collaborator traits.

pub mod block;
pub mod collapse;
pub mod judge;
pub mod machine;
pub mod oscillation;
pub mod reaper;
pub mod state;
pub mod tick;

pub use block::{BlockEntity, BlockId, BlockRole};
pub use collapse::{CollapseProfile, CollapseReactor};
pub use judge::{Classification, PlacementJudge, PlacementResult};
pub use machine::TowerStateMachine;
pub use oscillation::OscillationController;
pub use reaper::{ReapReport, StalePhysicsReaper};
pub use state::{GameEvent, GameOverTimer, GamePhase, TowerState};
pub use tick::{Intent, TickInput};
