//! Tower run state
//!
//! Everything a run knows lives in [`TowerState`], owned exclusively by the
//! state machine. Collaborator handles are stored on the block entities.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::block::{BlockEntity, BlockId};
use super::judge::PlacementResult;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// No active block yet (before the first spawn)
    Idle,
    /// A block is sliding, waiting for commit
    Dropping,
    /// The last block missed and is falling; score is final
    Collapsing,
    /// Run ended; only reset is accepted
    GameOver,
}

/// Things the presentation layer may want to react to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A new run began
    RunStarted { generation: u64 },
    ScoreChanged { score: u32 },
    /// Elapsed seconds of the current run
    TimeChanged { elapsed: f32 },
    /// A block joined the tower
    BlockPlaced { block: BlockId, result: PlacementResult },
    /// A block missed and is collapsing
    Collapsed { block: BlockId, offset: f32 },
    GameOver { score: u32, elapsed: f32 },
    DebugVisualsToggled { enabled: bool },
    /// Reaper released bodies this tick
    Reaped { fallen: usize, evicted: usize },
}

/// Pending game-over signal, valid only for the run that scheduled it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameOverTimer {
    /// Run generation at scheduling time
    pub generation: u64,
    /// Machine clock (seconds) at which it fires
    pub fires_at: f64,
}

impl GameOverTimer {
    pub fn is_due(&self, now: f64) -> bool {
        now >= self.fires_at
    }
}

/// Complete run state
#[derive(Debug, Clone)]
pub struct TowerState {
    pub phase: GamePhase,
    pub score: u32,
    /// Machine clock at run start (seconds)
    pub started_at: f64,
    /// Machine clock, advanced by ticks
    pub clock: f64,
    /// Elapsed time frozen at the miss
    pub final_elapsed: Option<f32>,
    /// Bumped on every reset; stale timers compare against it
    pub generation: u64,
    /// Immovable base, present once started
    pub ground: Option<BlockEntity>,
    /// Every non-ground block still alive, oldest first
    pub blocks: Vec<BlockEntity>,
    /// Most recently placed block; None means the ground
    pub top_id: Option<BlockId>,
    /// Sliding or collapsing block
    pub active_id: Option<BlockId>,
    pub pending_game_over: Option<GameOverTimer>,
    pub debug_visuals: bool,
    /// Events since the last drain
    pub events: Vec<GameEvent>,
    /// Ticks since creation
    pub ticks: u64,
    next_id: u32,
}

impl Default for TowerState {
    fn default() -> Self {
        Self::new()
    }
}

impl TowerState {
    pub fn new() -> Self {
        Self {
            phase: GamePhase::Idle,
            score: 0,
            started_at: 0.0,
            clock: 0.0,
            final_elapsed: None,
            generation: 0,
            ground: None,
            blocks: Vec::new(),
            top_id: None,
            active_id: None,
            pending_game_over: None,
            debug_visuals: false,
            events: Vec::new(),
            ticks: 0,
            next_id: 0,
        }
    }

    /// Allocate a new block id
    pub fn next_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn block(&self, id: BlockId) -> Option<&BlockEntity> {
        if let Some(ground) = &self.ground {
            if ground.id == id {
                return Some(ground);
            }
        }
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BlockEntity> {
        if let Some(ground) = self.ground.as_mut() {
            if ground.id == id {
                return Some(ground);
            }
        }
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// Top of the tower (the ground until something is placed)
    pub fn top_block(&self) -> Option<&BlockEntity> {
        match self.top_id {
            Some(id) => self.block(id),
            None => self.ground.as_ref(),
        }
    }

    pub fn active_block(&self) -> Option<&BlockEntity> {
        self.active_id.and_then(|id| self.block(id))
    }

    pub fn active_block_mut(&mut self) -> Option<&mut BlockEntity> {
        let id = self.active_id?;
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// Ids the reaper must never touch
    pub fn protected_ids(&self) -> Vec<BlockId> {
        let mut ids = Vec::with_capacity(3);
        if let Some(ground) = &self.ground {
            ids.push(ground.id);
        }
        if let Some(top) = self.top_id {
            ids.push(top);
        }
        if let Some(active) = self.active_id {
            ids.push(active);
        }
        ids
    }

    /// Seconds since run start (frozen once the run has missed)
    pub fn elapsed(&self) -> f32 {
        self.final_elapsed
            .unwrap_or((self.clock - self.started_at) as f32)
    }

    /// Point the camera should follow
    pub fn focus(&self) -> Vec3 {
        self.top_block().map(|b| b.position).unwrap_or(Vec3::ZERO)
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_due() {
        let timer = GameOverTimer {
            generation: 1,
            fires_at: 2.0,
        };
        assert!(!timer.is_due(1.999));
        assert!(timer.is_due(2.0));
    }

    #[test]
    fn test_elapsed_freezes() {
        let mut state = TowerState::new();
        state.started_at = 1.0;
        state.clock = 4.0;
        assert_eq!(state.elapsed(), 3.0);
        state.final_elapsed = Some(2.5);
        state.clock = 10.0;
        assert_eq!(state.elapsed(), 2.5);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut state = TowerState::new();
        let a = state.next_block_id();
        let b = state.next_block_id();
        assert_ne!(a, b);
    }
}
