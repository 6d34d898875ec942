//! Bounding retained bodies over a long run
//!
//! Two independent rules: anything that fell below the floor is released,
//! and once the world holds more than `cap` bodies the oldest are evicted
//! down to `retain`. The ground, the top block and the active block are
//! never touched.

use super::block::BlockId;
use super::state::TowerState;
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::render::RenderScene;
use crate::tuning::TuningConfig;

/// What a sweep released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Released for falling below the floor
    pub fallen: usize,
    /// Released by the body cap
    pub evicted: usize,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.fallen == 0 && self.evicted == 0
    }
}

#[derive(Debug, Clone)]
pub struct StalePhysicsReaper {
    pub floor_y: f32,
    pub cap: usize,
    pub retain: usize,
    pub interval_ticks: u32,
    ticks_since_sweep: u32,
}

impl StalePhysicsReaper {
    pub fn from_tuning(tuning: &TuningConfig) -> Self {
        Self {
            floor_y: tuning.reap_floor_y,
            cap: tuning.reap_body_cap,
            retain: tuning.reap_retain,
            interval_ticks: tuning.reap_interval_ticks.max(1),
            ticks_since_sweep: 0,
        }
    }

    /// Count a tick; true when a sweep is due
    pub fn tick(&mut self) -> bool {
        self.ticks_since_sweep += 1;
        if self.ticks_since_sweep >= self.interval_ticks {
            self.ticks_since_sweep = 0;
            true
        } else {
            false
        }
    }

    pub fn sweep<P: PhysicsWorld, R: RenderScene>(
        &self,
        physics: &mut P,
        render: &mut R,
        state: &mut TowerState,
    ) -> ReapReport {
        let protected = state.protected_ids();
        let mut report = ReapReport::default();

        for handle in physics.body_handles() {
            let tag = physics.tag_of(handle);
            if tag.is_some_and(|t| protected.contains(&t)) {
                continue;
            }
            let Some(position) = physics.position(handle) else {
                continue;
            };
            if position.y < self.floor_y {
                release(physics, render, state, handle, tag);
                report.fallen += 1;
            }
        }

        if physics.body_count() > self.cap {
            let candidates: Vec<(BlockId, BodyHandle)> = state
                .blocks
                .iter()
                .filter(|b| !protected.contains(&b.id))
                .map(|b| (b.id, b.body))
                .collect();
            for (id, body) in candidates {
                if physics.body_count() <= self.retain {
                    break;
                }
                release(physics, render, state, body, Some(id));
                report.evicted += 1;
            }
        }

        if !report.is_empty() {
            log::debug!(
                "Reaper: {} fallen, {} evicted, {} bodies live",
                report.fallen,
                report.evicted,
                physics.body_count()
            );
        }
        report
    }
}

/// Release a body and, through its tag, the block's visual
fn release<P: PhysicsWorld, R: RenderScene>(
    physics: &mut P,
    render: &mut R,
    state: &mut TowerState,
    body: BodyHandle,
    tag: Option<BlockId>,
) {
    physics.remove_body(body);
    let Some(tag) = tag else {
        return;
    };
    if let Some(index) = state.blocks.iter().position(|b| b.id == tag) {
        let block = state.blocks.remove(index);
        if !render.remove(block.visual) {
            log::warn!("Reaper: visual {:?} of block {:?} already gone", block.visual, tag);
        }
    }
}
