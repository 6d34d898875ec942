//! Sliding motion of the uncommitted block

use serde::{Deserialize, Serialize};

use super::block::BlockEntity;
use crate::consts::REFERENCE_RATE;

/// Drives the active block back and forth along x
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillationController {
    /// Units per reference frame
    pub speed: f32,
    /// Lane half-width
    pub boundary: f32,
    /// +1 or -1
    pub direction: f32,
}

impl OscillationController {
    pub fn new(speed: f32, boundary: f32) -> Self {
        Self {
            speed,
            boundary,
            direction: 1.0,
        }
    }

    /// Start moving toward +x again (new run)
    pub fn reset(&mut self) {
        self.direction = 1.0;
    }

    /// Move a sliding block by one frame of `dt` seconds.
    ///
    /// Overshoot past the boundary is mirrored back inside the lane and the
    /// direction then points toward the centre. Committed blocks are left
    /// untouched.
    pub fn advance(&mut self, dt: f32, block: &mut BlockEntity) {
        if !block.is_static {
            return;
        }
        let x = self.step_x(block.position.x, dt);
        block.position.x = x;
    }

    /// Pure form of [`advance`](Self::advance) on a bare x coordinate
    pub fn step_x(&mut self, x: f32, dt: f32) -> f32 {
        let mut x = x + self.speed * self.direction * dt * REFERENCE_RATE;
        if x.abs() > self.boundary {
            let side = x.signum();
            let overshoot = x.abs() - self.boundary;
            // Mirror, but never past the opposite wall on absurd dt
            x = side * (self.boundary - overshoot.min(2.0 * self.boundary));
            self.direction = -side;
        }
        x
    }
}
