//! Placement judgment
//!
//! Compares the committed block with the top of the tower along x and
//! buckets the offset. Boundaries belong to the lower (better) bucket.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::offset_sign;

/// Outcome bucket of a placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Close enough to stack cleanly
    Perfect,
    /// Stacks, but visibly tilted
    Overhang,
    /// Falls off; ends the run
    Miss,
}

impl Classification {
    pub fn is_success(&self) -> bool {
        !matches!(self, Classification::Miss)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementResult {
    /// active.x - top.x at commit time
    pub offset: f32,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementJudge {
    pub perfect_threshold: f32,
    pub overhang_threshold: f32,
    /// Radians about z for overhanging placements
    pub overhang_tilt: f32,
}

impl Default for PlacementJudge {
    fn default() -> Self {
        Self {
            perfect_threshold: 0.5,
            overhang_threshold: 2.0,
            overhang_tilt: 0.2,
        }
    }
}

impl PlacementJudge {
    pub fn judge(&self, active: Vec3, top: Vec3) -> PlacementResult {
        let offset = active.x - top.x;
        PlacementResult {
            offset,
            classification: self.classify(offset),
        }
    }

    pub fn classify(&self, offset: f32) -> Classification {
        let magnitude = offset.abs();
        if magnitude <= self.perfect_threshold {
            Classification::Perfect
        } else if magnitude <= self.overhang_threshold {
            Classification::Overhang
        } else {
            Classification::Miss
        }
    }

    /// Orientation a committed block settles with
    pub fn placement_orientation(&self, result: &PlacementResult) -> Quat {
        match result.classification {
            Classification::Overhang => {
                Quat::from_rotation_z(offset_sign(result.offset) * self.overhang_tilt)
            }
            _ => Quat::IDENTITY,
        }
    }
}
