//! Block entities
//!
//! A block pairs one physics body with one visual. Both sides carry the
//! block's id (the body as its tag, the visual as its tag) and the entity
//! holds both handles, so either side can be resolved from the other.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::BLOCK_HALF_EXTENTS;
use crate::physics::BodyHandle;
use crate::render::VisualHandle;

/// Stable block identifier (never reused within a machine)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// What a block is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockRole {
    /// Immovable base of the tower
    Ground,
    /// Sliding, waiting for commit
    Sliding,
    /// Committed successfully, part of the tower
    Placed,
    /// Missed, falling off the tower
    Collapsing,
}

/// One placed, sliding or falling block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntity {
    pub id: BlockId,
    pub visual: VisualHandle,
    pub body: BodyHandle,
    pub half_extents: Vec3,
    /// Kinematic position while sliding, physics position afterwards
    pub position: Vec3,
    pub orientation: Quat,
    /// True while sliding (no gravity); false once committed or failed
    pub is_static: bool,
    pub role: BlockRole,
}

impl BlockEntity {
    pub fn new(id: BlockId, visual: VisualHandle, body: BodyHandle, position: Vec3, role: BlockRole) -> Self {
        Self {
            id,
            visual,
            body,
            half_extents: BLOCK_HALF_EXTENTS,
            position,
            orientation: Quat::IDENTITY,
            is_static: true,
            role,
        }
    }

    /// Height of the block's top face
    pub fn top(&self) -> f32 {
        self.position.y + self.half_extents.y
    }

    /// Center position of a block resting on this one at horizontal `x`
    pub fn stacked_position(&self, x: f32) -> Vec3 {
        Vec3::new(x, self.top() + BLOCK_HALF_EXTENTS.y, self.position.z)
    }

    pub fn is_ground(&self) -> bool {
        self.role == BlockRole::Ground
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::GROUND_CENTER;

    #[test]
    fn test_stacked_position_on_ground() {
        let ground = BlockEntity::new(
            BlockId(0),
            VisualHandle(1),
            BodyHandle(1),
            GROUND_CENTER,
            BlockRole::Ground,
        );
        assert_eq!(ground.top(), 0.0);
        assert_eq!(ground.stacked_position(-5.0), Vec3::new(-5.0, 0.5, 0.0));
    }
}
