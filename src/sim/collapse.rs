//! Collapse reaction for missed placements
//!
//! A missed block is handed to physics with a launch profile that depends
//! only on which side it missed on, plus one corrective per-step hook that
//! keeps it sliding and spinning off the edge. The reactor owns at most one
//! hook at a time; triggering again moves it instead of stacking another.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::block::{BlockEntity, BlockRole};
use super::state::GameOverTimer;
use crate::physics::{BodyHandle, BodyMotion, PhysicsWorld};
use crate::tuning::TuningConfig;
use crate::{TowerError, offset_sign};

/// Initial motion given to a collapsing block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollapseProfile {
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

#[derive(Debug)]
pub struct CollapseReactor {
    pub mass: f32,
    pub intensity: f32,
    pub horizontal_speed: f32,
    pub drop_speed: f32,
    pub spin: f32,
    pub min_horizontal_speed: f32,
    pub min_spin: f32,
    /// Seconds until game over
    pub delay: f32,
    hooked: Option<BodyHandle>,
}

impl CollapseReactor {
    pub fn from_tuning(tuning: &TuningConfig) -> Self {
        Self {
            mass: tuning.block_mass,
            intensity: tuning.collapse_intensity,
            horizontal_speed: tuning.collapse_horizontal_speed,
            drop_speed: tuning.collapse_drop_speed,
            spin: tuning.collapse_spin,
            min_horizontal_speed: tuning.collapse_min_horizontal_speed,
            min_spin: tuning.collapse_min_spin,
            delay: tuning.game_over_delay,
            hooked: None,
        }
    }

    /// Body currently carrying the corrective hook
    pub fn hooked_body(&self) -> Option<BodyHandle> {
        self.hooked
    }

    /// Launch motion for a miss at `offset`. Only the sign matters.
    pub fn launch_profile(&self, offset: f32) -> CollapseProfile {
        let side = offset_sign(offset);
        CollapseProfile {
            velocity: Vec3::new(
                side * self.horizontal_speed * self.intensity,
                -self.drop_speed * self.intensity,
                0.0,
            ),
            // Falling toward +x tips clockwise (negative z)
            angular_velocity: Vec3::new(0.0, 0.0, -side * self.spin * self.intensity),
        }
    }

    /// Hand a missed block to physics and schedule game over.
    ///
    /// On error the block is left untouched apart from the released hook.
    pub fn trigger<P: PhysicsWorld>(
        &mut self,
        physics: &mut P,
        block: &mut BlockEntity,
        offset: f32,
        now: f64,
        generation: u64,
    ) -> Result<GameOverTimer, TowerError> {
        self.release(physics);

        if !physics.make_dynamic(block.body, self.mass) {
            return Err(TowerError::MissingBody(block.body));
        }
        block.is_static = false;
        block.role = BlockRole::Collapsing;

        let profile = self.launch_profile(offset);
        physics.set_velocity(block.body, profile.velocity);
        physics.set_angular_velocity(block.body, profile.angular_velocity);

        let side = offset_sign(offset);
        let min_h = self.min_horizontal_speed;
        let min_spin = self.min_spin;
        let hook = move |motion: &mut BodyMotion| {
            if motion.velocity.x * side < min_h {
                motion.velocity.x = side * min_h;
            }
            if -motion.angular_velocity.z * side < min_spin {
                motion.angular_velocity.z = -side * min_spin;
            }
        };
        physics.set_pre_step(block.body, Some(Box::new(hook)));
        self.hooked = Some(block.body);

        log::info!(
            "Collapse: block {:?} off the {} side (offset {:.2})",
            block.id,
            if side > 0.0 { "right" } else { "left" },
            offset
        );

        Ok(GameOverTimer {
            generation,
            fires_at: now + self.delay as f64,
        })
    }

    /// Drop the corrective hook (reset, or the body went away)
    pub fn release<P: PhysicsWorld>(&mut self, physics: &mut P) {
        if let Some(body) = self.hooked.take() {
            physics.set_pre_step(body, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BLOCK_HALF_EXTENTS, SIM_DT};
    use crate::physics::{BallisticWorld, BodyDesc, BodyMaterial};
    use crate::render::VisualHandle;
    use crate::sim::BlockId;

    fn sliding_block(world: &mut BallisticWorld, id: u32, x: f32) -> BlockEntity {
        let position = Vec3::new(x, 20.0, 0.0);
        let body = world.create_body(BodyDesc {
            mass: 0.0,
            half_extents: BLOCK_HALF_EXTENTS,
            position,
            material: BodyMaterial::default(),
            tag: BlockId(id),
        });
        BlockEntity::new(BlockId(id), VisualHandle(id), body, position, BlockRole::Sliding)
    }

    #[test]
    fn test_profile_depends_only_on_sign() {
        let reactor = CollapseReactor::from_tuning(&TuningConfig::default());
        assert_eq!(reactor.launch_profile(2.5), reactor.launch_profile(4.9));
        assert_eq!(reactor.launch_profile(-2.5), reactor.launch_profile(-4.0));

        let right = reactor.launch_profile(3.0);
        let left = reactor.launch_profile(-3.0);
        assert!(right.velocity.x > 0.0 && left.velocity.x < 0.0);
        assert!(right.velocity.y < 0.0 && left.velocity.y < 0.0);
        assert_eq!(right.angular_velocity.z, -left.angular_velocity.z);
    }

    #[test]
    fn test_trigger_makes_block_dynamic_and_schedules() {
        let mut world = BallisticWorld::default();
        let mut block = sliding_block(&mut world, 1, 3.0);
        let mut reactor = CollapseReactor::from_tuning(&TuningConfig::default());

        let timer = reactor.trigger(&mut world, &mut block, 3.0, 10.0, 4).unwrap();
        assert_eq!(timer.generation, 4);
        assert!((timer.fires_at - 12.0).abs() < 1e-9);
        assert!(!block.is_static);
        assert_eq!(block.role, BlockRole::Collapsing);
        assert_eq!(reactor.hooked_body(), Some(block.body));

        world.step(SIM_DT, SIM_DT, 5);
        assert!(world.position(block.body).unwrap().y < 20.0);
    }

    #[test]
    fn test_hook_keeps_block_moving() {
        let mut world = BallisticWorld::default();
        let mut block = sliding_block(&mut world, 1, -3.0);
        let mut reactor = CollapseReactor::from_tuning(&TuningConfig::default());
        reactor.trigger(&mut world, &mut block, -3.0, 0.0, 1).unwrap();

        // Try to stop it; the hook restores the floor speeds next step
        world.set_velocity(block.body, Vec3::ZERO);
        world.set_angular_velocity(block.body, Vec3::ZERO);
        world.step(SIM_DT, SIM_DT, 5);

        let v = world.velocity(block.body).unwrap();
        let w = world.angular_velocity(block.body).unwrap();
        assert!(v.x <= -reactor.min_horizontal_speed + 1e-5);
        assert!(w.z >= reactor.min_spin - 1e-5);
    }

    #[test]
    fn test_second_trigger_moves_the_hook() {
        let mut world = BallisticWorld::default();
        let mut first = sliding_block(&mut world, 1, 3.0);
        let mut second = sliding_block(&mut world, 2, -3.0);
        let mut reactor = CollapseReactor::from_tuning(&TuningConfig::default());

        reactor.trigger(&mut world, &mut first, 3.0, 0.0, 1).unwrap();
        reactor.trigger(&mut world, &mut second, -3.0, 0.0, 2).unwrap();

        assert_eq!(world.hook_count(), 1);
        assert!(world.has_pre_step(second.body));
        assert!(!world.has_pre_step(first.body));
    }

    #[test]
    fn test_missing_body_is_an_error() {
        let mut world = BallisticWorld::default();
        let mut block = sliding_block(&mut world, 1, 3.0);
        world.remove_body(block.body);
        let mut reactor = CollapseReactor::from_tuning(&TuningConfig::default());

        let err = reactor.trigger(&mut world, &mut block, 3.0, 0.0, 1).unwrap_err();
        assert_eq!(err, TowerError::MissingBody(block.body));
        assert!(block.is_static);
        assert_eq!(reactor.hooked_body(), None);
    }
}
