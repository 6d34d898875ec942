//! Rigid-body physics collaborator
//!
//! The tower core only talks to physics through [`PhysicsWorld`]. Bodies are
//! boxes; each carries the [`BlockId`] tag of the block that owns it so the
//! body → block → visual link never relies on position matching.

pub mod ballistic;

pub use ballistic::BallisticWorld;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::sim::BlockId;

/// Opaque handle to a physics body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Surface properties of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for BodyMaterial {
    fn default() -> Self {
        Self {
            friction: 0.3,
            restitution: 0.0,
        }
    }
}

/// Everything needed to create a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    /// Zero mass = static (kinematic, ignores gravity)
    pub mass: f32,
    pub half_extents: Vec3,
    pub position: Vec3,
    pub material: BodyMaterial,
    /// Owning block
    pub tag: BlockId,
}

/// Mutable motion view handed to a pre-step hook
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMotion {
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

/// Callback run once per physics step for a single body, before integration
pub type PreStepHook = Box<dyn FnMut(&mut BodyMotion)>;

/// Narrow interface the tower core consumes from a physics engine
pub trait PhysicsWorld {
    /// Add a body; zero mass makes it static
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Remove a body (and its hook). Returns false if it was unknown.
    fn remove_body(&mut self, handle: BodyHandle) -> bool;

    /// Advance by `real_dt` using fixed `fixed_dt` substeps (at most
    /// `max_sub_steps`). Returns the number of substeps taken.
    fn step(&mut self, fixed_dt: f32, real_dt: f32, max_sub_steps: u32) -> u32;

    /// Switch a static body to dynamic with the given mass
    fn make_dynamic(&mut self, handle: BodyHandle, mass: f32) -> bool;

    fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> bool;
    fn set_orientation(&mut self, handle: BodyHandle, orientation: Quat) -> bool;
    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> bool;
    fn set_angular_velocity(&mut self, handle: BodyHandle, angular_velocity: Vec3) -> bool;

    /// Instantaneous impulse at a world-space point
    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3, point: Vec3) -> bool;
    /// Force at a world-space point, accumulated until the next substep
    fn apply_force(&mut self, handle: BodyHandle, force: Vec3, point: Vec3) -> bool;
    /// Torque accumulated until the next substep
    fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3) -> bool;

    fn position(&self, handle: BodyHandle) -> Option<Vec3>;
    fn orientation(&self, handle: BodyHandle) -> Option<Quat>;
    fn velocity(&self, handle: BodyHandle) -> Option<Vec3>;
    fn angular_velocity(&self, handle: BodyHandle) -> Option<Vec3>;

    /// Install (Some) or clear (None) the body's single pre-step hook.
    /// Installing replaces any previous hook on that body.
    fn set_pre_step(&mut self, handle: BodyHandle, hook: Option<PreStepHook>) -> bool;

    /// Block that owns this body
    fn tag_of(&self, handle: BodyHandle) -> Option<BlockId>;

    /// All live bodies in creation order
    fn body_handles(&self) -> Vec<BodyHandle>;

    fn body_count(&self) -> usize;
}
