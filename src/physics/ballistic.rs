//! Built-in box world
//!
//! Enough rigid-body behaviour to drive the tower: gravity, semi-implicit
//! Euler integration, per-body pre-step hooks, resting contact on whatever
//! body is directly underneath (axis-aligned footprint test), Coulomb-style
//! friction and sleeping of settled bodies. Orientation is integrated for
//! display only; contacts ignore it.
//!
//! Stepping follows the accumulator model: real time is banked and consumed
//! in fixed substeps, with leftover time beyond `max_sub_steps` discarded.

use glam::{Quat, Vec3};

use super::{BodyDesc, BodyHandle, BodyMaterial, BodyMotion, PhysicsWorld, PreStepHook};
use crate::sim::BlockId;

/// Speed below which a resting body counts as settled
const SLEEP_SPEED: f32 = 0.05;
/// Consecutive settled steps before a body sleeps
const SLEEP_STEPS: u32 = 30;
/// Slack on the footprint overlap test so touching edges do not support
const FOOTPRINT_SLOP: f32 = 1e-3;

struct Body {
    handle: BodyHandle,
    tag: BlockId,
    mass: f32,
    half_extents: Vec3,
    material: BodyMaterial,
    position: Vec3,
    orientation: Quat,
    velocity: Vec3,
    angular_velocity: Vec3,
    force: Vec3,
    torque: Vec3,
    sleeping: bool,
    settled_steps: u32,
    pre_step: Option<PreStepHook>,
}

impl Body {
    fn is_dynamic(&self) -> bool {
        self.mass > 0.0
    }

    /// Diagonal inverse inertia of a solid box
    fn inv_inertia(&self) -> Vec3 {
        if !self.is_dynamic() {
            return Vec3::ZERO;
        }
        let h = self.half_extents;
        let k = self.mass / 3.0;
        Vec3::new(
            1.0 / (k * (h.y * h.y + h.z * h.z)),
            1.0 / (k * (h.x * h.x + h.z * h.z)),
            1.0 / (k * (h.x * h.x + h.y * h.y)),
        )
    }

    fn top(&self) -> f32 {
        self.position.y + self.half_extents.y
    }

    fn bottom(&self) -> f32 {
        self.position.y - self.half_extents.y
    }

    fn footprint_overlaps(&self, other: &Body) -> bool {
        let d = (self.position - other.position).abs();
        d.x < self.half_extents.x + other.half_extents.x - FOOTPRINT_SLOP
            && d.z < self.half_extents.z + other.half_extents.z - FOOTPRINT_SLOP
    }

    fn wake(&mut self) {
        self.sleeping = false;
        self.settled_steps = 0;
    }
}

/// Small deterministic box world
pub struct BallisticWorld {
    gravity: Vec3,
    bodies: Vec<Body>,
    accumulator: f32,
    next_handle: u32,
    /// Total fixed substeps taken since creation
    pub steps_taken: u64,
}

impl Default for BallisticWorld {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, crate::consts::GRAVITY, 0.0))
    }
}

impl BallisticWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            bodies: Vec::new(),
            accumulator: 0.0,
            next_handle: 1,
            steps_taken: 0,
        }
    }

    /// Whether the body is asleep (settled and not integrating)
    pub fn is_sleeping(&self, handle: BodyHandle) -> Option<bool> {
        self.body(handle).map(|b| b.sleeping)
    }

    /// Whether the body currently has a pre-step hook
    pub fn has_pre_step(&self, handle: BodyHandle) -> bool {
        self.body(handle).is_some_and(|b| b.pre_step.is_some())
    }

    /// Number of bodies that currently carry a pre-step hook
    pub fn hook_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.pre_step.is_some()).count()
    }

    fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.iter().find(|b| b.handle == handle)
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.handle == handle)
    }

    /// One fixed substep
    fn internal_step(&mut self, dt: f32) {
        // Hooks, then integration
        for body in self.bodies.iter_mut() {
            if !body.is_dynamic() || body.sleeping {
                continue;
            }

            if let Some(hook) = body.pre_step.as_mut() {
                let mut motion = BodyMotion {
                    position: body.position,
                    velocity: body.velocity,
                    angular_velocity: body.angular_velocity,
                };
                hook(&mut motion);
                body.position = motion.position;
                body.velocity = motion.velocity;
                body.angular_velocity = motion.angular_velocity;
            }

            let inv_mass = 1.0 / body.mass;
            body.velocity += (self.gravity + body.force * inv_mass) * dt;
            body.angular_velocity += body.torque * body.inv_inertia() * dt;
            body.position += body.velocity * dt;

            let spin = body.angular_velocity * dt;
            if spin.length_squared() > 0.0 {
                body.orientation = (Quat::from_scaled_axis(spin) * body.orientation).normalize();
            }

            body.force = Vec3::ZERO;
            body.torque = Vec3::ZERO;
        }

        // Resting contact: find the highest supporting top under each awake body
        let mut supports: Vec<(usize, f32, f32)> = Vec::new();
        for (i, body) in self.bodies.iter().enumerate() {
            if !body.is_dynamic() || body.sleeping {
                continue;
            }
            let support = self
                .bodies
                .iter()
                .enumerate()
                .filter(|(j, other)| {
                    *j != i
                        && other.position.y < body.position.y
                        && body.bottom() < other.top()
                        && body.footprint_overlaps(other)
                })
                .map(|(_, other)| (other.top(), other.material.friction))
                .fold(None, |best: Option<(f32, f32)>, (top, friction)| match best {
                    Some((best_top, _)) if best_top >= top => best,
                    _ => Some((top, friction)),
                });
            if let Some((top, friction)) = support {
                supports.push((i, top, friction));
            }
        }

        let g = self.gravity.length();
        for (i, top, other_friction) in supports {
            let body = &mut self.bodies[i];
            body.position.y = top + body.half_extents.y;
            if body.velocity.y < 0.0 {
                body.velocity.y = -body.velocity.y * body.material.restitution;
            }

            // Coulomb friction on the horizontal velocity
            let mu = (body.material.friction * other_friction).sqrt();
            let horizontal = Vec3::new(body.velocity.x, 0.0, body.velocity.z);
            let speed = horizontal.length();
            if speed > 0.0 {
                let slowed = (speed - mu * g * dt).max(0.0);
                let scaled = horizontal * (slowed / speed);
                body.velocity.x = scaled.x;
                body.velocity.z = scaled.z;
            }

            let settled = body.pre_step.is_none()
                && body.velocity.length() < SLEEP_SPEED
                && body.angular_velocity.length() < SLEEP_SPEED;
            if settled {
                body.settled_steps += 1;
                if body.settled_steps >= SLEEP_STEPS {
                    body.sleeping = true;
                    body.velocity = Vec3::ZERO;
                    body.angular_velocity = Vec3::ZERO;
                }
            } else {
                body.settled_steps = 0;
            }
        }

        self.steps_taken += 1;
    }
}

impl PhysicsWorld for BallisticWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.push(Body {
            handle,
            tag: desc.tag,
            mass: desc.mass.max(0.0),
            half_extents: desc.half_extents,
            material: desc.material,
            position: desc.position,
            orientation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            sleeping: false,
            settled_steps: 0,
            pre_step: None,
        });
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let before = self.bodies.len();
        self.bodies.retain(|b| b.handle != handle);
        let removed = self.bodies.len() != before;
        if removed {
            // A removed support must not leave sleepers hanging in the air
            for body in self.bodies.iter_mut() {
                body.wake();
            }
        }
        removed
    }

    fn step(&mut self, fixed_dt: f32, real_dt: f32, max_sub_steps: u32) -> u32 {
        if max_sub_steps == 0 {
            self.internal_step(fixed_dt);
            return 1;
        }

        self.accumulator += real_dt.max(0.0);
        let mut substeps = 0;
        while self.accumulator >= fixed_dt && substeps < max_sub_steps {
            self.internal_step(fixed_dt);
            self.accumulator -= fixed_dt;
            substeps += 1;
        }
        self.accumulator %= fixed_dt;
        substeps
    }

    fn make_dynamic(&mut self, handle: BodyHandle, mass: f32) -> bool {
        match self.body_mut(handle) {
            Some(body) => {
                body.mass = mass.max(f32::EPSILON);
                body.wake();
                true
            }
            None => false,
        }
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> bool {
        self.body_mut(handle).map(|b| b.position = position).is_some()
    }

    fn set_orientation(&mut self, handle: BodyHandle, orientation: Quat) -> bool {
        self.body_mut(handle)
            .map(|b| b.orientation = orientation.normalize())
            .is_some()
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> bool {
        self.body_mut(handle)
            .map(|b| {
                b.velocity = velocity;
                b.wake();
            })
            .is_some()
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, angular_velocity: Vec3) -> bool {
        self.body_mut(handle)
            .map(|b| {
                b.angular_velocity = angular_velocity;
                b.wake();
            })
            .is_some()
    }

    fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3, point: Vec3) -> bool {
        let Some(body) = self.body_mut(handle) else {
            return false;
        };
        if body.is_dynamic() {
            let r = point - body.position;
            body.velocity += impulse / body.mass;
            body.angular_velocity += r.cross(impulse) * body.inv_inertia();
            body.wake();
        }
        true
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec3, point: Vec3) -> bool {
        let Some(body) = self.body_mut(handle) else {
            return false;
        };
        let r = point - body.position;
        body.force += force;
        body.torque += r.cross(force);
        body.wake();
        true
    }

    fn apply_torque(&mut self, handle: BodyHandle, torque: Vec3) -> bool {
        let Some(body) = self.body_mut(handle) else {
            return false;
        };
        body.torque += torque;
        body.wake();
        true
    }

    fn position(&self, handle: BodyHandle) -> Option<Vec3> {
        self.body(handle).map(|b| b.position)
    }

    fn orientation(&self, handle: BodyHandle) -> Option<Quat> {
        self.body(handle).map(|b| b.orientation)
    }

    fn velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        self.body(handle).map(|b| b.velocity)
    }

    fn angular_velocity(&self, handle: BodyHandle) -> Option<Vec3> {
        self.body(handle).map(|b| b.angular_velocity)
    }

    fn set_pre_step(&mut self, handle: BodyHandle, hook: Option<PreStepHook>) -> bool {
        match self.body_mut(handle) {
            Some(body) => {
                body.pre_step = hook;
                body.wake();
                true
            }
            None => false,
        }
    }

    fn tag_of(&self, handle: BodyHandle) -> Option<BlockId> {
        self.body(handle).map(|b| b.tag)
    }

    fn body_handles(&self) -> Vec<BodyHandle> {
        self.bodies.iter().map(|b| b.handle).collect()
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BLOCK_HALF_EXTENTS, GROUND_CENTER, SIM_DT};

    fn desc(mass: f32, position: Vec3, tag: u32) -> BodyDesc {
        BodyDesc {
            mass,
            half_extents: BLOCK_HALF_EXTENTS,
            position,
            material: BodyMaterial::default(),
            tag: BlockId(tag),
        }
    }

    fn run(world: &mut BallisticWorld, seconds: f32) {
        let steps = (seconds / SIM_DT).round() as u32;
        for _ in 0..steps {
            world.step(SIM_DT, SIM_DT, 5);
        }
    }

    #[test]
    fn test_static_body_ignores_gravity() {
        let mut world = BallisticWorld::default();
        let h = world.create_body(desc(0.0, Vec3::new(0.0, 3.0, 0.0), 1));
        run(&mut world, 1.0);
        assert_eq!(world.position(h), Some(Vec3::new(0.0, 3.0, 0.0)));
    }

    #[test]
    fn test_block_rests_on_ground() {
        let mut world = BallisticWorld::default();
        world.create_body(desc(0.0, GROUND_CENTER, 0));
        let h = world.create_body(desc(1.0, Vec3::new(0.3, 0.5, 0.0), 1));
        run(&mut world, 2.0);

        let pos = world.position(h).unwrap();
        assert!((pos.y - 0.5).abs() < 1e-3, "block sank to {}", pos.y);
        assert!((pos.x - 0.3).abs() < 1e-3);
        assert_eq!(world.is_sleeping(h), Some(true));
    }

    #[test]
    fn test_block_off_the_edge_falls() {
        let mut world = BallisticWorld::default();
        world.create_body(desc(0.0, GROUND_CENTER, 0));
        let h = world.create_body(desc(1.0, Vec3::new(6.0, 0.5, 0.0), 1));
        run(&mut world, 2.5);
        assert!(world.position(h).unwrap().y < -20.0);
    }

    #[test]
    fn test_pre_step_hook_runs_and_is_replaced() {
        let mut world = BallisticWorld::default();
        let h = world.create_body(desc(1.0, Vec3::new(0.0, 50.0, 0.0), 1));

        world.set_pre_step(h, Some(Box::new(|m: &mut BodyMotion| m.velocity.x = 1.0)));
        world.set_pre_step(h, Some(Box::new(|m: &mut BodyMotion| m.velocity.x = -2.0)));
        assert_eq!(world.hook_count(), 1);

        world.step(SIM_DT, SIM_DT, 5);
        assert_eq!(world.velocity(h).unwrap().x, -2.0);

        world.set_pre_step(h, None);
        assert!(!world.has_pre_step(h));
    }

    #[test]
    fn test_substeps_are_capped() {
        let mut world = BallisticWorld::default();
        world.create_body(desc(1.0, Vec3::ZERO, 1));
        assert_eq!(world.step(SIM_DT, 1.0, 5), 5);
        // Leftover time beyond the cap is dropped, not banked
        assert_eq!(world.step(SIM_DT, 0.0, 5), 0);
        assert_eq!(world.step(SIM_DT, 0.0, 0), 1);
    }

    #[test]
    fn test_removed_support_wakes_sleepers() {
        let mut world = BallisticWorld::default();
        let ground = world.create_body(desc(0.0, GROUND_CENTER, 0));
        let h = world.create_body(desc(1.0, Vec3::new(0.0, 0.5, 0.0), 1));
        run(&mut world, 1.0);
        assert_eq!(world.is_sleeping(h), Some(true));

        assert!(world.remove_body(ground));
        assert!(!world.remove_body(ground));
        run(&mut world, 0.5);
        assert!(world.position(h).unwrap().y < 0.0);
    }

    #[test]
    fn test_tags_and_handles() {
        let mut world = BallisticWorld::default();
        let a = world.create_body(desc(0.0, Vec3::ZERO, 7));
        let b = world.create_body(desc(0.0, Vec3::ONE, 9));
        assert_eq!(world.body_handles(), vec![a, b]);
        assert_eq!(world.tag_of(b), Some(BlockId(9)));
        assert_eq!(world.body_count(), 2);
    }

    #[test]
    fn test_impulse_off_center_spins() {
        let mut world = BallisticWorld::new(Vec3::ZERO);
        let h = world.create_body(desc(1.0, Vec3::ZERO, 1));
        world.apply_impulse(h, Vec3::new(0.0, 1.0, 0.0), Vec3::new(2.5, 0.0, 0.0));
        assert!(world.velocity(h).unwrap().y > 0.0);
        assert!(world.angular_velocity(h).unwrap().z > 0.0);
    }
}
