//! Run lifecycle
//!
//! `Idle → Dropping → (Dropping | Collapsing → GameOver) → Idle` on reset.
//! The machine owns the run state and drives the physics and scene
//! collaborators it was built with. Operations invoked in the wrong phase
//! are ignored; collaborator failures are logged and the operation skipped.

use glam::{Quat, Vec3};

use super::block::{BlockEntity, BlockRole};
use super::collapse::CollapseReactor;
use super::judge::{PlacementJudge, PlacementResult};
use super::oscillation::OscillationController;
use super::reaper::StalePhysicsReaper;
use super::state::{GameEvent, GamePhase, TowerState};
use super::tick::TickInput;
use crate::consts::*;
use crate::physics::{BodyDesc, BodyMaterial, PhysicsWorld};
use crate::render::{BoxStyle, RenderScene, StylePicker};
use crate::tuning::{SpawnOrigin, TuningConfig};
use crate::{TowerError, full_size};

pub struct TowerStateMachine<P: PhysicsWorld, R: RenderScene> {
    physics: P,
    render: R,
    tuning: TuningConfig,
    state: TowerState,
    oscillator: OscillationController,
    judge: PlacementJudge,
    reactor: CollapseReactor,
    reaper: StalePhysicsReaper,
    styles: StylePicker,
}

impl<P: PhysicsWorld, R: RenderScene> TowerStateMachine<P, R> {
    /// Build an idle machine; call [`start`](Self::start) to begin
    pub fn new(physics: P, render: R, tuning: TuningConfig, seed: u64) -> Self {
        Self {
            physics,
            render,
            oscillator: OscillationController::new(
                tuning.oscillation_speed,
                tuning.oscillation_boundary,
            ),
            judge: PlacementJudge {
                perfect_threshold: tuning.perfect_threshold,
                overhang_threshold: tuning.overhang_threshold,
                overhang_tilt: tuning.overhang_tilt,
            },
            reactor: CollapseReactor::from_tuning(&tuning),
            reaper: StalePhysicsReaper::from_tuning(&tuning),
            styles: StylePicker::new(seed),
            state: TowerState::new(),
            tuning,
        }
    }

    pub fn state(&self) -> &TowerState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn score(&self) -> u32 {
        self.state.score
    }

    pub fn elapsed(&self) -> f32 {
        self.state.elapsed()
    }

    pub fn tuning(&self) -> &TuningConfig {
        &self.tuning
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn render(&self) -> &R {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut R {
        &mut self.render
    }

    pub fn oscillator(&self) -> &OscillationController {
        &self.oscillator
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.state.drain_events()
    }

    /// Create the ground and begin the first run
    pub fn start(&mut self) {
        if self.state.ground.is_some() {
            log::debug!("start ignored: tower already started");
            return;
        }
        let ground = self.create_block(GROUND_CENTER, BoxStyle::ground(), BlockRole::Ground);
        self.state.ground = Some(ground);
        self.begin_run();
    }

    /// Commit the sliding block. Returns the judgment, or None when the
    /// call was ignored (wrong phase, nothing sliding, collaborator gone).
    pub fn commit_placement(&mut self) -> Option<PlacementResult> {
        if self.state.phase != GamePhase::Dropping {
            log::debug!("commit ignored in {:?}", self.state.phase);
            return None;
        }
        let (Some(active), Some(top)) = (self.state.active_block(), self.state.top_block()) else {
            log::debug!("commit ignored: no active block");
            return None;
        };

        let result = self.judge.judge(active.position, top.position);
        let outcome = self.ensure_active_linked().and_then(|()| {
            if result.classification.is_success() {
                self.place_active(&result)
            } else {
                self.collapse_active(&result)
            }
        });

        match outcome {
            Ok(()) => Some(result),
            Err(e) => {
                log::warn!("commit skipped: {e}");
                None
            }
        }
    }

    /// Clear every block except the ground and start a fresh run.
    ///
    /// Accepted in any phase. A run still collapsing gets its game-over
    /// signal now; the scheduled one is invalidated.
    pub fn reset(&mut self) {
        if self.state.ground.is_none() {
            log::info!("reset before start; starting instead");
            self.start();
            return;
        }

        if self.state.phase == GamePhase::Collapsing {
            if let Some(timer) = self.state.pending_game_over.take() {
                if timer.generation == self.state.generation {
                    self.emit_game_over();
                }
            }
        }

        self.state.generation += 1;
        self.state.pending_game_over = None;
        self.reactor.release(&mut self.physics);
        self.clear_blocks();
        self.begin_run();
    }

    pub fn toggle_debug_visuals(&mut self) {
        self.state.debug_visuals = !self.state.debug_visuals;
        self.render.set_debug_visuals(self.state.debug_visuals);
        self.state.push_event(GameEvent::DebugVisualsToggled {
            enabled: self.state.debug_visuals,
        });
        log::info!("Debug visuals: {}", self.state.debug_visuals);
    }

    /// Advance one frame of `dt` seconds
    pub fn tick(&mut self, dt: f32, input: &TickInput) {
        // A non-finite frame would poison the clock for the rest of the run
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        self.state.ticks += 1;
        self.state.clock += dt as f64;

        if self.state.ground.is_none() {
            log::debug!("tick ignored: tower not started");
            return;
        }

        // Scheduled callbacks run on the tick boundary
        self.fire_due_timers();

        self.physics.step(SIM_DT, dt, MAX_SUBSTEPS);
        self.advance_active(dt);

        if input.reset {
            self.reset();
        } else if input.commit {
            self.commit_placement();
        }
        if input.toggle_debug {
            self.toggle_debug_visuals();
        }

        self.sync_transforms();

        if self.reaper.tick() {
            let report = self
                .reaper
                .sweep(&mut self.physics, &mut self.render, &mut self.state);
            if !report.is_empty() {
                self.state.push_event(GameEvent::Reaped {
                    fallen: report.fallen,
                    evicted: report.evicted,
                });
            }
        }

        if self.state.phase == GamePhase::Dropping {
            let elapsed = self.state.elapsed();
            self.state.push_event(GameEvent::TimeChanged { elapsed });
        }

        self.render.render_frame(self.state.focus());
    }

    fn begin_run(&mut self) {
        self.state.phase = GamePhase::Idle;
        self.state.score = 0;
        self.state.started_at = self.state.clock;
        self.state.final_elapsed = None;
        self.state.top_id = None;
        self.state.active_id = None;
        self.oscillator.reset();

        self.state.push_event(GameEvent::RunStarted {
            generation: self.state.generation,
        });
        self.state.push_event(GameEvent::ScoreChanged { score: 0 });

        match self.spawn_active() {
            Ok(()) => {
                self.state.phase = GamePhase::Dropping;
                log::info!("Run {} started", self.state.generation);
            }
            Err(e) => log::error!("could not spawn first block: {e}"),
        }
    }

    fn create_block(&mut self, position: Vec3, style: BoxStyle, role: BlockRole) -> BlockEntity {
        let id = self.state.next_block_id();
        let body = self.physics.create_body(BodyDesc {
            mass: 0.0,
            half_extents: BLOCK_HALF_EXTENTS,
            position,
            material: BodyMaterial::default(),
            tag: id,
        });
        let visual = self
            .render
            .create_box(full_size(BLOCK_HALF_EXTENTS), style, id);
        if let Err(e) = self.render.set_transform(visual, position, Quat::IDENTITY) {
            log::warn!("new block {id:?}: {e}");
        }
        BlockEntity::new(id, visual, body, position, role)
    }

    /// Both collaborators must still know the active block
    fn ensure_active_linked(&mut self) -> Result<(), TowerError> {
        let block = self.state.active_block().ok_or(TowerError::NotStarted)?;
        if self.physics.position(block.body).is_none() {
            return Err(TowerError::MissingBody(block.body));
        }
        self.render
            .set_transform(block.visual, block.position, block.orientation)
    }

    fn spawn_active(&mut self) -> Result<(), TowerError> {
        let top = self.state.top_block().ok_or(TowerError::NotStarted)?;
        let x = match self.tuning.spawn_origin {
            SpawnOrigin::AboveTop => top.position.x,
            SpawnOrigin::Edge => -self.oscillator.boundary,
        };
        let position = top.stacked_position(x);

        let style = self.styles.next_block();
        let block = self.create_block(position, style, BlockRole::Sliding);
        self.state.active_id = Some(block.id);
        self.state.blocks.push(block);
        Ok(())
    }

    fn place_active(&mut self, result: &PlacementResult) -> Result<(), TowerError> {
        let id = self.state.active_id.ok_or(TowerError::NotStarted)?;
        let orientation = self.judge.placement_orientation(result);
        let block = self
            .state
            .blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(TowerError::UnknownBlock(id))?;

        // Freeze horizontal motion and let it settle straight down
        if !self.physics.make_dynamic(block.body, self.tuning.block_mass) {
            return Err(TowerError::MissingBody(block.body));
        }
        self.physics.set_velocity(block.body, Vec3::ZERO);
        self.physics.set_angular_velocity(block.body, Vec3::ZERO);
        self.physics.set_orientation(block.body, orientation);
        block.is_static = false;
        block.orientation = orientation;
        block.role = BlockRole::Placed;

        self.state.top_id = Some(id);
        self.state.active_id = None;
        self.state.score += 1;
        self.state.push_event(GameEvent::ScoreChanged {
            score: self.state.score,
        });
        self.state.push_event(GameEvent::BlockPlaced {
            block: id,
            result: *result,
        });
        log::info!(
            "Placed block {:?}: {:?} (offset {:.2}), score {}",
            id,
            result.classification,
            result.offset,
            self.state.score
        );

        self.spawn_active()
    }

    fn collapse_active(&mut self, result: &PlacementResult) -> Result<(), TowerError> {
        let id = self.state.active_id.ok_or(TowerError::NotStarted)?;
        let now = self.state.clock;
        let generation = self.state.generation;
        let elapsed = self.state.elapsed();
        let block = self
            .state
            .blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(TowerError::UnknownBlock(id))?;

        let timer = self
            .reactor
            .trigger(&mut self.physics, block, result.offset, now, generation)?;

        self.state.final_elapsed = Some(elapsed);
        self.state.pending_game_over = Some(timer);
        self.state.phase = GamePhase::Collapsing;
        self.state.push_event(GameEvent::Collapsed {
            block: id,
            offset: result.offset,
        });
        Ok(())
    }

    fn fire_due_timers(&mut self) {
        let Some(timer) = self.state.pending_game_over else {
            return;
        };
        if timer.generation != self.state.generation {
            log::debug!("dropping stale game-over from run {}", timer.generation);
            self.state.pending_game_over = None;
            return;
        }
        if !timer.is_due(self.state.clock) {
            return;
        }

        self.state.pending_game_over = None;
        self.state.phase = GamePhase::GameOver;
        self.emit_game_over();
        if self.tuning.auto_restart {
            self.reset();
        }
    }

    fn emit_game_over(&mut self) {
        let score = self.state.score;
        let elapsed = self.state.elapsed();
        log::info!("Game over! Score {score}, {elapsed:.1}s");
        self.state.push_event(GameEvent::GameOver { score, elapsed });
    }

    fn advance_active(&mut self, dt: f32) {
        if self.state.phase != GamePhase::Dropping {
            return;
        }
        // Ride on whatever the top settled to
        let Some(rest_y) = self.state.top_block().map(|top| top.stacked_position(0.0).y) else {
            return;
        };
        let Some(block) = self.state.active_block_mut() else {
            return;
        };
        if !block.is_static {
            return;
        }
        block.position.y = rest_y;
        self.oscillator.advance(dt, block);
        if !self.physics.set_position(block.body, block.position) {
            log::warn!("sliding block {:?} lost its body", block.id);
        }
    }

    /// Copy physics transforms onto dynamic blocks and push every block's
    /// transform to the scene
    fn sync_transforms(&mut self) {
        let physics = &self.physics;
        let render = &mut self.render;
        for block in self
            .state
            .ground
            .iter_mut()
            .chain(self.state.blocks.iter_mut())
        {
            if !block.is_static {
                match (physics.position(block.body), physics.orientation(block.body)) {
                    (Some(position), Some(orientation)) => {
                        block.position = position;
                        block.orientation = orientation;
                    }
                    _ => {
                        log::warn!("sync: block {:?} has no body", block.id);
                        continue;
                    }
                }
            }
            if let Err(e) = render.set_transform(block.visual, block.position, block.orientation) {
                log::warn!("sync: {e}");
            }
        }
    }

    /// Release every non-ground block and any untracked body
    fn clear_blocks(&mut self) {
        for block in self.state.blocks.drain(..) {
            self.physics.remove_body(block.body);
            self.render.remove(block.visual);
        }
        let ground_body = self.state.ground.as_ref().map(|g| g.body);
        for handle in self.physics.body_handles() {
            if Some(handle) != ground_body {
                self.physics.remove_body(handle);
            }
        }
        self.state.top_id = None;
        self.state.active_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::BallisticWorld;
    use crate::render::SceneRecorder;
    use crate::sim::judge::Classification;

    type Machine = TowerStateMachine<BallisticWorld, SceneRecorder>;

    fn started() -> Machine {
        let mut m = Machine::new(
            BallisticWorld::default(),
            SceneRecorder::new(),
            TuningConfig::default(),
            1,
        );
        m.start();
        m
    }

    fn idle_ticks(m: &mut Machine, n: usize) {
        for _ in 0..n {
            m.tick(SIM_DT, &TickInput::default());
        }
    }

    fn active_x(m: &Machine) -> f32 {
        m.state().active_block().unwrap().position.x
    }

    fn game_overs(events: &[GameEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count()
    }

    #[test]
    fn test_start_spawns_first_block() {
        let m = started();
        assert_eq!(m.phase(), GamePhase::Dropping);
        assert_eq!(m.score(), 0);
        let active = m.state().active_block().unwrap();
        assert_eq!(active.position, Vec3::new(0.0, 0.5, 0.0));
        assert!(active.is_static);
        assert!(m.state().top_block().unwrap().is_ground());
        assert_eq!(m.physics().body_count(), 2);
        assert_eq!(m.render().len(), 2);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut m = started();
        m.start();
        assert_eq!(m.physics().body_count(), 2);
    }

    #[test]
    fn test_commit_before_start_is_noop() {
        let mut m = Machine::new(
            BallisticWorld::default(),
            SceneRecorder::new(),
            TuningConfig::default(),
            1,
        );
        assert_eq!(m.commit_placement(), None);
        assert_eq!(m.phase(), GamePhase::Idle);
        m.tick(SIM_DT, &TickInput::commit());
        assert_eq!(m.physics().body_count(), 0);
    }

    #[test]
    fn test_oscillation_moves_active_block_and_body() {
        let mut m = started();
        idle_ticks(&mut m, 10);
        let x = active_x(&m);
        assert!((x - 1.0).abs() < 1e-4, "x = {x}");
        let body = m.state().active_block().unwrap().body;
        assert!((m.physics().position(body).unwrap().x - x).abs() < 1e-6);
    }

    #[test]
    fn test_perfect_commit_places_and_spawns() {
        let mut m = started();
        let first = m.state().active_id.unwrap();
        let result = m.commit_placement().unwrap();
        assert_eq!(result.classification, Classification::Perfect);
        assert_eq!(m.score(), 1);
        assert_eq!(m.state().top_id, Some(first));
        let next = m.state().active_block().unwrap();
        assert_ne!(next.id, first);
        assert_eq!(next.position.y, 1.5);
        assert_eq!(m.phase(), GamePhase::Dropping);
    }

    #[test]
    fn test_commit_via_tick_uses_same_tick_position() {
        let mut m = started();
        idle_ticks(&mut m, 4);
        let before = active_x(&m);
        m.tick(SIM_DT, &TickInput::commit());
        let placed = m.state().top_block().unwrap();
        assert!((placed.position.x - (before + 0.1)).abs() < 1e-4);
    }

    #[test]
    fn test_overhang_tilts_placed_block() {
        let mut m = started();
        idle_ticks(&mut m, 10);
        let result = m.commit_placement().unwrap();
        assert_eq!(result.classification, Classification::Overhang);
        let placed = m.state().top_block().unwrap();
        assert!((placed.orientation.to_scaled_axis().z - 0.2).abs() < 1e-5);
        assert_eq!(m.score(), 1);
    }

    #[test]
    fn test_commit_ignored_while_collapsing() {
        let mut m = started();
        idle_ticks(&mut m, 30);
        let result = m.commit_placement().unwrap();
        assert_eq!(result.classification, Classification::Miss);
        assert_eq!(m.phase(), GamePhase::Collapsing);
        assert_eq!(m.commit_placement(), None);
        assert_eq!(m.score(), 0);
    }

    #[test]
    fn test_miss_fires_game_over_once_then_restarts() {
        let mut m = started();
        idle_ticks(&mut m, 30);
        m.commit_placement().unwrap();
        m.drain_events();

        let mut events = Vec::new();
        for _ in 0..(2.5 / SIM_DT) as usize {
            m.tick(SIM_DT, &TickInput::default());
            events.extend(m.drain_events());
        }
        assert_eq!(game_overs(&events), 1);
        assert_eq!(m.phase(), GamePhase::Dropping);
        assert_eq!(m.score(), 0);
        assert_eq!(m.state().generation, 1);
    }

    #[test]
    fn test_reset_during_collapse_emits_once() {
        let mut m = started();
        idle_ticks(&mut m, 30);
        m.commit_placement().unwrap();
        idle_ticks(&mut m, 30);
        m.drain_events();

        m.reset();
        let mut events = m.drain_events();
        for _ in 0..(3.0 / SIM_DT) as usize {
            m.tick(SIM_DT, &TickInput::default());
            events.extend(m.drain_events());
        }
        assert_eq!(game_overs(&events), 1);
        assert_eq!(m.phase(), GamePhase::Dropping);
    }

    #[test]
    fn test_reset_clears_everything_but_ground() {
        let mut m = started();
        for _ in 0..3 {
            m.commit_placement().unwrap();
            idle_ticks(&mut m, 2);
        }
        assert_eq!(m.score(), 3);

        m.reset();
        assert_eq!(m.score(), 0);
        assert_eq!(m.phase(), GamePhase::Dropping);
        assert!(m.state().top_block().unwrap().is_ground());
        assert_eq!(m.state().blocks.len(), 1);
        assert_eq!(m.physics().body_count(), 2);
        assert_eq!(m.render().len(), 2);
    }

    #[test]
    fn test_time_events_while_dropping() {
        let mut m = started();
        m.drain_events();
        idle_ticks(&mut m, 60);
        let last_time = m
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::TimeChanged { elapsed } => Some(elapsed),
                _ => None,
            })
            .last()
            .unwrap();
        assert!((last_time - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_debug_toggle_does_not_touch_state() {
        let mut m = started();
        let before = (m.phase(), m.score(), m.state().active_id);
        let input = TickInput {
            toggle_debug: true,
            ..Default::default()
        };
        m.tick(SIM_DT, &input);
        assert!(m.render().debug_visuals);
        assert_eq!(before, (m.phase(), m.score(), m.state().active_id));
    }

    #[test]
    fn test_non_finite_dt_is_ignored() {
        let mut m = started();
        idle_ticks(&mut m, 3);
        m.tick(f32::NAN, &TickInput::default());
        m.tick(f32::INFINITY, &TickInput::default());
        assert!((active_x(&m) - 0.3).abs() < 1e-4);
        assert!(m.elapsed().is_finite());

        // A collapse still reaches game over after a bad frame
        idle_ticks(&mut m, 27);
        m.commit_placement().unwrap();
        m.tick(f32::NAN, &TickInput::default());
        m.drain_events();
        let mut events = Vec::new();
        for _ in 0..(2.5 / SIM_DT) as usize {
            m.tick(SIM_DT, &TickInput::default());
            events.extend(m.drain_events());
        }
        assert_eq!(game_overs(&events), 1);
        assert_eq!(m.phase(), GamePhase::Dropping);
    }

    #[test]
    fn test_commit_skipped_when_body_is_gone() {
        let mut m = started();
        m.commit_placement().unwrap();
        let before = (m.score(), m.phase(), m.state().top_id);
        let body = m.state().active_block().unwrap().body;
        assert!(m.physics.remove_body(body));

        assert_eq!(m.commit_placement(), None);
        assert_eq!(before, (m.score(), m.phase(), m.state().top_id));
        idle_ticks(&mut m, 30);
        assert_eq!(m.commit_placement(), None);
        assert_eq!(before, (m.score(), m.phase(), m.state().top_id));
    }

    #[test]
    fn test_commit_skipped_when_visual_is_gone() {
        let mut m = started();
        m.commit_placement().unwrap();
        let before = (m.score(), m.phase(), m.state().top_id);
        let visual = m.state().active_block().unwrap().visual;
        assert!(m.render.remove(visual));

        assert_eq!(m.commit_placement(), None);
        assert_eq!(before, (m.score(), m.phase(), m.state().top_id));
        idle_ticks(&mut m, 10);
        assert_eq!(before, (m.score(), m.phase(), m.state().top_id));
    }

    #[test]
    fn test_active_block_follows_sunken_tower() {
        let mut m = started();
        m.commit_placement().unwrap();
        m.commit_placement().unwrap();
        assert_eq!(m.state().active_block().unwrap().position.y, 2.5);

        // Pull the bottom block out from under the tower
        let bottom = m.state().blocks[0].clone();
        assert!(m.physics.remove_body(bottom.body));
        m.render.remove(bottom.visual);
        m.state.blocks.retain(|b| b.id != bottom.id);

        idle_ticks(&mut m, 120);
        let top_y = m.state().top_block().unwrap().position.y;
        assert!((top_y - 0.5).abs() < 1e-3, "top y = {top_y}");
        let active_y = m.state().active_block().unwrap().position.y;
        assert!((active_y - 1.5).abs() < 1e-3, "active y = {active_y}");
    }

    #[test]
    fn test_edge_spawn_origin() {
        let tuning = TuningConfig {
            spawn_origin: SpawnOrigin::Edge,
            ..Default::default()
        };
        let mut m = Machine::new(BallisticWorld::default(), SceneRecorder::new(), tuning, 1);
        m.start();
        assert_eq!(active_x(&m), -5.0);
    }

    #[test]
    fn test_no_auto_restart_stays_game_over() {
        let tuning = TuningConfig {
            auto_restart: false,
            ..Default::default()
        };
        let mut m = Machine::new(BallisticWorld::default(), SceneRecorder::new(), tuning, 1);
        m.start();
        idle_ticks(&mut m, 30);
        m.commit_placement().unwrap();
        idle_ticks(&mut m, (2.2 / SIM_DT) as usize);
        assert_eq!(m.phase(), GamePhase::GameOver);
        assert_eq!(m.commit_placement(), None);

        m.tick(SIM_DT, &TickInput::reset());
        assert_eq!(m.phase(), GamePhase::Dropping);
    }
}
