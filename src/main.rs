//! Tower Stack entry point
//!
//! Browser: canvas renderer, DOM HUD and keyboard/mouse input.
//! Native: headless autopilot that plays one run and logs it.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, KeyboardEvent, MouseEvent};

    use tower_stack::audio::{AudioManager, SoundEffect};
    use tower_stack::consts::*;
    use tower_stack::physics::BallisticWorld;
    use tower_stack::render::CanvasScene;
    use tower_stack::sim::{Classification, GameEvent, Intent, TickInput, TowerStateMachine};
    use tower_stack::ui::{Presenter, dispatch, format_elapsed};
    use tower_stack::{HighScores, Settings, TuningConfig};

    /// LocalStorage key for a tuning override
    const TUNING_KEY: &str = "tower_stack_tuning";

    /// Writes score, timer and the game-over banner into the page
    struct DomPresenter {
        document: Document,
        show_timer: bool,
    }

    impl DomPresenter {
        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }

        fn set_visible(&self, id: &str, visible: bool) {
            if let Some(el) = self.document.get_element_by_id(id) {
                let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
            }
        }
    }

    impl Presenter for DomPresenter {
        fn score_changed(&mut self, score: u32) {
            self.set_text("score", &score.to_string());
            // A new run resets the score, so the banner can go
            if score == 0 {
                self.set_visible("game-over", false);
            }
        }

        fn time_changed(&mut self, elapsed_secs: f32) {
            if self.show_timer {
                self.set_text("time", &format_elapsed(elapsed_secs));
            }
        }

        fn game_over(&mut self, score: u32, elapsed_secs: f32) {
            self.set_text("final-score", &score.to_string());
            self.set_text("final-time", &format_elapsed(elapsed_secs));
            self.set_visible("game-over", true);
        }

        fn debug_toggled(&mut self, enabled: bool) {
            self.set_visible("debug-badge", enabled);
        }
    }

    /// Game instance holding all state
    struct Game {
        machine: TowerStateMachine<BallisticWorld, CanvasScene>,
        input: TickInput,
        last_time: f64,
        hud: DomPresenter,
        settings: Settings,
        high_scores: HighScores,
        audio: AudioManager,
    }

    impl Game {
        /// Advance one animation frame
        fn frame(&mut self, dt: f32) {
            self.machine.tick(dt, &self.input);
            self.input.clear();

            let events = self.machine.drain_events();
            self.react(&events);
            dispatch(events, &mut self.hud);
        }

        /// Sounds and leaderboard bookkeeping
        fn react(&mut self, events: &[GameEvent]) {
            for event in events {
                match *event {
                    GameEvent::BlockPlaced { result, .. } => {
                        let height = self.machine.score();
                        let effect = if result.classification == Classification::Perfect {
                            SoundEffect::Perfect { height }
                        } else {
                            SoundEffect::Place { height }
                        };
                        self.audio.play(effect);
                    }
                    GameEvent::Collapsed { .. } => self.audio.play(SoundEffect::Collapse),
                    GameEvent::GameOver { score, elapsed } => {
                        self.audio.play(SoundEffect::GameOver { height: score });
                        if let Some(rank) =
                            self.high_scores.add_score(score, elapsed, js_sys::Date::now())
                        {
                            log::info!("New high score! Rank #{rank}");
                            self.high_scores.save();
                            self.audio.play(SoundEffect::HighScore { height: score });
                            self.render_high_scores();
                        }
                    }
                    _ => {}
                }
            }
        }

        fn render_high_scores(&self) {
            let text = self
                .high_scores
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{}. {} ({})", i + 1, e.score, format_elapsed(e.elapsed_secs)))
                .collect::<Vec<_>>()
                .join("\n");
            self.hud.set_text("high-scores", &text);
        }

        fn toggle_mute(&mut self) {
            let muted = self.settings.toggle_mute();
            self.settings.save();
            self.audio.apply_settings(&self.settings);
            self.hud.set_text("mute", if muted { "muted" } else { "sound on" });
        }
    }

    fn load_tuning() -> TuningConfig {
        let json = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .and_then(|s| s.get_item(TUNING_KEY).ok())
            .flatten();
        match json.map(|j| TuningConfig::from_json(&j)) {
            Some(Ok(tuning)) => {
                log::info!("Using tuning override from LocalStorage");
                tuning
            }
            Some(Err(e)) => {
                log::warn!("Ignoring tuning override: {e}");
                TuningConfig::default()
            }
            None => TuningConfig::default(),
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Tower Stack starting...");

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let scene = CanvasScene::from_canvas_id("canvas")?;
        let tuning = load_tuning();
        let physics = BallisticWorld::new(glam::Vec3::new(0.0, tuning.gravity, 0.0));
        let seed = js_sys::Date::now() as u64;
        let mut machine = TowerStateMachine::new(physics, scene, tuning, seed);

        let settings = Settings::load();
        let audio = AudioManager::new(&settings);
        if settings.debug_visuals {
            machine.toggle_debug_visuals();
        }
        machine.start();

        let hud = DomPresenter {
            document: document.clone(),
            show_timer: settings.show_timer,
        };
        hud.set_visible("time", settings.show_timer);

        let game = Rc::new(RefCell::new(Game {
            machine,
            input: TickInput::default(),
            last_time: 0.0,
            hud,
            settings,
            high_scores: HighScores::load(),
            audio,
        }));
        game.borrow().render_high_scores();

        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(&document, game.clone())?;
        request_animation_frame(game);

        log::info!("Tower Stack running!");
        Ok(())
    }

    fn setup_input_handlers(document: &Document, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

        // Keyboard
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                if event.code() == "KeyM" {
                    g.toggle_mute();
                    return;
                }
                if let Some(intent) = Intent::from_key_code(&event.code()) {
                    event.prevent_default();
                    g.input.push(intent);
                }
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Click anywhere drops the block
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = game.borrow_mut();
                g.audio.resume();
                g.input.push(Intent::CommitPlacement);
            });
            document.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                event.stop_propagation();
                game.borrow_mut().input.push(Intent::Reset);
            });
            btn.add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        Ok(())
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.frame(dt);
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use glam::Vec3;

    use tower_stack::consts::*;
    use tower_stack::physics::{BallisticWorld, PhysicsWorld};
    use tower_stack::render::SceneRecorder;
    use tower_stack::sim::{GameEvent, TickInput, TowerStateMachine};
    use tower_stack::ui::{LogPresenter, dispatch};
    use tower_stack::{HighScores, TuningConfig, offset_sign};

    /// Aim error added per placed block
    const ERROR_GROWTH: f32 = 0.25;
    /// Give up after this much simulated time
    const MAX_RUN_SECS: f32 = 300.0;

    /// Where the bot wants the next block: off the top by a growing error,
    /// leaning toward the lane centre so the target stays reachable
    pub fn aim_x(top_x: f32, placed: u32, boundary: f32) -> f32 {
        let error = placed as f32 * ERROR_GROWTH;
        (top_x - offset_sign(top_x) * error).clamp(-boundary, boundary)
    }

    /// Play one run to its game-over; returns (score, elapsed)
    pub fn play(tuning: TuningConfig, seed: u64) -> Option<(u32, f32)> {
        let physics = BallisticWorld::new(Vec3::new(0.0, tuning.gravity, 0.0));
        let mut machine = TowerStateMachine::new(physics, SceneRecorder::new(), tuning, seed);
        let mut presenter = LogPresenter::default();
        machine.start();

        let idle = TickInput::default();
        let step = machine.tuning().oscillation_speed;
        let boundary = machine.tuning().oscillation_boundary;
        let max_ticks = (MAX_RUN_SECS / SIM_DT) as usize;

        for _ in 0..max_ticks {
            machine.tick(SIM_DT, &idle);

            let state = machine.state();
            if let (Some(active), Some(top)) = (state.active_block(), state.top_block()) {
                let target = aim_x(top.position.x, state.score, boundary);
                if (active.position.x - target).abs() <= step * 0.5 + 1e-3 {
                    machine.commit_placement();
                }
            }

            let events = machine.drain_events();
            let over = events.iter().find_map(|e| match *e {
                GameEvent::GameOver { score, elapsed } => Some((score, elapsed)),
                _ => None,
            });
            dispatch(events, &mut presenter);
            if over.is_some() {
                log::info!(
                    "{} bodies, {} visuals at game over",
                    machine.physics().body_count(),
                    machine.render().len()
                );
                return over;
            }
        }

        log::warn!("Autopilot gave up after {MAX_RUN_SECS}s");
        None
    }

    pub fn record(high_scores: &mut HighScores, score: u32, elapsed: f32) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0);
        match high_scores.add_score(score, elapsed, timestamp) {
            Some(rank) => log::info!("High score rank #{rank}"),
            None => log::info!("No high score this time"),
        }
        high_scores.save();
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_aim_leans_toward_centre() {
            assert_eq!(aim_x(0.0, 0, 5.0), 0.0);
            assert_eq!(aim_x(2.0, 4, 5.0), 1.0);
            assert_eq!(aim_x(-2.0, 4, 5.0), -1.0);
            assert_eq!(aim_x(1.0, 40, 5.0), -5.0);
        }

        #[test]
        fn test_autopilot_plays_to_game_over() {
            let (score, elapsed) = play(TuningConfig::default(), 7).expect("run ends");
            assert!(score >= 5, "score = {score}");
            assert!(elapsed > 0.0);
        }

        #[test]
        fn test_record_ranks_first_run() {
            let mut scores = HighScores::new();
            record(&mut scores, 9, 12.0);
            assert_eq!(scores.top_score(), Some(9));
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use tower_stack::{HighScores, TuningConfig};

    env_logger::init();
    log::info!("Tower Stack (native) starting...");
    log::info!("Native mode runs a headless autopilot - use `trunk serve` to play in the browser");

    let tuning = match std::env::args().nth(1) {
        Some(path) => {
            let loaded = std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|json| TuningConfig::from_json(&json).map_err(|e| e.to_string()));
            match loaded {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {path}");
                    tuning
                }
                Err(e) => {
                    log::error!("Could not load tuning from {path}: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => TuningConfig::default(),
    };

    let mut high_scores = HighScores::load();
    if let Some((score, elapsed)) = autopilot::play(tuning, 7) {
        println!("Autopilot stacked {score} blocks in {elapsed:.1}s");
        autopilot::record(&mut high_scores, score, elapsed);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
