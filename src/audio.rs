//! Audio system using Web Audio API
//!
//! Procedurally generated cues, no sample files. Pitches are plain
//! functions of the tower height; playback needs a browser.

#[cfg(target_arch = "wasm32")]
use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

#[cfg(target_arch = "wasm32")]
use crate::settings::Settings;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Block settled with some overhang; pitch climbs with the tower
    Place { height: u32 },
    /// Block settled dead centre
    Perfect { height: u32 },
    /// Missed block tips off the tower
    Collapse,
    /// Run finished with a tower `height` blocks tall
    GameOver { height: u32 },
    /// Run made the leaderboard
    HighScore { height: u32 },
}

/// Pitch for the n-th block, one semitone per level, wrapping every two octaves
pub fn stack_pitch(base: f32, height: u32) -> f32 {
    base * 2f32.powf((height % 24) as f32 / 12.0)
}

/// Game over: the tower's pitch tumbling down a fifth, then an octave
pub fn game_over_notes(height: u32) -> [f32; 3] {
    let top = stack_pitch(196.0, height);
    [top, top * 2.0 / 3.0, top / 2.0]
}

/// Leaderboard entry: major triad plus octave on the tower's pitch
pub fn high_score_notes(height: u32) -> [f32; 4] {
    let root = stack_pitch(392.0, height);
    [root, root * 1.25, root * 1.5, root * 2.0]
}

/// Audio manager for the game
#[cfg(target_arch = "wasm32")]
pub struct AudioManager {
    ctx: Option<AudioContext>,
    volume: f32,
}

#[cfg(target_arch = "wasm32")]
impl AudioManager {
    pub fn new(settings: &Settings) -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            volume: settings.effective_volume(),
        }
    }

    /// Pick up mute/volume changes
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.volume = settings.effective_volume();
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    /// Play a sound effect
    pub fn play(&self, effect: SoundEffect) {
        let vol = self.volume;
        if vol <= 0.0 {
            return;
        }

        let Some(ctx) = &self.ctx else { return };

        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match effect {
            SoundEffect::Place { height } => self.play_place(ctx, vol, height),
            SoundEffect::Perfect { height } => self.play_perfect(ctx, vol, height),
            SoundEffect::Collapse => self.play_collapse(ctx, vol),
            SoundEffect::GameOver { height } => self.play_game_over(ctx, vol, height),
            SoundEffect::HighScore { height } => self.play_high_score(ctx, vol, height),
        }
    }

    // === Sound generators ===

    /// Create an oscillator with gain envelope
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Short wooden knock
    fn play_place(&self, ctx: &AudioContext, vol: f32, height: u32) {
        let freq = stack_pitch(220.0, height);
        let Some((osc, gain)) = self.create_osc(ctx, freq, OscillatorType::Triangle) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.5, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.12)
            .ok();
        osc.frequency().set_value_at_time(freq, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(freq * 0.5, t + 0.12)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.15).ok();
    }

    /// Knock plus a bright fifth on top
    fn play_perfect(&self, ctx: &AudioContext, vol: f32, height: u32) {
        self.play_place(ctx, vol, height);

        let base = stack_pitch(440.0, height);
        for (i, freq) in [base, base * 1.5].iter().enumerate() {
            let delay = i as f64 * 0.05;
            if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Sine) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(vol * 0.2, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.3)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.35).ok();
            }
        }
    }

    /// Falling rumble
    fn play_collapse(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 120.0, OscillatorType::Sawtooth) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.4, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.6)
            .ok();
        osc.frequency().set_value_at_time(120.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(35.0, t + 0.6)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.7).ok();
    }

    /// Game over - each note slides down into the next, like the tower settling
    fn play_game_over(&self, ctx: &AudioContext, vol: f32, height: u32) {
        let notes = game_over_notes(height);
        for (i, pair) in notes.windows(2).enumerate() {
            let Some((osc, gain)) = self.create_osc(ctx, pair[0], OscillatorType::Square) else {
                continue;
            };
            let t = ctx.current_time() + i as f64 * 0.35;
            gain.gain().set_value_at_time(vol * 0.15, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.5)
                .ok();
            osc.frequency().set_value_at_time(pair[0], t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(pair[1], t + 0.3)
                .ok();
            osc.start_with_when(t).ok();
            osc.stop_with_when(t + 0.55).ok();
        }
    }

    /// Leaderboard entry - bell chord on the tower's pitch
    fn play_high_score(&self, ctx: &AudioContext, vol: f32, height: u32) {
        for (i, freq) in high_score_notes(height).iter().enumerate() {
            let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Sine) else {
                continue;
            };
            let t = ctx.current_time() + i as f64 * 0.06;
            gain.gain().set_value_at_time(vol * 0.18, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.9)
                .ok();
            osc.start_with_when(t).ok();
            osc.stop_with_when(t + 1.0).ok();
        }
    }
}
