//! Presentation events
//!
//! The core only produces [`GameEvent`]s. A [`Presenter`] turns the ones it
//! cares about into HUD updates; [`dispatch`] does the routing.

use crate::sim::GameEvent;

/// Consumer of score/time/game-over notifications
pub trait Presenter {
    fn score_changed(&mut self, score: u32);

    fn time_changed(&mut self, elapsed_secs: f32);

    fn game_over(&mut self, score: u32, elapsed_secs: f32);

    fn debug_toggled(&mut self, _enabled: bool) {}
}

/// Route drained events to a presenter, in order
pub fn dispatch<I, T>(events: I, presenter: &mut T)
where
    I: IntoIterator<Item = GameEvent>,
    T: Presenter + ?Sized,
{
    for event in events {
        match event {
            GameEvent::ScoreChanged { score } => presenter.score_changed(score),
            GameEvent::TimeChanged { elapsed } => presenter.time_changed(elapsed),
            GameEvent::GameOver { score, elapsed } => presenter.game_over(score, elapsed),
            GameEvent::DebugVisualsToggled { enabled } => presenter.debug_toggled(enabled),
            _ => {}
        }
    }
}

/// Format seconds as `m:ss.t`
pub fn format_elapsed(elapsed_secs: f32) -> String {
    let tenths = (elapsed_secs.max(0.0) * 10.0).floor() as u32;
    let minutes = tenths / 600;
    let seconds = (tenths / 10) % 60;
    format!("{}:{:02}.{}", minutes, seconds, tenths % 10)
}

/// Presenter that writes to the log (native demo)
#[derive(Debug, Default)]
pub struct LogPresenter {
    pub score: u32,
    pub last_whole_second: u32,
    pub games_over: u32,
}

impl Presenter for LogPresenter {
    fn score_changed(&mut self, score: u32) {
        if score != self.score {
            log::info!("Score: {score}");
        }
        self.score = score;
    }

    fn time_changed(&mut self, elapsed_secs: f32) {
        // Once per second is plenty for a log
        let whole = elapsed_secs as u32;
        if whole != self.last_whole_second {
            self.last_whole_second = whole;
            log::debug!("Time: {}", format_elapsed(elapsed_secs));
        }
    }

    fn game_over(&mut self, score: u32, elapsed_secs: f32) {
        self.games_over += 1;
        log::info!("GAME OVER - score {score} in {}", format_elapsed(elapsed_secs));
    }

    fn debug_toggled(&mut self, enabled: bool) {
        log::info!("Debug visuals {}", if enabled { "on" } else { "off" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording {
        calls: Vec<String>,
    }

    impl Presenter for Recording {
        fn score_changed(&mut self, score: u32) {
            self.calls.push(format!("score {score}"));
        }
        fn time_changed(&mut self, elapsed_secs: f32) {
            self.calls.push(format!("time {elapsed_secs}"));
        }
        fn game_over(&mut self, score: u32, elapsed_secs: f32) {
            self.calls.push(format!("over {score} {elapsed_secs}"));
        }
    }

    #[test]
    fn test_dispatch_routes_in_order() {
        let mut rec = Recording::default();
        dispatch(
            vec![
                GameEvent::RunStarted { generation: 0 },
                GameEvent::ScoreChanged { score: 1 },
                GameEvent::TimeChanged { elapsed: 1.5 },
                GameEvent::GameOver { score: 1, elapsed: 2.0 },
                GameEvent::DebugVisualsToggled { enabled: true },
            ],
            &mut rec,
        );
        assert_eq!(rec.calls, vec!["score 1", "time 1.5", "over 1 2"]);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0.0), "0:00.0");
        assert_eq!(format_elapsed(61.25), "1:01.2");
        assert_eq!(format_elapsed(-3.0), "0:00.0");
    }
}
