//! High score table
//!
//! Kept by the presentation layer; the wasm front end persists it to
//! LocalStorage. Tracks the top 10 towers.

use serde::{Deserialize, Serialize};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Blocks stacked
    pub score: u32,
    /// Run length in seconds
    pub elapsed_secs: f32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

impl HighScoreEntry {
    /// Higher score wins; equal scores rank the faster run first
    fn beats(&self, other: &HighScoreEntry) -> bool {
        self.score > other.score
            || (self.score == other.score && self.elapsed_secs < other.elapsed_secs)
    }
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "tower_stack_highscores";

    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a finished run (if it qualifies).
    /// Returns the rank achieved (1-indexed) or None if it didn't qualify.
    pub fn add_score(&mut self, score: u32, elapsed_secs: f32, timestamp: f64) -> Option<usize> {
        if score == 0 {
            return None;
        }

        let entry = HighScoreEntry {
            score,
            elapsed_secs,
            timestamp,
        };

        let pos = self
            .entries
            .iter()
            .position(|e| entry.beats(e))
            .unwrap_or(self.entries.len());
        if pos >= MAX_HIGH_SCORES {
            return None;
        }
        self.entries.insert(pos, entry);
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(pos + 1)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u32> {
        self.entries.first().map(|e| e.score)
    }

    /// Load high scores from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(scores) = serde_json::from_str::<HighScores>(&json) {
                    log::info!("Loaded {} high scores", scores.entries.len());
                    return scores;
                }
            }
        }

        log::info!("No high scores found, starting fresh");
        Self::new()
    }

    /// Save high scores to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("High scores saved ({} entries)", self.entries.len());
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_never_qualifies() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_score(0, 1.0, 0.0), None);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_sorted_with_time_tiebreak() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_score(5, 30.0, 0.0), Some(1));
        assert_eq!(scores.add_score(8, 40.0, 0.0), Some(1));
        assert_eq!(scores.add_score(5, 20.0, 0.0), Some(2));
        assert_eq!(scores.add_score(5, 50.0, 0.0), Some(4));

        let order: Vec<(u32, f32)> = scores.entries.iter().map(|e| (e.score, e.elapsed_secs)).collect();
        assert_eq!(order, vec![(8, 40.0), (5, 20.0), (5, 30.0), (5, 50.0)]);
        assert_eq!(scores.top_score(), Some(8));
    }

    #[test]
    fn test_full_table_rejects_low_scores() {
        let mut scores = HighScores::new();
        for s in 1..=MAX_HIGH_SCORES as u32 {
            scores.add_score(s + 10, 10.0, 0.0);
        }
        assert_eq!(scores.add_score(3, 1.0, 0.0), None);
        assert_eq!(scores.add_score(100, 1.0, 0.0), Some(1));
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.entries.last().unwrap().score, 12);
    }
}
