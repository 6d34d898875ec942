//! Per-frame input
//!
//! Intents collected between frames are applied inside the next tick, after
//! that tick's oscillation step, so a commit is always judged against the
//! freshest position.

/// Abstract player intents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CommitPlacement,
    Reset,
    /// Physics debug overlay; no effect on game state
    ToggleDebugVisuals,
}

impl Intent {
    /// Map a `KeyboardEvent.code` to an intent
    pub fn from_key_code(code: &str) -> Option<Self> {
        match code {
            "Space" | "Enter" | "NumpadEnter" => Some(Intent::CommitPlacement),
            "KeyR" => Some(Intent::Reset),
            "KeyD" => Some(Intent::ToggleDebugVisuals),
            _ => None,
        }
    }
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Commit the sliding block
    pub commit: bool,
    /// Abandon the run and start over
    pub reset: bool,
    /// Flip the debug overlay
    pub toggle_debug: bool,
}

impl TickInput {
    pub fn push(&mut self, intent: Intent) {
        match intent {
            Intent::CommitPlacement => self.commit = true,
            Intent::Reset => self.reset = true,
            // Two presses in one frame cancel out
            Intent::ToggleDebugVisuals => self.toggle_debug = !self.toggle_debug,
        }
    }

    /// Clear one-shot inputs after processing
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn commit() -> Self {
        Self {
            commit: true,
            ..Default::default()
        }
    }

    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(Intent::from_key_code("Space"), Some(Intent::CommitPlacement));
        assert_eq!(Intent::from_key_code("KeyR"), Some(Intent::Reset));
        assert_eq!(Intent::from_key_code("KeyD"), Some(Intent::ToggleDebugVisuals));
        assert_eq!(Intent::from_key_code("KeyQ"), None);
    }

    #[test]
    fn test_push_and_clear() {
        let mut input = TickInput::default();
        input.push(Intent::CommitPlacement);
        input.push(Intent::ToggleDebugVisuals);
        assert!(input.commit && input.toggle_debug && !input.reset);

        input.push(Intent::ToggleDebugVisuals);
        assert!(!input.toggle_debug);

        input.clear();
        assert_eq!(input, TickInput::default());
    }
}
