// Player state management

use crate::error::{AudioError, Result};
use std::time::Duration;

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Audio is currently playing
    Playing,
    /// Audio is paused
    Paused,
    /// Playback has stopped; terminal
    Stopped,
}

impl PlayerState {
    pub fn is_stopped(self) -> bool {
        self == PlayerState::Stopped
    }

    /// Check that moving from `self` to `to` is legal.
    ///
    /// Re-entering the current state is allowed (pause while paused is a
    /// no-op), except from `Stopped`, which can never be left.
    pub fn validate_transition(self, to: PlayerState) -> Result<()> {
        match (self, to) {
            (PlayerState::Stopped, PlayerState::Stopped) => Ok(()),
            (PlayerState::Stopped, _) => Err(AudioError::StoppedState),

            (PlayerState::Playing, PlayerState::Paused) => Ok(()),
            (PlayerState::Playing, PlayerState::Stopped) => Ok(()),
            (PlayerState::Playing, PlayerState::Playing) => Ok(()),

            (PlayerState::Paused, PlayerState::Playing) => Ok(()),
            (PlayerState::Paused, PlayerState::Stopped) => Ok(()),
            (PlayerState::Paused, PlayerState::Paused) => Ok(()),
        }
    }
}

/// Snapshot of the active song, for display by the orchestrator
#[derive(Debug, Clone)]
pub struct PlaybackStatus {
    pub state: PlayerState,
    pub description: String,
    /// Time spent playing so far (pauses excluded)
    pub playtime: Duration,
    /// Song length in seconds, when known
    pub length: Option<u64>,
}
