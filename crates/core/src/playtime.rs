// Elapsed play time tracking

use std::time::{Duration, Instant};

/// Accumulates time spent in the playing state.
///
/// Paused intervals are excluded: `pause` folds the running interval into
/// the total, `start` opens a new one.
#[derive(Debug, Clone, Default)]
pub struct PlayTime {
    accumulated: Duration,
    started_at: Option<Instant>,
}

impl PlayTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator that is already running
    pub fn started() -> Self {
        let mut playtime = Self::new();
        playtime.start();
        playtime
    }

    /// Open a running interval. No-op while already running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Close the running interval. No-op while not running.
    pub fn pause(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += started_at.elapsed();
        }
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Accumulated time plus the current running interval
    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(started_at) => self.accumulated + started_at.elapsed(),
            None => self.accumulated,
        }
    }
}

/// Format whole seconds as `m:ss`, or `h:mm:ss` past the hour.
pub fn format_position(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
