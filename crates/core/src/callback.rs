// Callback registration for playback events
// Listeners are registered explicitly on a manager owned by the session

use crate::error::AudioError;
use crate::state::PlayerState;
use parking_lot::Mutex;
use std::sync::Arc;

/// Playback event types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A new song started playing
    SongStarted { description: String },

    /// The current song finished, either exhausted or failed
    SongFinished {
        description: String,
        error: Option<AudioError>,
    },

    /// Player state changed
    StateChanged {
        old_state: PlayerState,
        new_state: PlayerState,
    },
}

/// Player callback trait
/// Implementations should be lightweight and non-blocking
pub trait PlayerCallback: Send + Sync {
    /// Called on the owning context when an event occurs
    fn on_event(&self, event: &PlaybackEvent);
}

impl<F> PlayerCallback for F
where
    F: Fn(&PlaybackEvent) + Send + Sync,
{
    fn on_event(&self, event: &PlaybackEvent) {
        self(event)
    }
}

/// Callback manager for handling multiple callbacks
pub struct CallbackManager {
    callbacks: Mutex<Vec<Arc<dyn PlayerCallback>>>,
}

impl CallbackManager {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn add_callback(&self, callback: Arc<dyn PlayerCallback>) {
        self.callbacks.lock().push(callback);
    }

    /// Remove a previously registered callback. Returns false if it was not attached.
    pub fn remove_callback(&self, callback: &Arc<dyn PlayerCallback>) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|c| !Arc::ptr_eq(c, callback));
        before != callbacks.len()
    }

    pub fn clear_callbacks(&self) {
        self.callbacks.lock().clear();
    }

    pub fn dispatch_event(&self, event: PlaybackEvent) {
        // Snapshot so a callback may register or remove listeners
        let callbacks: Vec<_> = self.callbacks.lock().clone();
        for callback in callbacks.iter() {
            callback.on_event(&event);
        }
    }
}

impl Default for CallbackManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple callback implementation for testing
#[cfg(test)]
pub struct TestCallback {
    events: Mutex<Vec<PlaybackEvent>>,
}

#[cfg(test)]
impl TestCallback {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn get_events(&self) -> Vec<PlaybackEvent> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
impl PlayerCallback for TestCallback {
    fn on_event(&self, event: &PlaybackEvent) {
        self.events.lock().push(event.clone());
    }
}
