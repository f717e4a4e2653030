// Completion events posted by the transport back to the owning context

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use riff_core::AudioError;
use std::time::Duration;

/// The consumer of player `player_id` reached end of stream or failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub player_id: u64,
    pub error: Option<AudioError>,
}

/// One-shot completion handle given to the transport with each song.
///
/// May be completed from any thread; the event is only queued, never
/// acted on in place. A handle dropped without completing reports a
/// `PlaybackError` so a player is never left waiting forever.
pub struct CompletionHandle {
    player_id: u64,
    tx: Option<Sender<CompletionEvent>>,
}

impl CompletionHandle {
    pub fn player_id(&self) -> u64 {
        self.player_id
    }

    pub fn complete(mut self, error: Option<AudioError>) {
        self.post(error);
    }

    fn post(&mut self, error: Option<AudioError>) {
        if let Some(tx) = self.tx.take() {
            let event = CompletionEvent {
                player_id: self.player_id,
                error,
            };
            if tx.send(event).is_err() {
                log::debug!("Completion for player {} dropped: queue gone", self.player_id);
            }
        }
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        if self.tx.is_some() {
            log::warn!("Player {} consumer dropped without completing", self.player_id);
            self.post(Some(AudioError::PlaybackError(
                "consumer dropped without completing".to_string(),
            )));
        }
    }
}

/// Owning-context end of the completion channel
pub struct CompletionQueue {
    tx: Sender<CompletionEvent>,
    rx: Receiver<CompletionEvent>,
}

impl CompletionQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn handle(&self, player_id: u64) -> CompletionHandle {
        CompletionHandle {
            player_id,
            tx: Some(self.tx.clone()),
        }
    }

    /// Next pending event without blocking
    pub fn try_next(&self) -> Option<CompletionEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for an event. For driver loops that own a thread.
    pub fn next_timeout(&self, timeout: Duration) -> Option<CompletionEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}
