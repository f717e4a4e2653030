// Playback session: queue, current player and event dispatch

use crate::completion::{CompletionEvent, CompletionQueue};
use crate::player::{CompletionCallback, Finished, Player};
use crate::queue::SongQueue;
use crate::sink::{SinkFactory, StreamBufferSinkFactory};
use crate::transport::Transport;
use riff_core::{
    AudioError, CallbackManager, PlaybackConfig, PlaybackEvent, PlaybackStatus, PlayerCallback,
    PlayerState, Result, SharedEndpoint,
};
use std::sync::Arc;

/// Owns everything one voice session plays.
///
/// A session lives on a single owning context. Transports complete songs
/// from their own threads by posting onto the completion queue; nothing
/// changes until the owner calls [`Session::process_events`], which is
/// where finished songs are reported and the queue advances.
pub struct Session {
    transport: Arc<dyn Transport>,
    sinks: Box<dyn SinkFactory>,
    queue: SongQueue,
    current: Option<Player>,
    /// Replaced players still waiting for their completion
    retired: Vec<Player>,
    completions: CompletionQueue,
    callbacks: CallbackManager,
    next_player_id: u64,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, sinks: Box<dyn SinkFactory>) -> Self {
        Self {
            transport,
            sinks,
            queue: SongQueue::new(),
            current: None,
            retired: Vec::new(),
            completions: CompletionQueue::new(),
            callbacks: CallbackManager::new(),
            next_player_id: 1,
        }
    }

    /// Session streaming through stream buffers sized by `config`
    pub fn with_config(transport: Arc<dyn Transport>, config: PlaybackConfig) -> Result<Self> {
        let sinks = StreamBufferSinkFactory::new(config)?;
        Ok(Self::new(transport, Box::new(sinks)))
    }

    pub fn add_callback(&self, callback: Arc<dyn PlayerCallback>) {
        self.callbacks.add_callback(callback);
    }

    pub fn callbacks(&self) -> &CallbackManager {
        &self.callbacks
    }

    pub fn queue(&self) -> &SongQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut SongQueue {
        &mut self.queue
    }

    /// Completion queue, for driver loops that want to wait on it
    pub fn completions(&self) -> &CompletionQueue {
        &self.completions
    }

    /// Queue songs and start playing if idle. Returns the pending count.
    pub fn enqueue<I>(&mut self, endpoints: I, position: Option<usize>) -> Result<usize>
    where
        I: IntoIterator<Item = SharedEndpoint>,
    {
        self.queue.enqueue(endpoints, position)?;
        if self.current.is_none() {
            self.start_next()?;
        }
        Ok(self.queue.len())
    }

    /// Replace whatever is playing with the next queued song.
    ///
    /// The replaced song is reported as finished once its completion
    /// arrives. Returns the song started, `None` if the queue was empty.
    pub fn play_next(&mut self) -> Result<Option<SharedEndpoint>> {
        if let Some(mut player) = self.current.take() {
            self.stop_player(&mut player);
            self.retired.push(player);
        }
        self.start_next()
    }

    pub fn pause(&mut self) -> Result<()> {
        let player = self
            .current
            .as_mut()
            .ok_or_else(|| AudioError::InvalidState("Nothing is playing".to_string()))?;
        let old_state = player.state();
        player.pause()?;
        self.announce_state(old_state, PlayerState::Paused);
        Ok(())
    }

    /// Resume the current song, or start the next one when idle
    pub fn resume(&mut self) -> Result<()> {
        match self.current.as_mut() {
            Some(player) => {
                let old_state = player.state();
                player.resume()?;
                self.announce_state(old_state, PlayerState::Playing);
            }
            None => {
                self.start_next()?;
            }
        }
        Ok(())
    }

    /// Stop the current song; the queue advances when its completion arrives.
    /// Returns false when nothing was playing.
    pub fn skip(&mut self) -> bool {
        match self.current.take() {
            Some(mut player) => {
                let stopping = !player.is_stopped();
                self.stop_player(&mut player);
                self.current = Some(player);
                stopping
            }
            None => false,
        }
    }

    /// Drop every pending song and stop the current one
    pub fn stop(&mut self) {
        self.queue.clear();
        if let Some(mut player) = self.current.take() {
            self.stop_player(&mut player);
            self.current = Some(player);
        }
        log::info!("Session stopped");
    }

    pub fn current(&self) -> Option<&SharedEndpoint> {
        self.current.as_ref().map(|p| p.endpoint())
    }

    /// Current song followed by everything pending
    pub fn all(&self) -> Vec<SharedEndpoint> {
        self.current()
            .into_iter()
            .chain(self.queue.enqueued())
            .cloned()
            .collect()
    }

    pub fn status(&self) -> Option<PlaybackStatus> {
        self.current.as_ref().map(|p| p.status())
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// Apply every queued completion without blocking. Returns how many
    /// belonged to a known player.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.completions.try_next() {
            if self.apply_completion(event) {
                handled += 1;
            }
        }
        handled
    }

    fn apply_completion(&mut self, event: CompletionEvent) -> bool {
        let is_current = matches!(&self.current, Some(p) if p.id() == event.player_id);
        if is_current {
            if let Some(mut player) = self.current.take() {
                let old_state = player.state();
                let finished = player.handle_completion(event);
                self.announce_state(old_state, PlayerState::Stopped);
                if let Some(finished) = finished {
                    self.announce_finished(finished);
                }
            }
            self.advance();
            return true;
        }

        if let Some(index) = self.retired.iter().position(|p| p.id() == event.player_id) {
            let mut player = self.retired.remove(index);
            if let Some(finished) = player.handle_completion(event) {
                self.announce_finished(finished);
            }
            return true;
        }

        log::debug!("Ignoring stale completion for player {}", event.player_id);
        false
    }

    /// Start the next song after one finished; failures are reported, not retried
    fn advance(&mut self) {
        if self.queue.is_empty() {
            log::debug!("Queue exhausted");
            return;
        }
        if let Err(e) = self.start_next() {
            log::error!("Failed to start next song: {}", e);
        }
    }

    fn start_next(&mut self) -> Result<Option<SharedEndpoint>> {
        let endpoint = match self.queue.get_next() {
            Some(endpoint) => endpoint,
            None => return Ok(None),
        };
        let description = endpoint.song_description();
        let id = self.next_player_id;
        self.next_player_id += 1;

        let started = self.sinks.create().and_then(|sink| {
            Player::start(
                id,
                endpoint.clone(),
                self.transport.clone(),
                sink,
                &self.completions,
                log_completion(description.clone()),
            )
        });

        match started {
            Ok(player) => {
                self.current = Some(player);
                self.callbacks
                    .dispatch_event(PlaybackEvent::SongStarted { description });
                Ok(Some(endpoint))
            }
            Err(e) => {
                self.callbacks.dispatch_event(PlaybackEvent::SongFinished {
                    description,
                    error: Some(e.clone()),
                });
                Err(e)
            }
        }
    }

    fn stop_player(&self, player: &mut Player) {
        let old_state = player.state();
        player.stop();
        self.announce_state(old_state, PlayerState::Stopped);
    }

    fn announce_state(&self, old_state: PlayerState, new_state: PlayerState) {
        if old_state != new_state {
            self.callbacks
                .dispatch_event(PlaybackEvent::StateChanged { old_state, new_state });
        }
    }

    fn announce_finished(&self, finished: Finished) {
        self.callbacks.dispatch_event(PlaybackEvent::SongFinished {
            description: finished.description,
            error: finished.error,
        });
    }
}

fn log_completion(description: String) -> CompletionCallback {
    Box::new(move |error| match error {
        Some(e) => log::error!("\"{}\" ended with error: {}", description, e),
        None => log::info!("Finished \"{}\"", description),
    })
}
