// Single-song player: downloader thread plus transport control

use crate::completion::{CompletionEvent, CompletionQueue};
use crate::downloader::Downloader;
use crate::sink::SinkPair;
use crate::transport::Transport;
use riff_core::{
    AudioError, CancellationFlag, PlayTime, PlaybackStatus, PlayerState, Result, SharedEndpoint,
};
use std::sync::Arc;
use std::time::Duration;

/// Runs once when the song's consumer completes, with the error if any
pub type CompletionCallback = Box<dyn FnOnce(Option<AudioError>) + Send>;

/// Outcome of a finished song
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub player_id: u64,
    pub description: String,
    pub error: Option<AudioError>,
}

/// Plays one endpoint from construction until it finishes or is stopped.
///
/// All methods are meant for the owning context and never block. The
/// transport's completion arrives as a [`CompletionEvent`] on the session's
/// queue and is applied with [`Player::handle_completion`].
pub struct Player {
    id: u64,
    endpoint: SharedEndpoint,
    transport: Arc<dyn Transport>,
    state: PlayerState,
    cancel: CancellationFlag,
    playtime: PlayTime,
    downloader: Downloader,
    on_complete: Option<CompletionCallback>,
}

impl Player {
    /// Start downloading into `sink` and hand its source to the transport.
    pub fn start(
        id: u64,
        endpoint: SharedEndpoint,
        transport: Arc<dyn Transport>,
        sink: SinkPair,
        completions: &CompletionQueue,
        on_complete: CompletionCallback,
    ) -> Result<Self> {
        let SinkPair { writer, source } = sink;
        let cancel = CancellationFlag::new();
        let downloader = Downloader::spawn(endpoint.clone(), writer, cancel.clone())?;

        if let Err(e) = transport.play(source, completions.handle(id)) {
            cancel.cancel();
            return Err(e);
        }

        log::info!("Playing \"{}\"", endpoint.song_description());
        Ok(Self {
            id,
            endpoint,
            transport,
            state: PlayerState::Playing,
            cancel,
            playtime: PlayTime::started(),
            downloader,
            on_complete: Some(on_complete),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn endpoint(&self) -> &SharedEndpoint {
        &self.endpoint
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    /// Time spent playing, pauses excluded
    pub fn get_playtime(&self) -> Duration {
        self.playtime.elapsed()
    }

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            description: self.endpoint.song_description(),
            playtime: self.get_playtime(),
            length: self.endpoint.length(),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.transition(PlayerState::Paused)? {
            self.transport.pause();
            self.playtime.pause();
        }
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.transition(PlayerState::Playing)? {
            self.transport.resume();
            self.playtime.start();
        }
        Ok(())
    }

    pub fn play(&mut self) -> Result<()> {
        self.resume()
    }

    /// Stop downloading and playing. Idempotent.
    pub fn stop(&mut self) {
        if self.state.is_stopped() {
            return;
        }
        log::debug!("Player {}: {:?} -> Stopped", self.id, self.state);
        self.state = PlayerState::Stopped;
        self.cancel.cancel();
        self.playtime.pause();
        self.transport.stop();
    }

    /// Apply the consumer's completion.
    ///
    /// Returns `None` for events addressed to another player and for
    /// repeats; otherwise runs the completion callback and reports the
    /// outcome. A download failure is reported when the consumer itself
    /// saw none.
    pub fn handle_completion(&mut self, event: CompletionEvent) -> Option<Finished> {
        if event.player_id != self.id {
            return None;
        }
        let callback = self.on_complete.take()?;

        let error = event.error.or_else(|| self.downloader.take_error());
        if !self.state.is_stopped() {
            log::debug!("Player {}: {:?} -> Stopped (completed)", self.id, self.state);
            self.state = PlayerState::Stopped;
            self.cancel.cancel();
            self.playtime.pause();
        }

        callback(error.clone());
        Some(Finished {
            player_id: self.id,
            description: self.endpoint.song_description(),
            error,
        })
    }

    fn transition(&mut self, to: PlayerState) -> Result<bool> {
        self.state.validate_transition(to)?;
        if self.state == to {
            return Ok(false);
        }
        log::debug!("Player {}: {:?} -> {:?}", self.id, self.state, to);
        self.state = to;
        Ok(true)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{AudioSource, SinkFactory, StreamBufferSinkFactory};
    use crate::testing::{ManualTransport, MemoryEndpoint};
    use parking_lot::Mutex;
    use riff_core::{ChunkStream, Endpoint, PlaybackConfig};
    use std::io::{ErrorKind, Read};
    use std::sync::atomic::Ordering;
    use std::thread;

    struct BrokenEndpoint;

    impl Endpoint for BrokenEndpoint {
        fn initialize(&self) -> Result<()> {
            Ok(())
        }

        fn is_initialized(&self) -> bool {
            true
        }

        fn stream_chunks(&self) -> Result<ChunkStream> {
            Ok(Box::new(
                vec![
                    Ok(b"abcd".to_vec()),
                    Err(AudioError::NetworkError("connection reset".into())),
                ]
                .into_iter(),
            ))
        }

        fn song_description(&self) -> String {
            "broken".to_string()
        }

        fn length(&self) -> Option<u64> {
            None
        }

        fn bit_rate(&self) -> Option<u32> {
            None
        }
    }

    fn sinks() -> StreamBufferSinkFactory {
        let config = PlaybackConfig::default()
            .with_slots(4, 4)
            .with_depletion_threshold(1)
            .with_write_retry_interval(Duration::from_millis(1));
        StreamBufferSinkFactory::new(config).unwrap()
    }

    fn start(
        endpoint: SharedEndpoint,
        transport: &Arc<ManualTransport>,
        completions: &CompletionQueue,
        calls: &Arc<Mutex<Vec<Option<AudioError>>>>,
    ) -> Result<Player> {
        let calls = calls.clone();
        Player::start(
            1,
            endpoint,
            transport.clone(),
            sinks().create().unwrap(),
            completions,
            Box::new(move |error| calls.lock().push(error)),
        )
    }

    fn drain(source: &mut AudioSource) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 16];
        loop {
            match source.read(&mut buf) {
                Ok(0) => return out,
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(1))
                }
                Err(e) => panic!("read failed: {}", e),
            }
        }
    }

    #[test]
    fn test_starts_playing() {
        let transport = Arc::new(ManualTransport::default());
        let completions = CompletionQueue::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let player = start(
            Arc::new(MemoryEndpoint::new("first song", Some(180))),
            &transport,
            &completions,
            &calls,
        )
        .unwrap();

        assert_eq!(player.state(), PlayerState::Playing);
        assert!(transport.is_playing());
        assert_eq!(player.status().description, "first song");
        assert_eq!(player.status().length, Some(180));

        let mut source = transport.sources.lock().remove(0);
        assert_eq!(drain(&mut source), b"first song");
    }

    #[test]
    fn test_pause_resume_keeps_playtime() {
        let transport = Arc::new(ManualTransport::default());
        let completions = CompletionQueue::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut player = start(
            Arc::new(MemoryEndpoint::new("song", None)),
            &transport,
            &completions,
            &calls,
        )
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        player.pause().unwrap();
        assert_eq!(player.state(), PlayerState::Paused);
        assert!(transport.is_paused());

        let paused_at = player.get_playtime();
        assert!(paused_at >= Duration::from_millis(20));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(player.get_playtime(), paused_at);

        player.pause().unwrap();
        assert_eq!(player.get_playtime(), paused_at);

        player.resume().unwrap();
        assert_eq!(player.state(), PlayerState::Playing);
        assert!(!transport.is_paused());
        thread::sleep(Duration::from_millis(10));
        assert!(player.get_playtime() >= paused_at + Duration::from_millis(10));
    }

    #[test]
    fn test_stop_is_terminal_and_idempotent() {
        let transport = Arc::new(ManualTransport::default());
        let completions = CompletionQueue::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut player = start(
            Arc::new(MemoryEndpoint::new("song", None)),
            &transport,
            &completions,
            &calls,
        )
        .unwrap();

        player.pause().unwrap();
        player.stop();
        player.stop();
        assert_eq!(player.state(), PlayerState::Stopped);
        assert_eq!(transport.stops.load(Ordering::SeqCst), 1);

        assert_eq!(player.pause(), Err(AudioError::StoppedState));
        assert_eq!(player.resume(), Err(AudioError::StoppedState));
        assert_eq!(player.play(), Err(AudioError::StoppedState));

        drop(player);
        assert_eq!(transport.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completion_runs_callback_once() {
        let transport = Arc::new(ManualTransport::default());
        let completions = CompletionQueue::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut player = start(
            Arc::new(MemoryEndpoint::new("song", None)),
            &transport,
            &completions,
            &calls,
        )
        .unwrap();

        let stranger = CompletionEvent {
            player_id: 99,
            error: None,
        };
        assert_eq!(player.handle_completion(stranger), None);
        assert!(calls.lock().is_empty());

        assert!(transport.finish(None));
        let event = completions.try_next().unwrap();
        let finished = player.handle_completion(event.clone()).unwrap();
        assert_eq!(finished.description, "song");
        assert_eq!(finished.error, None);
        assert_eq!(player.state(), PlayerState::Stopped);

        assert_eq!(player.handle_completion(event), None);
        assert_eq!(*calls.lock(), vec![None]);
    }

    #[test]
    fn test_download_failure_reaches_callback() {
        let transport = Arc::new(ManualTransport::default());
        let completions = CompletionQueue::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut player = start(Arc::new(BrokenEndpoint), &transport, &completions, &calls).unwrap();

        let mut source = transport.sources.lock().remove(0);
        assert_eq!(drain(&mut source), b"abcd");
        transport.finish(None);

        let finished = player.handle_completion(completions.try_next().unwrap()).unwrap();
        let expected = Some(AudioError::NetworkError("connection reset".into()));
        assert_eq!(finished.error, expected);
        assert_eq!(*calls.lock(), vec![expected]);
    }

    #[test]
    fn test_consumer_error_wins() {
        let transport = Arc::new(ManualTransport::default());
        let completions = CompletionQueue::new();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut player = start(
            Arc::new(MemoryEndpoint::new("song", None)),
            &transport,
            &completions,
            &calls,
        )
        .unwrap();

        transport.finish(Some(AudioError::PlaybackError("opus encoder failed".into())));
        let finished = player.handle_completion(completions.try_next().unwrap()).unwrap();
        assert_eq!(
            finished.error,
            Some(AudioError::PlaybackError("opus encoder failed".into()))
        );
    }

    #[test]
    fn test_transport_refusal_fails_start() {
        let transport = Arc::new(ManualTransport::default());
        transport.fail_play.store(true, Ordering::SeqCst);
        let completions = CompletionQueue::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let result = start(
            Arc::new(MemoryEndpoint::new("song", None)),
            &transport,
            &completions,
            &calls,
        );
        assert!(matches!(result, Err(AudioError::PlaybackError(_))));
        assert!(calls.lock().is_empty());
    }
}
