// Test doubles shared by the unit tests

use crate::completion::CompletionHandle;
use crate::sink::AudioSource;
use crate::transport::Transport;
use parking_lot::Mutex;
use riff_core::{AudioError, ChunkStream, Endpoint, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory song served in fixed-size chunks
pub(crate) struct MemoryEndpoint {
    pub title: String,
    pub data: Vec<u8>,
    pub chunk_size: usize,
    pub length: Option<u64>,
}

impl MemoryEndpoint {
    pub fn new(title: &str, length: Option<u64>) -> Self {
        Self {
            title: title.to_string(),
            data: title.as_bytes().to_vec(),
            chunk_size: 4,
            length,
        }
    }
}

impl Endpoint for MemoryEndpoint {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn stream_chunks(&self) -> Result<ChunkStream> {
        let chunks: Vec<Result<Vec<u8>>> = self
            .data
            .chunks(self.chunk_size)
            .map(|c| Ok(c.to_vec()))
            .collect();
        Ok(Box::new(chunks.into_iter()))
    }

    fn song_description(&self) -> String {
        self.title.clone()
    }

    fn length(&self) -> Option<u64> {
        self.length
    }

    fn bit_rate(&self) -> Option<u32> {
        None
    }
}

/// Transport completed by hand from the test body.
///
/// `stop` completes every outstanding handle, like a voice client firing
/// its after-play hook when interrupted.
#[derive(Default)]
pub(crate) struct ManualTransport {
    pub sources: Mutex<Vec<AudioSource>>,
    pub handles: Mutex<Vec<CompletionHandle>>,
    pub playing: AtomicBool,
    pub paused: AtomicBool,
    pub stops: AtomicUsize,
    pub fail_play: AtomicBool,
}

impl ManualTransport {
    /// Complete the oldest outstanding song
    pub fn finish(&self, error: Option<AudioError>) -> bool {
        let handle = {
            let mut handles = self.handles.lock();
            if handles.is_empty() {
                return false;
            }
            handles.remove(0)
        };
        self.playing.store(false, Ordering::SeqCst);
        handle.complete(error);
        true
    }
}

impl Transport for ManualTransport {
    fn play(&self, source: AudioSource, on_complete: CompletionHandle) -> Result<()> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(AudioError::PlaybackError("voice not connected".into()));
        }
        self.sources.lock().push(source);
        self.handles.lock().push(on_complete);
        self.playing.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            handle.complete(None);
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
