// Playable audio source abstraction

use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lazy, single-pass sequence of encoded audio chunks.
///
/// Each item is one network read. An `Err` item is terminal; callers stop
/// pulling after the first error.
pub type ChunkStream = Box<dyn Iterator<Item = Result<Vec<u8>>> + Send>;

/// A playable audio source.
///
/// Endpoints are shared between the owning context (for descriptions and
/// lengths) and the downloader thread (for streaming), so every method
/// takes `&self` and implementations keep their lazy state behind
/// interior mutability.
pub trait Endpoint: Send + Sync {
    /// Resolve expensive metadata. Repeat calls are no-ops.
    fn initialize(&self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Start streaming. Initializes first if needed.
    ///
    /// The returned stream is finite and cannot be restarted; call this
    /// at most once per playback.
    fn stream_chunks(&self) -> Result<ChunkStream>;

    /// Human readable title
    fn song_description(&self) -> String;

    /// Length in seconds, `None` when unknown
    fn length(&self) -> Option<u64>;

    /// Bit rate in bits per second, `None` when unknown
    fn bit_rate(&self) -> Option<u32>;
}

/// Shared handle to an endpoint
pub type SharedEndpoint = Arc<dyn Endpoint>;

/// Cooperative cancellation flag shared between a player and its downloader
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag {
    flag: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
