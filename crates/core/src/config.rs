// Buffering configuration

use crate::error::{AudioError, Result};
use std::time::Duration;

/// Slot size for the stream buffer (128KB)
pub const DEFAULT_SLOT_SIZE: usize = 128 * 1024;

/// Slot count, 1MB of buffered audio in total
pub const DEFAULT_SLOT_COUNT: usize = 8;

/// Refill once the producer lead drops to 512KB
pub const DEFAULT_DEPLETION_THRESHOLD: usize = 4;

/// Chunk size for range requests (64KB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Playback buffering parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Bytes per ring buffer slot
    pub slot_size: usize,
    /// Number of slots in the ring buffer
    pub slot_count: usize,
    /// Producer lead (in slots) at or below which depletion is signalled
    pub depletion_threshold: usize,
    /// Bytes requested per range GET
    pub chunk_size: usize,
    /// Slots written before playback starts in pull mode
    pub initial_chunks: usize,
    /// Back-off between write attempts against a full buffer
    pub write_retry_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            slot_size: DEFAULT_SLOT_SIZE,
            slot_count: DEFAULT_SLOT_COUNT,
            depletion_threshold: DEFAULT_DEPLETION_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            initial_chunks: DEFAULT_DEPLETION_THRESHOLD,
            write_retry_interval: Duration::from_millis(5),
        }
    }
}

impl PlaybackConfig {
    pub fn with_slots(mut self, slot_size: usize, slot_count: usize) -> Self {
        self.slot_size = slot_size;
        self.slot_count = slot_count;
        self
    }

    pub fn with_depletion_threshold(mut self, threshold: usize) -> Self {
        self.depletion_threshold = threshold;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_initial_chunks(mut self, initial_chunks: usize) -> Self {
        self.initial_chunks = initial_chunks;
        self
    }

    pub fn with_write_retry_interval(mut self, interval: Duration) -> Self {
        self.write_retry_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.slot_size == 0 || self.slot_count == 0 {
            return Err(AudioError::InitializationError(format!(
                "slot size and count must be non-zero (got {} x {})",
                self.slot_size, self.slot_count
            )));
        }
        if self.chunk_size == 0 {
            return Err(AudioError::InitializationError(
                "chunk size must be non-zero".to_string(),
            ));
        }
        if self.depletion_threshold >= self.slot_count {
            return Err(AudioError::InitializationError(format!(
                "depletion threshold {} must be below slot count {}",
                self.depletion_threshold, self.slot_count
            )));
        }
        Ok(())
    }
}
