// Error handling for the streaming core

use thiserror::Error;

/// Streaming and playback error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    /// Stream URL does not match any known range-request shape
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Sink was closed by the consumer while the producer was writing
    #[error("Transient IO error: {0}")]
    TransientIoError(String),

    /// Pause/resume attempted on a stopped player
    #[error("Player is stopped")]
    StoppedState,

    /// Enqueue position outside `[0, len]`
    #[error("Queue position {position} out of range (queue length {len})")]
    QueuePosition { position: usize, len: usize },

    /// Not enough free slots for the write
    #[error("Buffer full")]
    BufferFull,

    /// Not enough data ready for the read
    #[error("Buffer empty")]
    BufferEmpty,

    /// Write attempted after the buffer was sealed
    #[error("Buffer sealed")]
    BufferSealed,

    /// Failed to set up a component
    #[error("Initialization error: {0}")]
    InitializationError(String),

    /// Network error (download/streaming)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Error reported by the external consumer during playback
    #[error("Playback error: {0}")]
    PlaybackError(String),

    /// Invalid state transition
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl AudioError {
    /// Expected races that callers should swallow rather than report.
    pub fn is_transient(&self) -> bool {
        matches!(self, AudioError::TransientIoError(_))
    }
}

/// Result type alias for streaming operations
pub type Result<T> = std::result::Result<T, AudioError>;

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::BrokenPipe => AudioError::TransientIoError(err.to_string()),
            _ => AudioError::IoError(err.to_string()),
        }
    }
}
