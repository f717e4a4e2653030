// Core types and traits for the riff streaming core

pub mod callback;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod playtime;
pub mod state;

// Re-export commonly used types
pub use callback::{CallbackManager, PlaybackEvent, PlayerCallback};
pub use config::PlaybackConfig;
pub use endpoint::{CancellationFlag, ChunkStream, Endpoint, SharedEndpoint};
pub use error::{AudioError, Result};
pub use playtime::{format_position, PlayTime};
pub use state::{PlaybackStatus, PlayerState};
