// Playback orchestration: sinks, downloader threads, players and sessions

pub mod completion;
pub mod downloader;
pub mod player;
pub mod queue;
pub mod session;
pub mod sink;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use completion::{CompletionEvent, CompletionHandle, CompletionQueue};
pub use downloader::Downloader;
pub use player::{CompletionCallback, Finished, Player};
pub use queue::SongQueue;
pub use session::Session;
pub use sink::{
    stream_buffer_sink, AudioSource, PipeSinkFactory, SinkFactory, SinkPair, SinkWriter,
    StreamBufferSink, StreamBufferSinkFactory, WriteSink,
};
pub use transport::Transport;

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Install `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
/// Safe to call more than once.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    });
}
