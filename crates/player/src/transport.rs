// Playback transport implemented by the host application

use crate::completion::CompletionHandle;
use crate::sink::AudioSource;
use riff_core::Result;

/// Voice or audio output that consumes a song's byte stream.
///
/// `play` starts consuming `source` and must eventually complete
/// `on_complete` (or drop it) when the stream ends, fails or is stopped.
/// The remaining calls control the song currently being played.
pub trait Transport: Send + Sync {
    fn play(&self, source: AudioSource, on_complete: CompletionHandle) -> Result<()>;
    fn pause(&self);
    fn resume(&self);
    fn stop(&self);
    fn is_playing(&self) -> bool;
    fn is_paused(&self) -> bool;
}
