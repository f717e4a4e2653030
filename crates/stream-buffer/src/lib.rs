// Stream buffer: slot-aligned buffered IO between a producer and an external decoder
//
// Two ways to feed a buffer. Push mode runs a downloader thread that writes
// through a sink (see the player crate's `StreamBufferSink`). Pull mode
// attaches a `BufferFiller` with an endpoint's chunk stream and hands a
// `StreamReader` over the same buffer to the decoder; refills then happen on
// the reading thread. No sink factory builds the pull-mode pair; callers
// assemble it directly.

pub mod aligner;
pub mod buffer;
pub mod filler;
pub mod reader;

pub use aligner::SlotAligner;
pub use buffer::{DepletionObserver, StreamBuffer};
pub use filler::BufferFiller;
pub use reader::StreamReader;
