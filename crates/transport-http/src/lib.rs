// HTTP transport: range-chunked remote endpoints and speech endpoints

pub mod chunks;
pub mod client;
pub mod range;
pub mod remote;
pub mod speech;

pub use chunks::RangeChunks;
pub use client::{HttpClient, HttpConfig, RangeFetcher};
pub use range::{ByteRanges, RangeTemplate};
pub use remote::{DirectStream, RemoteEndpoint, ResolvedStream, StreamResolver};
pub use speech::{SpeechEndpoint, SpeechSynthesizer};
