// Remote endpoint streaming a resolved URL through range requests

use crate::chunks::RangeChunks;
use crate::client::{HttpClient, RangeFetcher};
use once_cell::sync::OnceCell;
use riff_core::config::DEFAULT_CHUNK_SIZE;
use riff_core::{AudioError, ChunkStream, Endpoint, Result};

/// Stream location produced by metadata resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub url: String,
    /// Total size in bytes, if the provider reports it
    pub size: Option<u64>,
    pub bit_rate: Option<u32>,
}

/// Expensive provider lookup turning a song reference into a stream URL
pub trait StreamResolver: Send + Sync {
    fn resolve(&self) -> Result<ResolvedStream>;
}

/// Resolver for a stream URL that is already known
#[derive(Debug, Clone)]
pub struct DirectStream {
    stream: ResolvedStream,
}

impl DirectStream {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            stream: ResolvedStream {
                url: url.into(),
                size: None,
                bit_rate: None,
            },
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.stream.size = Some(size);
        self
    }

    pub fn with_bit_rate(mut self, bit_rate: u32) -> Self {
        self.stream.bit_rate = Some(bit_rate);
        self
    }
}

impl StreamResolver for DirectStream {
    fn resolve(&self) -> Result<ResolvedStream> {
        Ok(self.stream.clone())
    }
}

/// Endpoint fetching a remote audio file in fixed-size range requests
pub struct RemoteEndpoint<F: RangeFetcher = HttpClient> {
    title: String,
    length: Option<u64>,
    resolver: Box<dyn StreamResolver>,
    fetcher: F,
    chunk_size: usize,
    resolved: OnceCell<ResolvedStream>,
}

impl RemoteEndpoint<HttpClient> {
    pub fn new(title: impl Into<String>, resolver: Box<dyn StreamResolver>) -> Self {
        Self::with_fetcher(title, resolver, HttpClient::new())
    }
}

impl<F: RangeFetcher> RemoteEndpoint<F> {
    pub fn with_fetcher(
        title: impl Into<String>,
        resolver: Box<dyn StreamResolver>,
        fetcher: F,
    ) -> Self {
        let title = title.into();
        log::debug!("Constructing remote endpoint: {}", title);
        Self {
            title,
            length: None,
            resolver,
            fetcher,
            chunk_size: DEFAULT_CHUNK_SIZE,
            resolved: OnceCell::new(),
        }
    }

    /// Song length in seconds, known from the catalogue entry
    pub fn with_length(mut self, seconds: u64) -> Self {
        self.length = Some(seconds);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn resolve_stream(&self) -> Result<ResolvedStream> {
        let mut stream = self.resolver.resolve()?;
        if stream.size.is_none() {
            stream.size = self.fetcher.content_length(&stream.url)?;
        }
        if stream.size.is_none() {
            return Err(AudioError::InitializationError(format!(
                "Stream size unknown for \"{}\"",
                self.title
            )));
        }
        log::info!(
            "Resolved \"{}\": {} bytes",
            self.title,
            stream.size.unwrap_or_default()
        );
        Ok(stream)
    }
}

impl<F: RangeFetcher> Endpoint for RemoteEndpoint<F> {
    fn initialize(&self) -> Result<()> {
        self.resolved.get_or_try_init(|| self.resolve_stream())?;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.resolved.get().is_some()
    }

    fn stream_chunks(&self) -> Result<ChunkStream> {
        let stream = self.resolved.get_or_try_init(|| self.resolve_stream())?;
        Ok(Box::new(RangeChunks::new(
            self.fetcher.clone(),
            stream.url.clone(),
            stream.size.unwrap_or_default(),
            self.chunk_size,
        )))
    }

    fn song_description(&self) -> String {
        self.title.clone()
    }

    fn length(&self) -> Option<u64> {
        self.length
    }

    fn bit_rate(&self) -> Option<u32> {
        self.resolved.get().and_then(|stream| stream.bit_rate)
    }
}
