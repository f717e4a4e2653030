// Producer/consumer sink pairs handed to the downloader and the transport

use riff_core::{AudioError, CancellationFlag, PlaybackConfig, Result};
use riff_stream_buffer::{SlotAligner, StreamBuffer, StreamReader};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Producer half of a sink. Driven by the downloader thread only.
///
/// `close` is called exactly once, after the last `write_chunk`, whether
/// the download finished, failed or was cancelled.
pub trait SinkWriter: Send {
    /// Write one chunk; may block the calling thread.
    fn write_chunk(&mut self, chunk: &[u8], cancel: &CancellationFlag) -> Result<()>;

    /// Signal end of stream to the consumer.
    fn close(&mut self, cancel: &CancellationFlag);
}

/// Consumer half handed to the transport
pub enum AudioSource {
    /// OS pipe or any other blocking reader
    Pipe(Box<dyn Read + Send>),
    /// Non-blocking reader over a stream buffer
    Buffered(StreamReader),
}

impl AudioSource {
    /// The stream-buffer reader, for decoders that take a symphonia `MediaSource`
    pub fn into_stream_reader(self) -> Option<StreamReader> {
        match self {
            AudioSource::Buffered(reader) => Some(reader),
            AudioSource::Pipe(_) => None,
        }
    }
}

impl Read for AudioSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            AudioSource::Pipe(reader) => reader.read(buf),
            AudioSource::Buffered(reader) => reader.read(buf),
        }
    }
}

/// A writer and the source reading what it writes
pub struct SinkPair {
    pub writer: Box<dyn SinkWriter>,
    pub source: AudioSource,
}

/// Builds one sink pair per song
pub trait SinkFactory: Send {
    fn create(&self) -> Result<SinkPair>;
}

/// Sink over a blocking writer. The writer provides its own backpressure.
pub struct WriteSink<W: Write + Send> {
    inner: Option<W>,
}

impl<W: Write + Send> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl<W: Write + Send> SinkWriter for WriteSink<W> {
    fn write_chunk(&mut self, chunk: &[u8], _cancel: &CancellationFlag) -> Result<()> {
        let inner = self
            .inner
            .as_mut()
            .ok_or_else(|| AudioError::TransientIoError("sink already closed".to_string()))?;
        inner.write_all(chunk)?;
        Ok(())
    }

    fn close(&mut self, _cancel: &CancellationFlag) {
        // Dropping the writer is what closes a pipe
        if let Some(mut inner) = self.inner.take() {
            if let Err(e) = inner.flush() {
                log::debug!("Flush on close failed: {}", e);
            }
        }
    }
}

/// Sink writing into a [`StreamBuffer`].
///
/// Chunks of any size are re-aligned onto slot boundaries. When the buffer
/// is full the writer sleeps for the retry interval and tries again,
/// checking for cancellation and a departed consumer between attempts.
pub struct StreamBufferSink {
    buffer: Arc<StreamBuffer>,
    aligner: SlotAligner,
    retry_interval: Duration,
    closed: bool,
}

impl StreamBufferSink {
    pub fn new(buffer: Arc<StreamBuffer>, retry_interval: Duration) -> Self {
        let aligner = SlotAligner::new(buffer.slot_size());
        Self {
            buffer,
            aligner,
            retry_interval,
            closed: false,
        }
    }

    pub fn buffer(&self) -> &Arc<StreamBuffer> {
        &self.buffer
    }

    /// Free slots once at least one is available, `None` if cancelled first
    fn wait_for_space(&self, cancel: &CancellationFlag) -> Result<Option<usize>> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if self.buffer.is_consumer_closed() {
                return Err(AudioError::TransientIoError(
                    "stream closed by consumer".to_string(),
                ));
            }
            let free = self.buffer.free_slots();
            if free > 0 {
                return Ok(Some(free));
            }
            thread::sleep(self.retry_interval);
        }
    }

    /// Write out every whole pending slot. Returns false if cancelled.
    fn flush_slots(&mut self, cancel: &CancellationFlag) -> Result<bool> {
        while self.aligner.full_slots() > 0 {
            let free = match self.wait_for_space(cancel)? {
                Some(free) => free,
                None => return Ok(false),
            };
            // Only this thread writes, so `free` can only grow before the write
            if let Some(slots) = self.aligner.take_slots(free) {
                self.buffer.write(&slots)?;
            }
        }
        Ok(true)
    }

    fn flush_tail(&mut self, cancel: &CancellationFlag) -> Result<()> {
        if !self.flush_slots(cancel)? {
            return Ok(());
        }
        if let Some(tail) = self.aligner.take_remainder() {
            if self.wait_for_space(cancel)?.is_some() {
                self.buffer.write(&tail)?;
            }
        }
        Ok(())
    }
}

impl SinkWriter for StreamBufferSink {
    fn write_chunk(&mut self, chunk: &[u8], cancel: &CancellationFlag) -> Result<()> {
        if self.closed {
            return Err(AudioError::BufferSealed);
        }
        self.aligner.push(chunk);
        self.flush_slots(cancel)?;
        Ok(())
    }

    fn close(&mut self, cancel: &CancellationFlag) {
        if self.closed {
            return;
        }
        self.closed = true;

        if !cancel.is_cancelled() {
            if let Err(e) = self.flush_tail(cancel) {
                log::debug!("Dropping stream tail: {}", e);
            }
        }
        self.buffer.seal();
    }
}

/// Stream buffer sized from `config`, with its producer and consumer halves
pub fn stream_buffer_sink(config: &PlaybackConfig) -> Result<(StreamBufferSink, StreamReader)> {
    let buffer = Arc::new(StreamBuffer::from_config(config)?);
    let writer = StreamBufferSink::new(buffer.clone(), config.write_retry_interval);
    Ok((writer, StreamReader::new(buffer)))
}

/// One stream buffer per song
#[derive(Debug, Clone)]
pub struct StreamBufferSinkFactory {
    config: PlaybackConfig,
}

impl StreamBufferSinkFactory {
    pub fn new(config: PlaybackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }
}

impl SinkFactory for StreamBufferSinkFactory {
    fn create(&self) -> Result<SinkPair> {
        let (writer, reader) = stream_buffer_sink(&self.config)?;
        Ok(SinkPair {
            writer: Box::new(writer),
            source: AudioSource::Buffered(reader),
        })
    }
}

/// One anonymous OS pipe per song
#[derive(Debug, Default, Clone, Copy)]
pub struct PipeSinkFactory;

impl SinkFactory for PipeSinkFactory {
    fn create(&self) -> Result<SinkPair> {
        let (reader, writer) = io::pipe()?;
        Ok(SinkPair {
            writer: Box::new(WriteSink::new(writer)),
            source: AudioSource::Pipe(Box::new(reader)),
        })
    }
}
