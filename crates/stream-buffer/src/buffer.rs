// Slot-quantized buffered IO over the ring buffer

use parking_lot::{Mutex, RwLock};
use riff_core::{AudioError, PlaybackConfig, Result};
use riff_ringbuffer::{RingBuffer, RingBufferError, RingReader, RingWriter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Low-water-mark listener
///
/// Called on the reading thread after a read leaves the producer lead at or
/// below the depletion threshold. The buffer's read lock is already
/// released, so implementations may write into `buffer`.
pub trait DepletionObserver: Send + Sync {
    fn on_depleted(&self, buffer: &StreamBuffer, distance: usize);
}

impl<F> DepletionObserver for F
where
    F: Fn(&StreamBuffer, usize) + Send + Sync,
{
    fn on_depleted(&self, buffer: &StreamBuffer, distance: usize) {
        self(buffer, distance)
    }
}

struct ReadHalf {
    cursor: RingReader,
    /// Bytes pulled from a slot but not yet returned, always < one slot
    cache: Vec<u8>,
}

struct WriteHalf {
    cursor: RingWriter,
    /// A short slot was written; only `seal` may follow
    terminal_written: bool,
}

/// Buffered IO facade over a slot ring.
///
/// Writes are slot-aligned, reads take any size. The reader and writer
/// sides lock independently, so one producer thread and one consumer
/// thread never contend with each other. Nothing here blocks waiting for
/// data or space: over- and under-runs come back as `BufferFull` and
/// `BufferEmpty` for the caller to retry.
pub struct StreamBuffer {
    ring: Arc<RingBuffer>,
    reader: Mutex<ReadHalf>,
    writer: Mutex<WriteHalf>,
    depletion_threshold: usize,
    sealed: AtomicBool,
    consumer_closed: AtomicBool,
    observers: RwLock<Vec<Arc<dyn DepletionObserver>>>,
}

impl StreamBuffer {
    pub fn new(slot_size: usize, slot_count: usize, depletion_threshold: usize) -> Result<Self> {
        let ring = RingBuffer::new(slot_size, slot_count).map_err(ring_error)?;
        let reader = ring.new_reader().map_err(ring_error)?;
        let writer = ring.new_writer().map_err(ring_error)?;

        log::debug!(
            "StreamBuffer created: {} slots x {} bytes, depletion threshold {}",
            slot_count,
            slot_size,
            depletion_threshold
        );

        Ok(Self {
            ring,
            reader: Mutex::new(ReadHalf {
                cursor: reader,
                cache: Vec::new(),
            }),
            writer: Mutex::new(WriteHalf {
                cursor: writer,
                terminal_written: false,
            }),
            depletion_threshold,
            sealed: AtomicBool::new(false),
            consumer_closed: AtomicBool::new(false),
            observers: RwLock::new(Vec::new()),
        })
    }

    pub fn from_config(config: &PlaybackConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.slot_size, config.slot_count, config.depletion_threshold)
    }

    pub fn slot_size(&self) -> usize {
        self.ring.slot_size()
    }

    pub fn slot_count(&self) -> usize {
        self.ring.capacity()
    }

    pub fn depletion_threshold(&self) -> usize {
        self.depletion_threshold
    }

    /// Slots the producer is ahead of the consumer
    pub fn distance(&self) -> usize {
        self.ring.distance()
    }

    /// Bytes a read can return without waiting
    pub fn available_bytes(&self) -> usize {
        let half = self.reader.lock();
        half.cache.len() + half.cursor.ready_bytes()
    }

    /// Free slots available to the producer
    pub fn free_slots(&self) -> usize {
        self.ring.available_write()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Sealed and every byte has been read
    pub fn is_drained(&self) -> bool {
        self.is_sealed() && self.distance() == 0 && self.reader.lock().cache.is_empty()
    }

    pub fn add_observer(&self, observer: Arc<dyn DepletionObserver>) {
        self.observers.write().push(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn DepletionObserver>) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        before != observers.len()
    }

    /// Read up to `size` bytes.
    ///
    /// Returns exactly `size` bytes while the stream is live, fewer only at
    /// the sealed tail, and an empty buffer once sealed and drained.
    ///
    /// Observers hear about a read that leaves the lead at or below the
    /// depletion threshold, and about every under-run while unsealed.
    pub fn read(&self, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let result = self.read_locked(size);
        if !self.is_sealed() {
            let distance = self.distance();
            let under_run = matches!(result, Err(AudioError::BufferEmpty));
            if under_run || (result.is_ok() && distance <= self.depletion_threshold) {
                self.notify_depleted(distance);
            }
        }
        result
    }

    fn read_locked(&self, size: usize) -> Result<Vec<u8>> {
        let mut half = self.reader.lock();
        // Load `done` first so a seal cannot hide slots published before it
        let done = self.ring.is_done();
        let buffered = half.cache.len() + half.cursor.ready_bytes();
        if buffered < size {
            if !done {
                return Err(AudioError::BufferEmpty);
            }
            if buffered == 0 {
                return Ok(Vec::new());
            }
        }

        let mut out = std::mem::take(&mut half.cache);
        while out.len() < size {
            match half.cursor.try_read_into(&mut out) {
                Ok(_) => {}
                Err(RingBufferError::EndOfStream) | Err(RingBufferError::Empty) => break,
                Err(e) => return Err(ring_error(e)),
            }
        }
        if out.len() > size {
            half.cache = out.split_off(size);
        }
        Ok(out)
    }

    /// Read at most one slot's worth of bytes
    pub fn read_slot(&self) -> Result<Vec<u8>> {
        self.read(self.slot_size())
    }

    /// Write slot-aligned bytes.
    ///
    /// `bytes.len()` must be a multiple of the slot size, except for the
    /// final write before `seal`. Nothing is written unless every slot fits.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut half = self.writer.lock();
        if self.is_sealed() {
            return Err(AudioError::BufferSealed);
        }
        if self.consumer_closed.load(Ordering::Acquire) {
            return Err(AudioError::TransientIoError(
                "stream closed by consumer".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Ok(());
        }
        if half.terminal_written {
            return Err(AudioError::InvalidState(
                "a short slot must be the last write before seal".to_string(),
            ));
        }

        let slot_size = self.slot_size();
        let slots = (bytes.len() + slot_size - 1) / slot_size;
        if slots > half.cursor.available_write() {
            return Err(AudioError::BufferFull);
        }

        for slot in bytes.chunks(slot_size) {
            half.cursor.try_write(slot).map_err(ring_error)?;
        }
        half.terminal_written = bytes.len() % slot_size != 0;
        Ok(())
    }

    /// Mark the stream complete. Idempotent.
    pub fn seal(&self) {
        let mut half = self.writer.lock();
        if self.sealed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = half.cursor.writer_done() {
            log::warn!("StreamBuffer seal: {}", e);
        }
        log::debug!("StreamBuffer sealed with {} slots pending", self.distance());
    }

    /// Consumer side is gone; further writes fail with `TransientIoError`
    pub fn close_consumer(&self) {
        if !self.consumer_closed.swap(true, Ordering::AcqRel) {
            log::debug!("StreamBuffer closed by consumer");
        }
    }

    pub fn is_consumer_closed(&self) -> bool {
        self.consumer_closed.load(Ordering::Acquire)
    }

    fn notify_depleted(&self, distance: usize) {
        let observers: Vec<_> = self.observers.read().clone();
        if observers.is_empty() {
            return;
        }
        log::debug!("StreamBuffer depleted: {} slots ahead", distance);
        for observer in observers.iter() {
            observer.on_depleted(self, distance);
        }
    }
}

pub(crate) fn ring_error(err: RingBufferError) -> AudioError {
    match err {
        RingBufferError::Full => AudioError::BufferFull,
        RingBufferError::Empty | RingBufferError::EndOfStream => AudioError::BufferEmpty,
        RingBufferError::WriterDone => AudioError::BufferSealed,
        RingBufferError::SlotOverflow { .. } => AudioError::InvalidState(err.to_string()),
        RingBufferError::HandleTaken(_) | RingBufferError::InvalidCapacity(_) => {
            AudioError::InitializationError(err.to_string())
        }
    }
}
