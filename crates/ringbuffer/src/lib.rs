// Fixed-capacity slot ring buffer for streamed audio bytes
//
// One producer thread and one consumer thread. Coordination happens through
// two monotonic counters; the slot storage is a single arena allocated up
// front, indexed by `counter % capacity`.

use std::cell::UnsafeCell;
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error type for ring buffer operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingBufferError {
    /// Every slot holds unread data
    #[error("ring buffer full")]
    Full,

    /// No slot is ready yet
    #[error("ring buffer empty")]
    Empty,

    /// The writer is done and the reader has caught up
    #[error("end of stream")]
    EndOfStream,

    /// Write attempted after `writer_done`
    #[error("writer already finished")]
    WriterDone,

    /// Write larger than one slot
    #[error("write of {len} bytes exceeds slot size {slot_size}")]
    SlotOverflow { len: usize, slot_size: usize },

    /// The reader or writer handle was already handed out
    #[error("{0} handle already taken")]
    HandleTaken(&'static str),

    /// Zero or overflowing capacity
    #[error("invalid ring buffer capacity: {0}")]
    InvalidCapacity(String),
}

/// Slot ring buffer shared by exactly one writer and one reader
///
/// # Thread Safety
/// - `RingWriter` advances `producer`, `RingReader` advances `consumer`
/// - A slot is written only while the consumer is more than a full lap
///   behind it, and read only after the producer has published it
/// - Acquire/Release on the counters carries the slot bytes across threads
pub struct RingBuffer {
    /// Slot storage, `capacity * slot_size` bytes
    arena: Box<UnsafeCell<[u8]>>,
    /// Valid byte count per slot (the terminal slot may be short)
    lens: Box<[AtomicUsize]>,
    slot_size: usize,
    capacity: usize,
    producer: AtomicUsize,
    consumer: AtomicUsize,
    done: AtomicBool,
    reader_taken: AtomicBool,
    writer_taken: AtomicBool,
}

// SAFETY: the arena is only touched through `RingWriter::try_write` and
// `RingReader::try_read_into`. Each handle exists at most once, and the
// counter protocol keeps their slot accesses disjoint.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Create a ring of `slot_count` slots of `slot_size` bytes each
    pub fn new(slot_size: usize, slot_count: usize) -> Result<Arc<Self>, RingBufferError> {
        if slot_size == 0 || slot_count == 0 {
            return Err(RingBufferError::InvalidCapacity(format!(
                "{} slots of {} bytes",
                slot_count, slot_size
            )));
        }
        let bytes = slot_size.checked_mul(slot_count).ok_or_else(|| {
            RingBufferError::InvalidCapacity(format!(
                "{} slots of {} bytes overflows",
                slot_count, slot_size
            ))
        })?;

        let storage: Box<[u8]> = vec![0u8; bytes].into_boxed_slice();
        // SAFETY: UnsafeCell<[u8]> is repr(transparent) over [u8]
        let arena = unsafe { Box::from_raw(Box::into_raw(storage) as *mut UnsafeCell<[u8]>) };
        let lens = (0..slot_count).map(|_| AtomicUsize::new(0)).collect();

        Ok(Arc::new(Self {
            arena,
            lens,
            slot_size,
            capacity: slot_count,
            producer: AtomicUsize::new(0),
            consumer: AtomicUsize::new(0),
            done: AtomicBool::new(false),
            reader_taken: AtomicBool::new(false),
            writer_taken: AtomicBool::new(false),
        }))
    }

    /// Hand out the single reader handle
    pub fn new_reader(self: &Arc<Self>) -> Result<RingReader, RingBufferError> {
        if self.reader_taken.swap(true, Ordering::AcqRel) {
            return Err(RingBufferError::HandleTaken("reader"));
        }
        Ok(RingReader {
            ring: Arc::clone(self),
        })
    }

    /// Hand out the single writer handle
    pub fn new_writer(self: &Arc<Self>) -> Result<RingWriter, RingBufferError> {
        if self.writer_taken.swap(true, Ordering::AcqRel) {
            return Err(RingBufferError::HandleTaken("writer"));
        }
        Ok(RingWriter {
            ring: Arc::clone(self),
        })
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Slots written but not yet read, always within `[0, capacity]`.
    ///
    /// Taken from two separate loads, so it is a snapshot while both sides
    /// are moving.
    pub fn distance(&self) -> usize {
        // Consumer first: it can only catch up to, never pass, the producer
        let consumed = self.consumer.load(Ordering::Acquire);
        let produced = self.producer.load(Ordering::Acquire);
        produced.wrapping_sub(consumed).min(self.capacity)
    }

    /// Free slots available to the writer
    pub fn available_write(&self) -> usize {
        self.capacity - self.distance()
    }

    /// Whether the writer has sealed the ring
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    fn slot_ptr(&self, index: usize) -> *mut u8 {
        debug_assert!(index < self.capacity);
        // SAFETY: index < capacity keeps the offset inside the arena
        unsafe { (self.arena.get() as *mut u8).add(index * self.slot_size) }
    }
}

/// Producer cursor. Not cloneable; move it to the producer thread.
pub struct RingWriter {
    ring: Arc<RingBuffer>,
}

impl RingWriter {
    /// Append one slot holding `bytes`
    pub fn try_write(&mut self, bytes: &[u8]) -> Result<(), RingBufferError> {
        let ring = &*self.ring;
        if ring.done.load(Ordering::Relaxed) {
            return Err(RingBufferError::WriterDone);
        }
        if bytes.len() > ring.slot_size {
            return Err(RingBufferError::SlotOverflow {
                len: bytes.len(),
                slot_size: ring.slot_size,
            });
        }

        let produced = ring.producer.load(Ordering::Relaxed);
        let consumed = ring.consumer.load(Ordering::Acquire);
        if produced.wrapping_sub(consumed) >= ring.capacity {
            return Err(RingBufferError::Full);
        }

        let index = produced % ring.capacity;
        // SAFETY: the consumer has released this slot (it is more than a
        // lap behind) and will not touch it until `producer` is published
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), ring.slot_ptr(index), bytes.len());
        }
        ring.lens[index].store(bytes.len(), Ordering::Relaxed);
        ring.producer.store(produced.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Seal the ring. Irreversible; a second call reports `WriterDone`.
    pub fn writer_done(&mut self) -> Result<(), RingBufferError> {
        if self.ring.done.swap(true, Ordering::Release) {
            return Err(RingBufferError::WriterDone);
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.ring.is_done()
    }

    pub fn distance(&self) -> usize {
        self.ring.distance()
    }

    pub fn available_write(&self) -> usize {
        self.ring.available_write()
    }
}

/// Consumer cursor. Not cloneable; move it to the consumer thread.
pub struct RingReader {
    ring: Arc<RingBuffer>,
}

impl RingReader {
    /// Append the oldest unread slot to `out`, returning its length
    pub fn try_read_into(&mut self, out: &mut Vec<u8>) -> Result<usize, RingBufferError> {
        let ring = &*self.ring;
        let consumed = ring.consumer.load(Ordering::Relaxed);
        let mut produced = ring.producer.load(Ordering::Acquire);

        if consumed == produced {
            if !ring.done.load(Ordering::Acquire) {
                return Err(RingBufferError::Empty);
            }
            // `done` is published after the last slot, so this load is final
            produced = ring.producer.load(Ordering::Acquire);
            if consumed == produced {
                return Err(RingBufferError::EndOfStream);
            }
        }

        let index = consumed % ring.capacity;
        let len = ring.lens[index].load(Ordering::Relaxed);
        // SAFETY: the producer published this slot with Release and will not
        // overwrite it until `consumer` moves past it
        let bytes = unsafe { slice::from_raw_parts(ring.slot_ptr(index), len) };
        out.extend_from_slice(bytes);
        ring.consumer.store(consumed.wrapping_add(1), Ordering::Release);
        Ok(len)
    }

    /// Read the oldest unread slot into a fresh buffer
    pub fn try_read(&mut self) -> Result<Vec<u8>, RingBufferError> {
        let mut out = Vec::with_capacity(self.ring.slot_size);
        self.try_read_into(&mut out)?;
        Ok(out)
    }

    /// Bytes held in published, unread slots. Only the newest slot can be
    /// short, so this is exact.
    pub fn ready_bytes(&self) -> usize {
        let ring = &*self.ring;
        let consumed = ring.consumer.load(Ordering::Relaxed);
        let produced = ring.producer.load(Ordering::Acquire);
        let ready = produced.wrapping_sub(consumed).min(ring.capacity);
        if ready == 0 {
            return 0;
        }
        let newest = produced.wrapping_sub(1) % ring.capacity;
        (ready - 1) * ring.slot_size + ring.lens[newest].load(Ordering::Relaxed)
    }

    /// Writer is done and every slot has been read
    pub fn is_finished(&self) -> bool {
        self.ring.is_done() && self.ring.distance() == 0
    }

    pub fn distance(&self) -> usize {
        self.ring.distance()
    }
}
