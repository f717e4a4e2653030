// Depletion-driven refill: keeps a StreamBuffer topped up from a chunk stream
// on the reading thread instead of a dedicated downloader

use crate::aligner::SlotAligner;
use crate::buffer::{DepletionObserver, StreamBuffer};
use parking_lot::Mutex;
use riff_core::{AudioError, ChunkStream, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct FillState {
    chunks: Option<ChunkStream>,
    aligner: SlotAligner,
}

/// Pull-mode producer for a StreamBuffer.
///
/// Primes the buffer up front, then refills it from inside the depletion
/// notification until the producer lead is back above the threshold.
pub struct BufferFiller {
    state: Mutex<FillState>,
    /// Held while a refill is in progress; overlapping notifications are dropped
    refilling: AtomicBool,
    error: Mutex<Option<AudioError>>,
}

/// Releases the refill flag on every exit path
struct RefillGuard<'a>(&'a AtomicBool);

impl Drop for RefillGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BufferFiller {
    /// Prime `buffer` and start refilling on depletion.
    ///
    /// Primes at least one slot past the depletion threshold even when
    /// `initial_slots` asks for less, so the first read can notify.
    pub fn attach(
        buffer: &StreamBuffer,
        chunks: ChunkStream,
        initial_slots: usize,
    ) -> Result<Arc<Self>> {
        let filler = Arc::new(Self {
            state: Mutex::new(FillState {
                chunks: Some(chunks),
                aligner: SlotAligner::new(buffer.slot_size()),
            }),
            refilling: AtomicBool::new(false),
            error: Mutex::new(None),
        });

        let target = initial_slots
            .max(buffer.depletion_threshold() + 1)
            .min(buffer.slot_count());
        filler.fill_to(buffer, target)?;
        log::debug!("BufferFiller primed {} slots", buffer.distance());

        if !buffer.is_sealed() {
            buffer.add_observer(filler.clone());
        }
        Ok(filler)
    }

    /// Refill until the buffer holds at least `target` slots or the stream ends.
    ///
    /// Returns immediately if another refill is already running.
    pub fn fill_to(&self, buffer: &StreamBuffer, target: usize) -> Result<()> {
        if self
            .refilling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("BufferFiller: refill already in progress");
            return Ok(());
        }
        let _guard = RefillGuard(&self.refilling);

        let mut state = self.state.lock();
        loop {
            if buffer.is_sealed() {
                return Ok(());
            }
            let distance = buffer.distance();
            if distance >= target {
                return Ok(());
            }

            let wanted = (target - distance).min(buffer.free_slots());
            if let Some(slots) = state.aligner.take_slots(wanted) {
                buffer.write(&slots)?;
                continue;
            }

            let next = state.chunks.as_mut().and_then(|chunks| chunks.next());
            match next {
                Some(Ok(bytes)) => state.aligner.push(&bytes),
                Some(Err(e)) => {
                    log::error!("BufferFiller: chunk stream failed: {}", e);
                    state.chunks = None;
                    buffer.seal();
                    *self.error.lock() = Some(e.clone());
                    return Err(e);
                }
                None => {
                    state.chunks = None;
                    if let Some(rest) = state.aligner.take_remainder() {
                        buffer.write(&rest)?;
                    }
                    buffer.seal();
                    log::debug!("BufferFiller: chunk stream exhausted, buffer sealed");
                    return Ok(());
                }
            }
        }
    }

    /// Error that ended the chunk stream early, if any
    pub fn take_error(&self) -> Option<AudioError> {
        self.error.lock().take()
    }

    pub fn is_refilling(&self) -> bool {
        self.refilling.load(Ordering::Acquire)
    }
}

impl DepletionObserver for BufferFiller {
    fn on_depleted(&self, buffer: &StreamBuffer, distance: usize) {
        // An under-run can arrive above the threshold; always add a slot
        let target = (buffer.depletion_threshold() + 1)
            .max(distance + 1)
            .min(buffer.slot_count());
        if let Err(e) = self.fill_to(buffer, target) {
            if !e.is_transient() {
                log::error!("BufferFiller: refill failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(data: Vec<u8>, chunk_size: usize) -> ChunkStream {
        let pieces: Vec<Result<Vec<u8>>> =
            data.chunks(chunk_size).map(|c| Ok(c.to_vec())).collect();
        Box::new(pieces.into_iter())
    }

    fn drain(buffer: &StreamBuffer, read_size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let data = buffer.read(read_size).unwrap();
            if data.is_empty() {
                return out;
            }
            out.extend_from_slice(&data);
        }
    }

    #[test]
    fn test_primes_initial_slots() {
        let buffer = StreamBuffer::new(4, 8, 2).unwrap();
        let data: Vec<u8> = (0..100).collect();
        let _filler = BufferFiller::attach(&buffer, chunks(data, 3), 5).unwrap();
        assert_eq!(buffer.distance(), 5);
        assert!(!buffer.is_sealed());
    }

    #[test]
    fn test_refills_until_sealed() {
        let buffer = StreamBuffer::new(4, 4, 1).unwrap();
        let data: Vec<u8> = (0..=200).collect();
        let filler = BufferFiller::attach(&buffer, chunks(data.clone(), 7), 2).unwrap();

        assert_eq!(drain(&buffer, 4), data);
        assert!(buffer.is_drained());
        assert!(filler.take_error().is_none());
    }

    #[test]
    fn test_unprimed_attach_still_refills() {
        let buffer = StreamBuffer::new(4, 4, 1).unwrap();
        let data: Vec<u8> = (0..16).collect();
        let _filler = BufferFiller::attach(&buffer, chunks(data.clone(), 16), 0).unwrap();
        assert_eq!(buffer.distance(), 2);

        assert_eq!(drain(&buffer, 4), data);
        assert!(buffer.is_drained());
    }

    #[test]
    fn test_under_run_pulls_more_slots() {
        let buffer = StreamBuffer::new(4, 8, 0).unwrap();
        let data: Vec<u8> = (0..64).collect();
        let _filler = BufferFiller::attach(&buffer, chunks(data.clone(), 4), 1).unwrap();
        assert_eq!(buffer.distance(), 1);

        // Needs four slots; each under-run adds one until the read fits
        let mut under_runs = 0;
        let first = loop {
            match buffer.read(16) {
                Ok(bytes) => break bytes,
                Err(AudioError::BufferEmpty) => under_runs += 1,
                Err(e) => panic!("unexpected read error: {}", e),
            }
            assert!(under_runs < 10, "refill never caught up");
        };
        assert_eq!(first, &data[..16]);
        assert_eq!(under_runs, 3);

        let mut out = first;
        loop {
            match buffer.read(16) {
                Ok(bytes) if bytes.is_empty() => break,
                Ok(bytes) => out.extend_from_slice(&bytes),
                Err(AudioError::BufferEmpty) => {}
                Err(e) => panic!("unexpected read error: {}", e),
            }
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_short_source_seals_on_prime() {
        let buffer = StreamBuffer::new(4, 4, 1).unwrap();
        BufferFiller::attach(&buffer, chunks(b"hello".to_vec(), 2), 4).unwrap();
        assert!(buffer.is_sealed());
        assert_eq!(drain(&buffer, 3), b"hello");
    }

    #[test]
    fn test_stream_error_seals_and_is_kept() {
        let buffer = StreamBuffer::new(2, 4, 1).unwrap();
        let items: Vec<Result<Vec<u8>>> = vec![
            Ok(b"ab".to_vec()),
            Err(AudioError::NetworkError("reset".to_string())),
        ];
        let result = BufferFiller::attach(&buffer, Box::new(items.into_iter()), 3);
        assert!(matches!(result, Err(AudioError::NetworkError(_))));
        assert!(buffer.is_sealed());
        assert_eq!(drain(&buffer, 2), b"ab");
    }

    #[test]
    fn test_overlapping_refill_is_skipped() {
        let buffer = StreamBuffer::new(2, 4, 0).unwrap();
        let filler = BufferFiller::attach(&buffer, chunks(vec![9u8; 8], 2), 1).unwrap();
        assert_eq!(buffer.distance(), 1);

        filler.refilling.store(true, Ordering::Release);
        filler.fill_to(&buffer, 4).unwrap();
        assert_eq!(buffer.distance(), 1);

        filler.refilling.store(false, Ordering::Release);
        filler.fill_to(&buffer, 4).unwrap();
        assert_eq!(buffer.distance(), 4);
    }
}
