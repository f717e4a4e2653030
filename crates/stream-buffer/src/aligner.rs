// Re-chunks arbitrary network reads onto slot boundaries

/// Accumulates bytes and hands them out in whole slots.
///
/// Network chunks rarely match the buffer's slot size. Producers push every
/// chunk here, write out whole slots as space allows, and flush the short
/// remainder as the terminal write.
#[derive(Debug)]
pub struct SlotAligner {
    slot_size: usize,
    pending: Vec<u8>,
}

impl SlotAligner {
    pub fn new(slot_size: usize) -> Self {
        Self {
            slot_size,
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Whole slots currently pending
    pub fn full_slots(&self) -> usize {
        self.pending.len() / self.slot_size
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take up to `max_slots` whole slots, `None` if not even one is ready
    pub fn take_slots(&mut self, max_slots: usize) -> Option<Vec<u8>> {
        let slots = self.full_slots().min(max_slots);
        if slots == 0 {
            return None;
        }
        let rest = self.pending.split_off(slots * self.slot_size);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// Take everything left, including a short final slot
    pub fn take_remainder(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_takes_whole_slots_only() {
        let mut aligner = SlotAligner::new(4);
        aligner.push(b"abc");
        assert_eq!(aligner.take_slots(8), None);

        aligner.push(b"defghij");
        assert_eq!(aligner.full_slots(), 2);
        assert_eq!(aligner.take_slots(1).unwrap(), b"abcd");
        assert_eq!(aligner.take_slots(8).unwrap(), b"efgh");
        assert_eq!(aligner.pending_len(), 2);
        assert_eq!(aligner.take_remainder().unwrap(), b"ij");
        assert!(aligner.is_empty());
        assert_eq!(aligner.take_remainder(), None);
    }
}
