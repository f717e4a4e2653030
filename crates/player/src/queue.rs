// Pending songs for a playback session

use rand::seq::SliceRandom;
use rand::thread_rng;
use riff_core::{AudioError, Result, SharedEndpoint};
use std::collections::VecDeque;

/// Ordered songs waiting to be played.
///
/// The queue never starts playback and never holds the song currently
/// playing; the session pops from it when a song finishes.
#[derive(Default)]
pub struct SongQueue {
    entries: VecDeque<SharedEndpoint>,
}

impl SongQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `endpoints` in order at `position`, or at the end.
    ///
    /// A position past the end fails with `QueuePosition` and leaves the
    /// queue untouched. Returns the new queue length.
    pub fn enqueue<I>(&mut self, endpoints: I, position: Option<usize>) -> Result<usize>
    where
        I: IntoIterator<Item = SharedEndpoint>,
    {
        let len = self.entries.len();
        let position = position.unwrap_or(len);
        if position > len {
            return Err(AudioError::QueuePosition { position, len });
        }

        let mut added = 0;
        for (offset, endpoint) in endpoints.into_iter().enumerate() {
            log::debug!("Enqueued \"{}\" at {}", endpoint.song_description(), position + offset);
            self.entries.insert(position + offset, endpoint);
            added += 1;
        }
        log::info!("Queued {} song(s), {} pending", added, self.entries.len());
        Ok(self.entries.len())
    }

    pub fn push(&mut self, endpoint: SharedEndpoint) {
        self.entries.push_back(endpoint);
    }

    /// Pop the head, `None` when empty
    pub fn get_next(&mut self) -> Option<SharedEndpoint> {
        self.entries.pop_front()
    }

    pub fn peek_next(&self) -> Option<&SharedEndpoint> {
        self.entries.front()
    }

    pub fn shuffle(&mut self) {
        self.entries.make_contiguous().shuffle(&mut thread_rng());
        log::debug!("Shuffled {} pending songs", self.entries.len());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn remove(&mut self, index: usize) -> Option<SharedEndpoint> {
        self.entries.remove(index)
    }

    /// Seconds of known length across pending songs; unknown counts as zero
    pub fn get_total_length(&self) -> u64 {
        self.entries.iter().filter_map(|e| e.length()).sum()
    }

    pub fn enqueued(&self) -> impl Iterator<Item = &SharedEndpoint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
