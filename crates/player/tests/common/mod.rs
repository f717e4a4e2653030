#![allow(dead_code)]

use parking_lot::Mutex;
use riff_core::{AudioError, ChunkStream, Endpoint, Result};
use riff_player::{AudioSource, CompletionHandle, Transport};
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Fixed bytes served in fixed-size chunks
pub struct BytesEndpoint {
    pub title: String,
    pub data: Vec<u8>,
    pub chunk_size: usize,
}

impl BytesEndpoint {
    pub fn new(title: &str, data: Vec<u8>, chunk_size: usize) -> Arc<Self> {
        Arc::new(Self {
            title: title.to_string(),
            data,
            chunk_size,
        })
    }
}

impl Endpoint for BytesEndpoint {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn stream_chunks(&self) -> Result<ChunkStream> {
        let chunks: Vec<Result<Vec<u8>>> = self
            .data
            .chunks(self.chunk_size)
            .map(|c| Ok(c.to_vec()))
            .collect();
        Ok(Box::new(chunks.into_iter()))
    }

    fn song_description(&self) -> String {
        self.title.clone()
    }

    fn length(&self) -> Option<u64> {
        None
    }

    fn bit_rate(&self) -> Option<u32> {
        None
    }
}

/// Read `source` to end of stream, retrying while the producer is behind
pub fn drain(source: &mut dyn Read) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = [0u8; 64];
    loop {
        match source.read(&mut buf) {
            Ok(0) => return Ok(out),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(Duration::from_millis(1)),
            Err(e) => return Err(e),
        }
    }
}

/// Transport that reads each song on its own thread, like a voice client
#[derive(Default)]
pub struct ReadingTransport {
    pub received: Arc<Mutex<Vec<Vec<u8>>>>,
    paused: AtomicBool,
}

impl Transport for ReadingTransport {
    fn play(&self, mut source: AudioSource, on_complete: CompletionHandle) -> Result<()> {
        let received = self.received.clone();
        thread::spawn(move || match drain(&mut source) {
            Ok(bytes) => {
                received.lock().push(bytes);
                on_complete.complete(None);
            }
            Err(e) => on_complete.complete(Some(AudioError::PlaybackError(e.to_string()))),
        });
        Ok(())
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn stop(&self) {}

    fn is_playing(&self) -> bool {
        true
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
