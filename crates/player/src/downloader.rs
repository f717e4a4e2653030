// Background thread pumping endpoint chunks into a sink

use crate::sink::SinkWriter;
use parking_lot::Mutex;
use riff_core::{AudioError, CancellationFlag, Endpoint, Result, SharedEndpoint};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Handle to a running download.
///
/// The thread owns the sink writer and closes it exactly once on the way
/// out. Cancellation is checked around every write, so a stop takes effect
/// within one chunk fetch. Dropping the handle detaches the thread.
pub struct Downloader {
    handle: Option<JoinHandle<()>>,
    error: Arc<Mutex<Option<AudioError>>>,
    finished: Arc<AtomicBool>,
}

impl Downloader {
    pub fn spawn(
        endpoint: SharedEndpoint,
        mut sink: Box<dyn SinkWriter>,
        cancel: CancellationFlag,
    ) -> Result<Self> {
        let error = Arc::new(Mutex::new(None));
        let finished = Arc::new(AtomicBool::new(false));

        let thread_error = error.clone();
        let thread_finished = finished.clone();
        let handle = thread::Builder::new()
            .name("riff-downloader".to_string())
            .spawn(move || {
                let description = endpoint.song_description();
                log::debug!("Downloader started: {}", description);

                // Record the failure before closing, so a consumer that sees
                // end of stream can already find it
                match pump(endpoint.as_ref(), sink.as_mut(), &cancel) {
                    Ok(()) => log::debug!("Downloader finished: {}", description),
                    Err(e) if e.is_transient() => {
                        log::debug!("Sink closed by consumer: {}", description)
                    }
                    Err(e) => {
                        log::error!("Download of \"{}\" failed: {}", description, e);
                        *thread_error.lock() = Some(e);
                    }
                }
                sink.close(&cancel);
                thread_finished.store(true, Ordering::Release);
            })?;

        Ok(Self {
            handle: Some(handle),
            error,
            finished,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Failure that ended the download, if any. Transient exits are not failures.
    pub fn take_error(&self) -> Option<AudioError> {
        self.error.lock().take()
    }

    /// Block until the thread exits. Only for shutdown paths and tests.
    pub fn join(mut self) -> Option<AudioError> {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Some(AudioError::InvalidState(
                    "downloader thread panicked".to_string(),
                ));
            }
        }
        self.take_error()
    }
}

fn pump(
    endpoint: &dyn Endpoint,
    sink: &mut dyn SinkWriter,
    cancel: &CancellationFlag,
) -> Result<()> {
    for chunk in endpoint.stream_chunks()? {
        if cancel.is_cancelled() {
            log::debug!("Download cancelled");
            return Ok(());
        }
        let chunk = chunk?;
        sink.write_chunk(&chunk, cancel)?;
        if cancel.is_cancelled() {
            log::debug!("Download cancelled after write");
            return Ok(());
        }
    }
    Ok(())
}
