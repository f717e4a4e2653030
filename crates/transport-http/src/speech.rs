// Synthesized-speech endpoint

use crate::client::{HttpClient, RangeFetcher};
use once_cell::sync::OnceCell;
use riff_core::{ChunkStream, Endpoint, Result};

/// Text-to-speech provider. Synthesis itself happens elsewhere; the
/// endpoint only needs the audio URLs it produces.
pub trait SpeechSynthesizer: Send + Sync {
    fn audio_urls(&self, text: &str) -> Result<Vec<String>>;
}

const DESCRIPTION_LIMIT: usize = 37;
const DESCRIPTION_TRUNCATED: usize = 35;

/// Endpoint playing spoken text, one GET per synthesized segment
pub struct SpeechEndpoint<F: RangeFetcher = HttpClient> {
    text: String,
    synthesizer: Box<dyn SpeechSynthesizer>,
    fetcher: F,
    urls: OnceCell<Vec<String>>,
}

impl SpeechEndpoint<HttpClient> {
    pub fn new(text: impl Into<String>, synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        Self::with_fetcher(text, synthesizer, HttpClient::new())
    }
}

impl<F: RangeFetcher> SpeechEndpoint<F> {
    pub fn with_fetcher(
        text: impl Into<String>,
        synthesizer: Box<dyn SpeechSynthesizer>,
        fetcher: F,
    ) -> Self {
        Self {
            text: text.into(),
            synthesizer,
            fetcher,
            urls: OnceCell::new(),
        }
    }

    fn synthesize(&self) -> Result<Vec<String>> {
        let urls = self.synthesizer.audio_urls(&self.text)?;
        log::debug!("Speech synthesized into {} segments", urls.len());
        Ok(urls)
    }
}

impl<F: RangeFetcher> Endpoint for SpeechEndpoint<F> {
    fn initialize(&self) -> Result<()> {
        self.urls.get_or_try_init(|| self.synthesize())?;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.urls.get().is_some()
    }

    fn stream_chunks(&self) -> Result<ChunkStream> {
        let urls = self.urls.get_or_try_init(|| self.synthesize())?.clone();
        let fetcher = self.fetcher.clone();
        Ok(Box::new(urls.into_iter().map(move |url| fetcher.fetch(&url))))
    }

    fn song_description(&self) -> String {
        let text = if self.text.chars().count() > DESCRIPTION_LIMIT {
            let head: String = self.text.chars().take(DESCRIPTION_TRUNCATED).collect();
            format!("{}…", head)
        } else {
            self.text.clone()
        };
        format!("Text to speech: '{}'", text)
    }

    fn length(&self) -> Option<u64> {
        None
    }

    fn bit_rate(&self) -> Option<u32> {
        None
    }
}
