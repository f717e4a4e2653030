// Lazy chunk iterator issuing one range GET per chunk

use crate::client::RangeFetcher;
use crate::range::{ByteRanges, RangeTemplate};
use riff_core::Result;

/// Streams a remote resource as successive byte-range requests.
///
/// Template detection happens up front but its failure is only reported
/// on the first `next()`, so building the iterator never fails. The
/// iterator ends after the first error.
pub struct RangeChunks<F: RangeFetcher> {
    fetcher: F,
    url: String,
    template: Result<RangeTemplate>,
    ranges: ByteRanges,
    finished: bool,
}

impl<F: RangeFetcher> RangeChunks<F> {
    pub fn new(fetcher: F, url: String, total_size: u64, chunk_size: usize) -> Self {
        let template = RangeTemplate::detect(&url);
        Self {
            fetcher,
            url,
            template,
            ranges: ByteRanges::new(total_size, chunk_size as u64),
            finished: false,
        }
    }
}

impl<F: RangeFetcher> Iterator for RangeChunks<F> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let template = match &self.template {
            Ok(template) => *template,
            Err(e) => {
                self.finished = true;
                return Some(Err(e.clone()));
            }
        };

        let (start, end) = match self.ranges.next() {
            Some(range) => range,
            None => {
                self.finished = true;
                return None;
            }
        };

        log::debug!("Fetching range: bytes={}-{}", start, end);
        let result = self.fetcher.fetch(&template.apply(&self.url, start, end));
        match &result {
            Ok(data) => {
                let expected = (end - start + 1) as usize;
                if data.len() != expected {
                    log::warn!(
                        "Range {}-{} returned {} bytes, expected {}",
                        start,
                        end,
                        data.len(),
                        expected
                    );
                }
            }
            Err(e) => {
                log::error!("Range {}-{} failed: {}", start, end, e);
                self.finished = true;
            }
        }
        Some(result)
    }
}
