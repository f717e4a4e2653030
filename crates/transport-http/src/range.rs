// Byte-range templates for providers that take the range in the URL

use once_cell::sync::Lazy;
use regex::Regex;
use riff_core::{AudioError, Result};

/// How a byte range is injected into a stream URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeTemplate {
    /// `...videoplayback?k=v` + `&range={start}-{end}`
    QueryParameter,
    /// `...videoplayback/k/v/` + `range/{start}-{end}/`
    PathSegment,
}

const URL_SHAPES: &[(RangeTemplate, &str)] = &[
    (
        RangeTemplate::QueryParameter,
        r"^https://.*\.googlevideo\.com/videoplayback\?([^/]+=[^/]*&)*[^/]+=[^/]*$",
    ),
    (
        RangeTemplate::PathSegment,
        r"^https://.*\.googlevideo\.com/videoplayback/([^&=?]+/)+$",
    ),
];

static SHAPES: Lazy<Vec<(RangeTemplate, Regex)>> = Lazy::new(|| {
    URL_SHAPES
        .iter()
        .filter_map(|(template, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((*template, re)),
            Err(e) => {
                log::error!("Invalid URL shape pattern {}: {}", pattern, e);
                None
            }
        })
        .collect()
});

impl RangeTemplate {
    /// Pick the template for a resolved stream URL
    pub fn detect(url: &str) -> Result<Self> {
        SHAPES
            .iter()
            .find(|(_, re)| re.is_match(url))
            .map(|(template, _)| *template)
            .ok_or_else(|| {
                AudioError::ConfigurationError(format!("Unrecognized stream URL shape: {}", url))
            })
    }

    /// URL requesting bytes `start..=end`
    pub fn apply(self, url: &str, start: u64, end: u64) -> String {
        match self {
            RangeTemplate::QueryParameter => format!("{}&range={}-{}", url, start, end),
            RangeTemplate::PathSegment => format!("{}range/{}-{}/", url, start, end),
        }
    }
}

/// Inclusive byte ranges `[0, C-1], [C, 2C-1], ...` covering `total` bytes
#[derive(Debug, Clone)]
pub struct ByteRanges {
    next: u64,
    total: u64,
    chunk_size: u64,
}

impl ByteRanges {
    pub fn new(total: u64, chunk_size: u64) -> Self {
        Self {
            next: 0,
            total,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Iterator for ByteRanges {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let start = self.next;
        let end = start
            .saturating_add(self.chunk_size - 1)
            .min(self.total - 1);
        self.next = end + 1;
        Some((start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total.saturating_sub(self.next);
        let count = ((remaining + self.chunk_size - 1) / self.chunk_size) as usize;
        (count, Some(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY_URL: &str =
        "https://r4---sn-abc.googlevideo.com/videoplayback?expire=1&id=o-abc&itag=140";
    const PATH_URL: &str = "https://r4---sn-abc.googlevideo.com/videoplayback/id/abc/itag/140/";

    #[test]
    fn test_all_shapes_compile() {
        assert_eq!(SHAPES.len(), URL_SHAPES.len());
    }

    #[test]
    fn test_detect_query_shape() {
        assert_eq!(RangeTemplate::detect(QUERY_URL), Ok(RangeTemplate::QueryParameter));
        assert_eq!(
            RangeTemplate::QueryParameter.apply(QUERY_URL, 0, 65535),
            format!("{}&range=0-65535", QUERY_URL)
        );
    }

    #[test]
    fn test_detect_path_shape() {
        assert_eq!(RangeTemplate::detect(PATH_URL), Ok(RangeTemplate::PathSegment));
        assert_eq!(
            RangeTemplate::PathSegment.apply(PATH_URL, 10, 19),
            format!("{}range/10-19/", PATH_URL)
        );
    }

    #[test]
    fn test_unknown_shape_is_configuration_error() {
        let err = RangeTemplate::detect("https://example.com/song.m4a").unwrap_err();
        assert!(matches!(err, AudioError::ConfigurationError(_)));
        assert!(RangeTemplate::detect("http://r4.googlevideo.com/videoplayback?a=b").is_err());
    }

    #[test]
    fn test_ranges_truncate_last_chunk() {
        let ranges: Vec<_> = ByteRanges::new(10, 4).collect();
        assert_eq!(ranges, vec![(0, 3), (4, 7), (8, 9)]);

        let exact: Vec<_> = ByteRanges::new(8, 4).collect();
        assert_eq!(exact, vec![(0, 3), (4, 7)]);

        assert_eq!(ByteRanges::new(0, 4).next(), None);
        assert_eq!(ByteRanges::new(10, 4).size_hint(), (3, Some(3)));
    }
}
