// HTTP client configuration and utilities

use riff_core::{AudioError, Result};
use std::io::Read;
use std::time::Duration;

/// HTTP agent settings
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub user_agent: String,
    pub redirects: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (compatible; RiffStream/0.2)".to_string(),
            redirects: 10,
        }
    }
}

impl HttpConfig {
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Create a configured HTTP agent with proper timeouts and settings
pub fn create_http_agent(config: &HttpConfig) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(config.connect_timeout)
        .timeout_read(config.read_timeout)
        .timeout_write(config.write_timeout)
        .user_agent(&config.user_agent)
        .redirects(config.redirects)
        .build()
}

/// Source of raw bytes for chunked streaming.
///
/// Range requests are encoded into the URL itself, so a fetch is a plain GET.
pub trait RangeFetcher: Clone + Send + Sync + 'static {
    /// GET `url` and return the whole body
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;

    /// Total size of the resource at `url`, when the server reports one
    fn content_length(&self, url: &str) -> Result<Option<u64>>;
}

/// HTTP client wrapper
#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_config(&HttpConfig::default())
    }

    pub fn with_config(config: &HttpConfig) -> Self {
        Self {
            agent: create_http_agent(config),
        }
    }

    pub fn get(&self, url: &str) -> Result<ureq::Response> {
        self.agent
            .get(url)
            .call()
            .map_err(|e| AudioError::NetworkError(format!("HTTP GET failed: {}", e)))
    }

    pub fn head(&self, url: &str) -> Result<ureq::Response> {
        self.agent
            .head(url)
            .call()
            .map_err(|e| AudioError::NetworkError(format!("HTTP HEAD failed: {}", e)))
    }

    fn probe_size_with_range_request(&self, url: &str) -> Result<Option<u64>> {
        let response = self
            .agent
            .get(url)
            .set("Range", "bytes=0-0")
            .call()
            .map_err(|e| AudioError::NetworkError(format!("Range request failed: {}", e)))?;

        if let Some(range) = response.header("Content-Range") {
            if let Some(total) = parse_total_from_content_range(range) {
                return Ok(Some(total));
            }
        }
        Ok(None)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeFetcher for HttpClient {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url)?;
        let mut data = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut data)
            .map_err(|e| AudioError::NetworkError(format!("Failed to read response: {}", e)))?;
        Ok(data)
    }

    fn content_length(&self, url: &str) -> Result<Option<u64>> {
        let from_head = match self.head(url) {
            Ok(response) => parse_content_length(response.header("Content-Length")),
            Err(e) => {
                log::debug!("HEAD failed: {}", e);
                None
            }
        };
        match from_head {
            Some(length) => Ok(Some(length)),
            None => {
                log::debug!("No Content-Length for {}, probing with a range request", url);
                self.probe_size_with_range_request(url)
            }
        }
    }
}

fn parse_content_length(header: Option<&str>) -> Option<u64> {
    header?.trim().parse::<u64>().ok()
}

/// Total size from a `Content-Range: bytes 0-0/12345` header
pub fn parse_total_from_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse::<u64>().ok()
}
