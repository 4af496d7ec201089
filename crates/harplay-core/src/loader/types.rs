//! Values exchanged between the loader and its Player.

use std::time::Duration;

use crate::transport::Request;

/// How the response body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Raw bytes (media segments, keys).
    #[default]
    Binary,
    /// UTF-8 text (manifests, playlists).
    Text,
}

/// What to fetch. Immutable for the duration of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadContext {
    pub url: String,
    pub response_type: ResponseType,
    pub range_start: Option<u64>,
    /// Exclusive end offset; a byte-range request is issued when set.
    pub range_end: Option<u64>,
    /// Hand partial body chunks to `on_progress`.
    pub report_progress_data: bool,
}

impl LoadContext {
    pub fn new(url: impl Into<String>, response_type: ResponseType) -> Self {
        Self {
            url: url.into(),
            response_type,
            ..Self::default()
        }
    }

    /// Restrict the request to `[start, end)`.
    pub fn with_range(mut self, start: u64, end: u64) -> Self {
        self.range_start = Some(start);
        self.range_end = Some(end);
        self
    }

    /// `Range` header value for `[range_start, range_end)`, if a range is set.
    pub fn range_header(&self) -> Option<String> {
        let end = self.range_end.filter(|&end| end > 0)?;
        Some(format!(
            "bytes={}-{}",
            self.range_start.unwrap_or(0),
            end - 1
        ))
    }
}

/// Retry and timeout parameters for one `load` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConfig {
    /// Retries allowed after the first failed attempt.
    pub max_retry: u32,
    /// Allowed silence between readiness changes before `on_timeout`.
    pub timeout: Duration,
    /// Delay before the first retry.
    pub retry_delay: Duration,
    /// Ceiling for the doubling retry delay.
    pub max_retry_delay: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_retry: 6,
            timeout: Duration::from_secs(20),
            retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(64),
        }
    }
}

/// Statistics of the current `load` run, shared with the Player on every callback.
///
/// Timestamps are offsets on the loader's clock; `Duration::ZERO` means the
/// point has not been reached yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadStats {
    /// Set only by `abort()`.
    pub aborted: bool,
    pub request_start_time: Duration,
    pub first_byte_time: Duration,
    pub load_end_time: Duration,
    pub loaded: u64,
    pub total: u64,
    pub retry_count: u32,
    /// Progress notifications seen in the current attempt.
    pub chunk_count: u32,
    /// Download bandwidth in bits/s, computed when the load succeeds.
    pub bw_estimate: f64,
}

impl LoadStats {
    /// Time from request start to completion, if completed.
    pub fn load_duration(&self) -> Option<Duration> {
        if self.load_end_time.is_zero() {
            return None;
        }
        Some(self.load_end_time.saturating_sub(self.request_start_time))
    }

    pub(crate) fn estimate_bandwidth(&mut self) {
        self.bw_estimate = match self.load_duration() {
            Some(d) if !d.is_zero() => self.loaded as f64 * 8.0 / d.as_secs_f64(),
            _ => 0.0,
        };
    }
}

/// Decoded response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseData {
    Binary(Vec<u8>),
    Text(String),
}

impl ResponseData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ResponseData::Binary(b) => b,
            ResponseData::Text(s) => s.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Successful result handed to `on_success`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderResponse {
    /// URL the body came from, after redirects.
    pub url: String,
    pub data: ResponseData,
}

/// Terminal failure handed to `on_error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code} {text}")]
pub struct LoadError {
    /// HTTP status, or the request's status (usually 0) when it never opened.
    pub code: u16,
    pub text: String,
}

impl LoadError {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }
}

/// View of the request handle passed along with every callback.
#[derive(Debug, Clone, Copy)]
pub struct NetworkDetails<'a> {
    pub status: u16,
    pub status_text: &'a str,
    pub response_url: &'a str,
    pub response_headers: &'a [(String, String)],
}

impl<'a> NetworkDetails<'a> {
    pub fn from_request<R: Request + ?Sized>(request: &'a R) -> Self {
        Self {
            status: request.status(),
            status_text: request.status_text(),
            response_url: request.response_url(),
            response_headers: request.response_headers(),
        }
    }

    /// Case-insensitive response header lookup.
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.response_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
