//! HTTP request primitive the loader drives.
//!
//! A [`Request`] behaves like a browser request handle: it is opened, gets
//! headers set, is sent, and then reports readiness changes and progress
//! through [`Request::poll`]. [`CurlTransport`] is the libcurl-backed
//! implementation; tests plug in scripted transports through the same traits.

mod error;
mod libcurl;

pub use error::TransportError;
pub use libcurl::{CurlRequest, CurlTransport};

use std::time::Duration;

/// Coarse progress stage of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyState {
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

/// Notification produced by [`Request::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The request moved to (or, while loading, stayed in) a readiness state.
    ReadyStateChange(ReadyState),
    /// Body bytes arrived. `loaded` is cumulative; `total` is known only when
    /// the response declared its length. The chunk itself is the last
    /// `chunk_len` bytes of [`Request::body`] up to `loaded`.
    Progress {
        loaded: u64,
        total: Option<u64>,
        chunk_len: usize,
    },
}

/// One HTTP request handle.
pub trait Request {
    fn ready_state(&self) -> ReadyState;

    /// Prepare the request. Fails with [`TransportError::Open`] for URLs the
    /// transport refuses to fetch.
    fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError>;

    /// Add a request header. Only valid once opened and before `send`.
    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError>;

    fn send(&mut self) -> Result<(), TransportError>;

    /// Wait up to `timeout` for network activity and return what happened.
    fn poll(&mut self, timeout: Duration) -> Vec<TransportEvent>;

    /// Cancel the request. No further events are produced.
    fn abort(&mut self);

    /// HTTP status; 0 before headers arrive or after a transport failure.
    fn status(&self) -> u16;
    fn status_text(&self) -> &str;
    /// Final URL after redirects.
    fn response_url(&self) -> &str;
    fn response_headers(&self) -> &[(String, String)];
    /// Body bytes received so far.
    fn body(&self) -> &[u8];
    fn take_body(&mut self) -> Vec<u8>;
}

/// Factory for fresh request handles; one per attempt.
pub trait Transport {
    type Request: Request;

    fn create_request(&mut self) -> Self::Request;
}
