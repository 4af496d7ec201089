//! Easy2 handler: records status line, headers and body, and queues the
//! readiness/progress events `CurlRequest::poll` hands to the loader.

use std::str;

use crate::transport::{ReadyState, TransportEvent};

#[derive(Debug, Default)]
pub(super) struct Collector {
    pub(super) events: Vec<TransportEvent>,
    pub(super) status: u16,
    pub(super) status_text: String,
    pub(super) headers: Vec<(String, String)>,
    pub(super) body: Vec<u8>,
    content_length: Option<u64>,
    headers_reported: bool,
}

impl Collector {
    fn report_headers(&mut self) {
        if !self.headers_reported {
            self.headers_reported = true;
            self.events
                .push(TransportEvent::ReadyStateChange(ReadyState::HeadersReceived));
        }
    }

    /// True when the header block just finished belongs to the response the
    /// body will come from (not an interim 1xx or a redirect curl follows).
    fn is_final_response(&self) -> bool {
        let redirect = (300..400).contains(&self.status)
            && self
                .headers
                .iter()
                .any(|(n, _)| n.eq_ignore_ascii_case("location"));
        self.status >= 200 && !redirect
    }
}

impl curl::easy::Handler for Collector {
    fn header(&mut self, data: &[u8]) -> bool {
        let Ok(line) = str::from_utf8(data) else {
            return true;
        };
        let line = line.trim_end();
        if line.starts_with("HTTP/") {
            // New response on the same transfer (redirect hop or 100-continue).
            let (status, text) = parse_status_line(line);
            self.status = status;
            self.status_text = text;
            self.headers.clear();
            self.content_length = None;
        } else if line.is_empty() {
            if self.is_final_response() {
                self.report_headers();
            }
        } else if let Some((name, value)) = line.split_once(':') {
            let (name, value) = (name.trim(), value.trim());
            if name.eq_ignore_ascii_case("content-length") {
                self.content_length = value.parse().ok();
            }
            self.headers.push((name.to_string(), value.to_string()));
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        self.report_headers();
        self.body.extend_from_slice(data);
        // Browsers fire readystatechange for every chunk while loading.
        self.events
            .push(TransportEvent::ReadyStateChange(ReadyState::Loading));
        self.events.push(TransportEvent::Progress {
            loaded: self.body.len() as u64,
            total: self.content_length,
            chunk_len: data.len(),
        });
        Ok(data.len())
    }
}

/// `HTTP/1.1 503 Service Unavailable` -> (503, "Service Unavailable").
/// HTTP/2 status lines carry no reason phrase.
fn parse_status_line(line: &str) -> (u16, String) {
    let mut parts = line.splitn(3, ' ');
    let _version = parts.next();
    let status = parts
        .next()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let text = parts.next().unwrap_or("").trim().to_string();
    (status, text)
}
