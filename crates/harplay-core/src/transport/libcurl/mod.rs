//! libcurl transport: one multi handle per request, driven by `poll`.
//!
//! The multi interface is single-threaded and event-driven, which is exactly
//! the shape the loader's cooperative event loop needs: `poll` performs,
//! waits for socket activity up to a timeout, and hands back whatever the
//! easy handle's [`Collector`] recorded.

mod collector;

use std::time::Duration;

use curl::easy::{Easy2, List};
use curl::multi::{Easy2Handle, Multi};
use url::Url;

use super::{ReadyState, Request, Transport, TransportError, TransportEvent};
use collector::Collector;

const MAX_REDIRECTS: u32 = 10;

/// Creates [`CurlRequest`]s.
#[derive(Debug, Clone, Copy)]
pub struct CurlTransport {
    connect_timeout: Duration,
}

/// No connect deadline of its own: a stalled connect is reported through the
/// loader's timeout like any other silence.
impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::ZERO,
        }
    }
}

impl CurlTransport {
    /// `Duration::ZERO` leaves curl's built-in connect limit in place.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Transport for CurlTransport {
    type Request = CurlRequest;

    fn create_request(&mut self) -> CurlRequest {
        CurlRequest::new(self.connect_timeout)
    }
}

/// Request handle backed by a curl multi + `Easy2<Collector>`.
pub struct CurlRequest {
    state: ReadyState,
    method: String,
    url: String,
    request_headers: Vec<(String, String)>,
    connect_timeout: Duration,
    multi: Multi,
    handle: Option<Easy2Handle<Collector>>,
    // Filled in when the transfer completes.
    status: u16,
    status_text: String,
    response_url: String,
    response_headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl CurlRequest {
    fn new(connect_timeout: Duration) -> Self {
        Self {
            state: ReadyState::Unsent,
            method: String::new(),
            url: String::new(),
            request_headers: Vec::new(),
            connect_timeout,
            multi: Multi::new(),
            handle: None,
            status: 0,
            status_text: String::new(),
            response_url: String::new(),
            response_headers: Vec::new(),
            body: Vec::new(),
        }
    }

    fn build_easy(&self) -> Result<Easy2<Collector>, TransportError> {
        let mut easy = Easy2::new(Collector::default());
        easy.url(&self.url)?;
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        if !self.connect_timeout.is_zero() {
            easy.connect_timeout(self.connect_timeout)?;
        }
        match self.method.as_str() {
            "GET" => easy.get(true)?,
            "HEAD" => easy.nobody(true)?,
            other => easy.custom_request(other)?,
        }
        if !self.request_headers.is_empty() {
            let mut list = List::new();
            for (k, v) in &self.request_headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }

    /// Run the transfer and collect events; completes the request when curl
    /// reports the transfer finished.
    fn drive(&mut self) -> Vec<TransportEvent> {
        if let Err(e) = self.multi.perform() {
            self.complete(Err(e.to_string()));
            return vec![TransportEvent::ReadyStateChange(ReadyState::Done)];
        }
        let mut events = match self.handle.as_mut() {
            Some(handle) => std::mem::take(&mut handle.get_mut().events),
            None => return Vec::new(),
        };
        for event in &events {
            if let TransportEvent::ReadyStateChange(state) = event {
                self.state = *state;
            }
        }

        let mut finished = None;
        if let Some(handle) = self.handle.as_ref() {
            self.multi.messages(|msg| {
                if let Some(result) = msg.result_for2(handle) {
                    finished = Some(result.map_err(|e| e.to_string()));
                }
            });
        }
        if let Some(result) = finished {
            self.complete(result);
            events.push(TransportEvent::ReadyStateChange(ReadyState::Done));
        }
        events
    }

    fn complete(&mut self, result: Result<(), String>) {
        self.state = ReadyState::Done;
        self.response_url = self.url.clone();
        let Some(handle) = self.handle.take() else {
            return;
        };
        let mut easy = match self.multi.remove2(handle) {
            Ok(easy) => easy,
            Err(e) => {
                self.status = 0;
                self.status_text = e.to_string();
                return;
            }
        };
        let code = easy.response_code().unwrap_or(0);
        if let Ok(Some(effective)) = easy.effective_url() {
            self.response_url = effective.to_string();
        }
        let collector = easy.get_mut();
        self.response_headers = std::mem::take(&mut collector.headers);
        self.body = std::mem::take(&mut collector.body);
        match result {
            Ok(()) => {
                self.status = u16::try_from(code).unwrap_or(0);
                self.status_text = std::mem::take(&mut collector.status_text);
            }
            Err(message) => {
                tracing::debug!(url = %self.url, error = %message, "transfer failed");
                self.status = 0;
                self.status_text = message;
            }
        }
    }
}

impl Request for CurlRequest {
    fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError> {
        let parsed =
            Url::parse(url).map_err(|e| TransportError::Open(format!("invalid URL {url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::Open(format!(
                "scheme `{}` is not allowed for {url}",
                parsed.scheme()
            )));
        }
        if let Some(handle) = self.handle.take() {
            let _ = self.multi.remove2(handle);
        }
        self.method = method.to_ascii_uppercase();
        self.url = url.to_string();
        self.request_headers.clear();
        self.state = ReadyState::Opened;
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        if self.state != ReadyState::Opened || self.handle.is_some() {
            return Err(TransportError::InvalidState(
                "headers can only be set on an opened, unsent request",
            ));
        }
        self.request_headers
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn send(&mut self) -> Result<(), TransportError> {
        if self.state != ReadyState::Opened || self.handle.is_some() {
            return Err(TransportError::InvalidState("request must be opened and not yet sent"));
        }
        let easy = self.build_easy()?;
        self.handle = Some(self.multi.add2(easy)?);
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Vec<TransportEvent> {
        if self.handle.is_none() {
            return Vec::new();
        }
        let events = self.drive();
        if !events.is_empty() {
            return events;
        }
        if let Err(e) = self.multi.wait(&mut [], timeout) {
            tracing::debug!(url = %self.url, error = %e, "curl multi wait failed");
        }
        self.drive()
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.multi.remove2(handle);
        }
        self.state = ReadyState::Unsent;
    }

    fn status(&self) -> u16 {
        match &self.handle {
            Some(handle) => handle.get_ref().status,
            None => self.status,
        }
    }

    fn status_text(&self) -> &str {
        match &self.handle {
            Some(handle) => &handle.get_ref().status_text,
            None => &self.status_text,
        }
    }

    fn response_url(&self) -> &str {
        if self.response_url.is_empty() {
            &self.url
        } else {
            &self.response_url
        }
    }

    fn response_headers(&self) -> &[(String, String)] {
        match &self.handle {
            Some(handle) => &handle.get_ref().headers,
            None => &self.response_headers,
        }
    }

    fn body(&self) -> &[u8] {
        match &self.handle {
            Some(handle) => &handle.get_ref().body,
            None => &self.body,
        }
    }

    fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }
}
