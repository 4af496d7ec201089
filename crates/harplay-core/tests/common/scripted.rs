//! In-process transport that replays scripted responses on a `ManualClock`.
//!
//! Each attempt gets the next `Attempt` script (the last one repeats). Steps
//! are timed relative to `send()`; `poll` advances the clock to the next step
//! or by the full timeout when nothing is scheduled.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use harplay_core::loader::{Clock, ManualClock};
use harplay_core::transport::{ReadyState, Request, Transport, TransportError, TransportEvent};

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[derive(Debug, Clone)]
pub enum Step {
    Headers,
    Chunk(Vec<u8>),
    Complete(u16, &'static str),
}

#[derive(Debug, Clone, Default)]
pub struct Attempt {
    pub open_error: Option<String>,
    /// Declared `Content-Length` reported with progress.
    pub total: Option<u64>,
    pub steps: Vec<(Duration, Step)>,
}

impl Attempt {
    /// Headers at 10ms, body at 20ms, done at 30ms.
    pub fn respond(status: u16, text: &'static str, body: &[u8]) -> Self {
        Self {
            total: Some(body.len() as u64),
            steps: vec![
                (ms(10), Step::Headers),
                (ms(20), Step::Chunk(body.to_vec())),
                (ms(30), Step::Complete(status, text)),
            ],
            ..Self::default()
        }
    }

    /// Headers at 10ms, done at 20ms, no body.
    pub fn fail(status: u16, text: &'static str) -> Self {
        Self {
            steps: vec![(ms(10), Step::Headers), (ms(20), Step::Complete(status, text))],
            ..Self::default()
        }
    }

    /// Never answers.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn open_error(message: &str) -> Self {
        Self {
            open_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn steps(steps: Vec<(Duration, Step)>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }
}

/// What the loader actually sent.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub sent_at: Duration,
}

impl SentRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub type SentLog = Rc<RefCell<Vec<SentRequest>>>;

pub struct ScriptedTransport {
    clock: ManualClock,
    attempts: VecDeque<Attempt>,
    sent: SentLog,
    created: Rc<RefCell<usize>>,
}

impl ScriptedTransport {
    pub fn new(clock: &ManualClock, attempts: Vec<Attempt>) -> Self {
        assert!(!attempts.is_empty(), "at least one attempt script");
        Self {
            clock: clock.clone(),
            attempts: attempts.into(),
            sent: SentLog::default(),
            created: Rc::default(),
        }
    }

    pub fn sent_log(&self) -> SentLog {
        Rc::clone(&self.sent)
    }

    pub fn created_count(&self) -> Rc<RefCell<usize>> {
        Rc::clone(&self.created)
    }
}

impl Transport for ScriptedTransport {
    type Request = ScriptedRequest;

    fn create_request(&mut self) -> ScriptedRequest {
        let attempt = if self.attempts.len() > 1 {
            self.attempts.pop_front().unwrap()
        } else {
            self.attempts[0].clone()
        };
        *self.created.borrow_mut() += 1;
        ScriptedRequest {
            clock: self.clock.clone(),
            attempt,
            sent: Rc::clone(&self.sent),
            state: ReadyState::Unsent,
            method: String::new(),
            url: String::new(),
            headers: Vec::new(),
            sent_at: None,
            next_step: 0,
            status: 0,
            status_text: String::new(),
            body: Vec::new(),
        }
    }
}

pub struct ScriptedRequest {
    clock: ManualClock,
    attempt: Attempt,
    sent: SentLog,
    state: ReadyState,
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    sent_at: Option<Duration>,
    next_step: usize,
    status: u16,
    status_text: String,
    body: Vec<u8>,
}

impl ScriptedRequest {
    fn emit(&mut self, step: Step, events: &mut Vec<TransportEvent>) {
        match step {
            Step::Headers => {
                self.state = ReadyState::HeadersReceived;
                events.push(TransportEvent::ReadyStateChange(ReadyState::HeadersReceived));
            }
            Step::Chunk(data) => {
                self.state = ReadyState::Loading;
                self.body.extend_from_slice(&data);
                events.push(TransportEvent::ReadyStateChange(ReadyState::Loading));
                events.push(TransportEvent::Progress {
                    loaded: self.body.len() as u64,
                    total: self.attempt.total,
                    chunk_len: data.len(),
                });
            }
            Step::Complete(status, text) => {
                self.state = ReadyState::Done;
                self.status = status;
                self.status_text = text.to_string();
                events.push(TransportEvent::ReadyStateChange(ReadyState::Done));
            }
        }
    }
}

impl Request for ScriptedRequest {
    fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn open(&mut self, method: &str, url: &str) -> Result<(), TransportError> {
        if let Some(message) = &self.attempt.open_error {
            return Err(TransportError::Open(message.clone()));
        }
        self.method = method.to_string();
        self.url = url.to_string();
        self.headers.clear();
        self.state = ReadyState::Opened;
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) -> Result<(), TransportError> {
        if self.state != ReadyState::Opened || self.sent_at.is_some() {
            return Err(TransportError::InvalidState("not opened"));
        }
        self.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn send(&mut self) -> Result<(), TransportError> {
        if self.state != ReadyState::Opened || self.sent_at.is_some() {
            return Err(TransportError::InvalidState("not opened"));
        }
        let now = self.clock.now();
        self.sent_at = Some(now);
        self.sent.borrow_mut().push(SentRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            sent_at: now,
        });
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Vec<TransportEvent> {
        let Some(sent_at) = self.sent_at else {
            return Vec::new();
        };
        if self.state == ReadyState::Unsent {
            return Vec::new();
        }
        let deadline = self.clock.now() + timeout;
        let next_at = self
            .attempt
            .steps
            .get(self.next_step)
            .map(|(at, _)| sent_at + *at);
        match next_at {
            Some(at) if at <= deadline => self.clock.advance_to(at),
            _ => {
                self.clock.advance_to(deadline);
                return Vec::new();
            }
        }
        let now = self.clock.now();
        let mut events = Vec::new();
        while let Some((at, step)) = self.attempt.steps.get(self.next_step).cloned() {
            if sent_at + at > now {
                break;
            }
            self.next_step += 1;
            self.emit(step, &mut events);
        }
        events
    }

    fn abort(&mut self) {
        self.state = ReadyState::Unsent;
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn status_text(&self) -> &str {
        &self.status_text
    }

    fn response_url(&self) -> &str {
        &self.url
    }

    fn response_headers(&self) -> &[(String, String)] {
        &[]
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn take_body(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.body)
    }
}
