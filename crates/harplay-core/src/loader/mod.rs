//! Retrying, time-boxed, range-aware resource loader.
//!
//! A streaming Player creates one [`ResourceLoader`] and calls
//! [`load`](ResourceLoader::load) once per resource (manifest, playlist,
//! segment). Each run is a small state machine over a single request:
//!
//! ```text
//! Unsent -> Opened -> HeadersReceived -> Loading* -> Done
//!     \________________________\___________\_________-> Aborted
//! ```
//!
//! - The timeout timer is re-armed on every readiness change short of `Done`,
//!   so only a stalled connection reports `on_timeout`. Firing does not stop
//!   the request.
//! - At `Done`: 2xx succeeds, 400..=498 or an exhausted budget fails, anything
//!   else tears the request down and retries after an exponentially growing
//!   delay.
//! - Exactly one request is in flight and at most one timer (timeout or
//!   retry) is armed at any time.
//!
//! Nothing runs on its own: the Player pumps [`poll`](ResourceLoader::poll)
//! from its event loop and outcomes arrive through [`LoaderCallbacks`].

mod callbacks;
mod timer;
mod types;

pub use callbacks::LoaderCallbacks;
pub use timer::{Clock, ManualClock, MonotonicClock, TimerKind, TimerSlot};
pub use types::{
    LoadConfig, LoadContext, LoadError, LoadStats, LoaderResponse, NetworkDetails, ResponseData,
    ResponseType,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::retry::{classify_http_status, Backoff, RetryDecision, RetryPolicy, StatusClass};
use crate::transport::{ReadyState, Request, Transport, TransportError, TransportEvent};

/// Hook run on every fresh request before it is sent (headers, credentials).
pub type SetupFn = dyn FnMut(&mut dyn Request, &str) -> Result<(), TransportError>;
pub type SetupRequest = Box<SetupFn>;

/// Construction-time options of a loader.
#[derive(Default)]
pub struct LoaderOptions {
    pub setup_request: Option<SetupRequest>,
}

impl LoaderOptions {
    pub fn with_setup_request<F>(setup: F) -> Self
    where
        F: FnMut(&mut dyn Request, &str) -> Result<(), TransportError> + 'static,
    {
        Self {
            setup_request: Some(Box::new(setup)),
        }
    }
}

/// Token that requests `abort()` on its loader. Callbacks hold one to stop
/// the load they are reporting on; the loader honors it before dispatching
/// the next event.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }
}

/// State of the current `load` call.
struct ActiveLoad {
    context: LoadContext,
    config: LoadConfig,
    callbacks: Box<dyn LoaderCallbacks>,
    policy: RetryPolicy,
}

pub struct ResourceLoader<T: Transport, C: Clock = MonotonicClock> {
    transport: T,
    clock: C,
    setup_request: Option<SetupRequest>,
    request: Option<T::Request>,
    /// The request has been sent and has not reached `Done` or been aborted.
    in_flight: bool,
    /// Headers of the current attempt have been seen.
    headers_seen: bool,
    active: Option<ActiveLoad>,
    stats: LoadStats,
    timer: TimerSlot,
    abort_handle: AbortHandle,
}

impl<T: Transport> ResourceLoader<T> {
    pub fn new(transport: T, options: LoaderOptions) -> Self {
        Self::with_clock(transport, MonotonicClock::default(), options)
    }
}

impl<T: Transport, C: Clock> ResourceLoader<T, C> {
    pub fn with_clock(transport: T, clock: C, options: LoaderOptions) -> Self {
        Self {
            transport,
            clock,
            setup_request: options.setup_request,
            request: None,
            in_flight: false,
            headers_seen: false,
            active: None,
            stats: LoadStats::default(),
            timer: TimerSlot::default(),
            abort_handle: AbortHandle::default(),
        }
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// An attempt is in flight or a timer is armed.
    pub fn is_busy(&self) -> bool {
        self.in_flight || self.timer.is_armed()
    }

    pub fn is_idle(&self) -> bool {
        !self.is_busy()
    }

    pub fn pending_timer(&self) -> Option<TimerKind> {
        self.timer.kind()
    }

    /// Start fetching `context.url`. Returns immediately; outcomes arrive
    /// through `callbacks` while the caller pumps [`poll`](Self::poll).
    pub fn load(
        &mut self,
        context: LoadContext,
        config: LoadConfig,
        callbacks: impl LoaderCallbacks + 'static,
    ) {
        self.release();
        self.abort_handle.take();
        self.stats = LoadStats {
            request_start_time: self.clock.now(),
            ..LoadStats::default()
        };
        let policy = RetryPolicy::new(
            config.max_retry,
            Backoff::new(config.retry_delay, config.max_retry_delay),
        );
        tracing::debug!(url = %context.url, max_retry = config.max_retry, "load");
        self.active = Some(ActiveLoad {
            context,
            config,
            callbacks: Box::new(callbacks),
            policy,
        });
        self.start_attempt();
    }

    /// Cancel the attempt in flight and any armed timer. Safe to call at any
    /// time, any number of times; no callback fires as a result.
    pub fn abort(&mut self) {
        // The handle may already be `Done` while that event is still queued.
        if self.in_flight {
            if let Some(request) = self.request.as_mut() {
                tracing::debug!("abort");
                self.stats.aborted = true;
                request.abort();
            }
        }
        self.in_flight = false;
        self.timer.cancel();
    }

    /// Abort and release the request. The loader cannot be used afterwards.
    pub fn destroy(mut self) {
        self.release();
    }

    /// One turn of the event loop: fire a due timer, or wait up to `max_wait`
    /// (bounded by the armed timer) for transport events and dispatch them.
    /// Returns [`is_busy`](Self::is_busy).
    pub fn poll(&mut self, max_wait: Duration) -> bool {
        if self.abort_handle.take() {
            self.abort();
        }
        let now = self.clock.now();
        if let Some(kind) = self.timer.take_due(now) {
            self.fire_timer(kind);
            return self.is_busy();
        }
        let wait = self
            .timer
            .remaining(now)
            .map_or(max_wait, |left| left.min(max_wait));
        if self.in_flight {
            let events = match self.request.as_mut() {
                Some(request) => request.poll(wait),
                None => Vec::new(),
            };
            for event in events {
                if self.abort_handle.take() {
                    self.abort();
                }
                self.dispatch(event);
            }
        } else if self.timer.is_armed() {
            self.clock.sleep(wait);
        }
        self.is_busy()
    }

    /// Abort, then drop the request handle.
    fn release(&mut self) {
        self.abort();
        self.request = None;
    }

    fn start_attempt(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let mut request = self.transport.create_request();
        self.stats.first_byte_time = Duration::ZERO;
        self.stats.loaded = 0;
        self.stats.chunk_count = 0;
        self.headers_seen = false;
        tracing::debug!(url = %active.context.url, retry = self.stats.retry_count, "starting attempt");

        let mut result = open_request(
            &mut request,
            self.setup_request.as_deref_mut(),
            &active.context,
        );
        if result.is_ok() {
            self.timer
                .schedule(TimerKind::Timeout, self.clock.now(), active.config.timeout);
            result = request.send();
        }
        match result {
            Ok(()) => self.in_flight = true,
            Err(err) => {
                self.timer.cancel();
                tracing::error!(url = %active.context.url, error = %err, "could not open request");
                let error = LoadError::new(request.status(), err.to_string());
                active.callbacks.on_error(
                    &error,
                    &active.context,
                    NetworkDetails::from_request(&request),
                );
            }
        }
        self.request = Some(request);
    }

    fn fire_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Timeout => {
                let Some(active) = self.active.as_mut() else {
                    return;
                };
                tracing::warn!("timeout while loading {}", active.context.url);
                active.callbacks.on_timeout(&self.stats, &active.context);
            }
            TimerKind::Retry => self.start_attempt(),
        }
    }

    fn dispatch(&mut self, event: TransportEvent) {
        // Events racing an abort or a finished attempt are dropped.
        if self.stats.aborted || !self.in_flight {
            return;
        }
        match event {
            TransportEvent::ReadyStateChange(state) => self.on_ready_state_change(state),
            TransportEvent::Progress {
                loaded,
                total,
                chunk_len,
            } => self.on_progress(loaded, total, chunk_len),
        }
    }

    fn on_ready_state_change(&mut self, state: ReadyState) {
        if state < ReadyState::HeadersReceived {
            return;
        }
        let Some(timeout) = self.active.as_ref().map(|a| a.config.timeout) else {
            return;
        };
        self.timer.cancel();
        let now = self.clock.now();
        if !self.headers_seen {
            self.headers_seen = true;
            self.stats.first_byte_time = now.max(self.stats.request_start_time);
        }
        if state != ReadyState::Done {
            self.timer.schedule(TimerKind::Timeout, now, timeout);
            return;
        }
        self.in_flight = false;
        self.finish_attempt(now);
    }

    fn finish_attempt(&mut self, now: Duration) {
        let (Some(active), Some(request)) = (self.active.as_mut(), self.request.as_mut()) else {
            return;
        };
        let status = request.status();

        if classify_http_status(status) == StatusClass::Success {
            let stats = &mut self.stats;
            stats.load_end_time = stats.first_byte_time.max(now);
            let body = request.take_body();
            stats.loaded = body.len() as u64;
            stats.total = stats.loaded;
            stats.estimate_bandwidth();
            let data = match active.context.response_type {
                ResponseType::Binary => ResponseData::Binary(body),
                ResponseType::Text => ResponseData::Text(
                    String::from_utf8(body)
                        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
                ),
            };
            let response = LoaderResponse {
                url: request.response_url().to_string(),
                data,
            };
            tracing::debug!(
                url = %active.context.url,
                bytes = stats.loaded,
                retries = stats.retry_count,
                "load complete"
            );
            active.callbacks.on_success(
                response,
                stats,
                &active.context,
                NetworkDetails::from_request(&*request),
            );
            return;
        }

        match active.policy.decide(self.stats.retry_count, status) {
            RetryDecision::NoRetry => {
                tracing::error!("{} while loading {}", status, active.context.url);
                if active.context.response_type == ResponseType::Binary {
                    let body = request.take_body();
                    if !body.is_empty() {
                        tracing::error!("{}", String::from_utf8_lossy(&body));
                    }
                }
                let error = LoadError::new(status, request.status_text());
                active.callbacks.on_error(
                    &error,
                    &active.context,
                    NetworkDetails::from_request(&*request),
                );
            }
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    "{} while loading {}, retrying in {:?}...",
                    status,
                    active.context.url,
                    delay
                );
                self.release();
                self.timer.schedule(TimerKind::Retry, now, delay);
                self.stats.retry_count += 1;
            }
        }
    }

    fn on_progress(&mut self, loaded: u64, total: Option<u64>, chunk_len: usize) {
        let (Some(active), Some(request)) = (self.active.as_mut(), self.request.as_ref()) else {
            return;
        };
        self.stats.loaded = loaded;
        if let Some(total) = total {
            self.stats.total = total;
        }
        self.stats.chunk_count += 1;
        let data = active
            .context
            .report_progress_data
            .then(|| last_chunk(request.body(), loaded, chunk_len));
        active.callbacks.on_progress(
            &self.stats,
            &active.context,
            data,
            NetworkDetails::from_request(request),
        );
    }
}

/// The `len` bytes of `body` ending at offset `loaded`.
fn last_chunk(body: &[u8], loaded: u64, len: usize) -> &[u8] {
    let end = usize::try_from(loaded).map_or(body.len(), |end| end.min(body.len()));
    &body[end.saturating_sub(len)..end]
}

/// Open `request` for `context`, running the setup hook and adding the
/// `Range` header.
///
/// A hook that fails while the request is still unsent is retried once the
/// request is opened, since setting headers requires an opened request.
fn open_request<R: Request>(
    request: &mut R,
    setup: Option<&mut SetupFn>,
    context: &LoadContext,
) -> Result<(), TransportError> {
    let url = context.url.as_str();
    if let Some(setup) = setup {
        if let Err(err) = setup(&mut *request, url) {
            if request.ready_state() != ReadyState::Unsent {
                return Err(err);
            }
            tracing::debug!(error = %err, "setup hook needs an opened request");
            request.open("GET", url)?;
            setup(&mut *request, url)?;
        }
    }
    if request.ready_state() == ReadyState::Unsent {
        request.open("GET", url)?;
    }
    if let Some(range) = context.range_header() {
        request.set_request_header("Range", &range)?;
    }
    Ok(())
}
