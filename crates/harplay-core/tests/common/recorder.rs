//! Player stand-in that records every callback with the clock time it fired.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use harplay_core::loader::{
    AbortHandle, Clock, LoadContext, LoadError, LoadStats, LoaderCallbacks, LoaderResponse,
    NetworkDetails,
};

#[derive(Debug, Clone)]
pub enum Event {
    Success {
        at: Duration,
        response: LoaderResponse,
        stats: LoadStats,
    },
    Progress {
        at: Duration,
        stats: LoadStats,
        data: Option<Vec<u8>>,
    },
    Error {
        at: Duration,
        error: LoadError,
    },
    Timeout {
        at: Duration,
        stats: LoadStats,
    },
}

pub type Events = Rc<RefCell<Vec<Event>>>;

pub struct Recorder<C: Clock> {
    clock: C,
    events: Events,
    /// Abort from inside `on_progress` once this many chunks were seen.
    abort_after_chunks: Option<(u32, AbortHandle)>,
    abort_on_timeout: Option<AbortHandle>,
}

impl<C: Clock> Recorder<C> {
    pub fn new(clock: C) -> (Self, Events) {
        let events = Events::default();
        (
            Self {
                clock,
                events: Rc::clone(&events),
                abort_after_chunks: None,
                abort_on_timeout: None,
            },
            events,
        )
    }

    pub fn abort_after_chunks(mut self, chunks: u32, handle: AbortHandle) -> Self {
        self.abort_after_chunks = Some((chunks, handle));
        self
    }

    pub fn abort_on_timeout(mut self, handle: AbortHandle) -> Self {
        self.abort_on_timeout = Some(handle);
        self
    }
}

impl<C: Clock> LoaderCallbacks for Recorder<C> {
    fn on_success(
        &mut self,
        response: LoaderResponse,
        stats: &LoadStats,
        _context: &LoadContext,
        _details: NetworkDetails<'_>,
    ) {
        self.events.borrow_mut().push(Event::Success {
            at: self.clock.now(),
            response,
            stats: stats.clone(),
        });
    }

    fn on_progress(
        &mut self,
        stats: &LoadStats,
        _context: &LoadContext,
        data: Option<&[u8]>,
        _details: NetworkDetails<'_>,
    ) {
        self.events.borrow_mut().push(Event::Progress {
            at: self.clock.now(),
            stats: stats.clone(),
            data: data.map(<[u8]>::to_vec),
        });
        if let Some((chunks, handle)) = &self.abort_after_chunks {
            if stats.chunk_count >= *chunks {
                handle.abort();
            }
        }
    }

    fn on_error(&mut self, error: &LoadError, _context: &LoadContext, _details: NetworkDetails<'_>) {
        self.events.borrow_mut().push(Event::Error {
            at: self.clock.now(),
            error: error.clone(),
        });
    }

    fn on_timeout(&mut self, stats: &LoadStats, _context: &LoadContext) {
        self.events.borrow_mut().push(Event::Timeout {
            at: self.clock.now(),
            stats: stats.clone(),
        });
        if let Some(handle) = &self.abort_on_timeout {
            handle.abort();
        }
    }
}

pub fn terminal_count(events: &Events) -> usize {
    events
        .borrow()
        .iter()
        .filter(|e| matches!(e, Event::Success { .. } | Event::Error { .. }))
        .count()
}

pub fn successes(events: &Events) -> Vec<(LoaderResponse, LoadStats)> {
    events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Success {
                response, stats, ..
            } => Some((response.clone(), stats.clone())),
            _ => None,
        })
        .collect()
}

pub fn errors(events: &Events) -> Vec<LoadError> {
    events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Error { error, .. } => Some(error.clone()),
            _ => None,
        })
        .collect()
}

pub fn timeouts(events: &Events) -> Vec<Duration> {
    events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Timeout { at, .. } => Some(*at),
            _ => None,
        })
        .collect()
}

pub fn progress(events: &Events) -> Vec<(LoadStats, Option<Vec<u8>>)> {
    events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Progress { stats, data, .. } => Some((stats.clone(), data.clone())),
            _ => None,
        })
        .collect()
}
