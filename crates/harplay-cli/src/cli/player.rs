//! The CLI's Player: owns a loader, pumps its event loop and collects the
//! terminal outcome through the loader callbacks.

use anyhow::Result;
use harplay_core::loader::{
    AbortHandle, LoadConfig, LoadContext, LoadError, LoadStats, LoaderCallbacks, LoaderResponse,
    NetworkDetails, ResourceLoader,
};
use harplay_core::transport::Transport;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum Outcome {
    Success {
        response: LoaderResponse,
        stats: LoadStats,
    },
    Failed(LoadError),
    /// Timeout reported and the load given up on.
    TimedOut(LoadStats),
}

struct PlayerCallbacks {
    outcome: Rc<RefCell<Option<Outcome>>>,
    abort: AbortHandle,
    abort_on_timeout: bool,
}

impl LoaderCallbacks for PlayerCallbacks {
    fn on_success(
        &mut self,
        response: LoaderResponse,
        stats: &LoadStats,
        _context: &LoadContext,
        details: NetworkDetails<'_>,
    ) {
        if stats.chunk_count > 0 {
            eprintln!();
        }
        tracing::info!(
            url = %response.url,
            status = details.status,
            bytes = stats.loaded,
            content_type = details.header("content-type").unwrap_or("-"),
            "loaded"
        );
        *self.outcome.borrow_mut() = Some(Outcome::Success {
            response,
            stats: stats.clone(),
        });
    }

    fn on_progress(
        &mut self,
        stats: &LoadStats,
        _context: &LoadContext,
        _data: Option<&[u8]>,
        _details: NetworkDetails<'_>,
    ) {
        if stats.total > 0 {
            eprint!("\r  {}/{} bytes", stats.loaded, stats.total);
        } else {
            eprint!("\r  {} bytes", stats.loaded);
        }
    }

    fn on_error(&mut self, error: &LoadError, context: &LoadContext, _details: NetworkDetails<'_>) {
        tracing::error!(url = %context.url, code = error.code, "load failed: {}", error.text);
        *self.outcome.borrow_mut() = Some(Outcome::Failed(error.clone()));
    }

    fn on_timeout(&mut self, stats: &LoadStats, context: &LoadContext) {
        if !self.abort_on_timeout {
            eprintln!("\nTimeout loading {}; still waiting...", context.url);
            return;
        }
        self.abort.abort();
        *self.outcome.borrow_mut() = Some(Outcome::TimedOut(stats.clone()));
    }
}

/// Run one load to its end and return how it ended.
pub fn play<T: Transport>(
    loader: &mut ResourceLoader<T>,
    context: LoadContext,
    config: LoadConfig,
    abort_on_timeout: bool,
) -> Result<Outcome> {
    let outcome = Rc::new(RefCell::new(None));
    let callbacks = PlayerCallbacks {
        outcome: Rc::clone(&outcome),
        abort: loader.abort_handle(),
        abort_on_timeout,
    };
    loader.load(context, config, callbacks);
    while loader.poll(POLL_INTERVAL) {}

    let outcome = outcome.borrow_mut().take();
    outcome.ok_or_else(|| anyhow::anyhow!("load ended without an outcome"))
}
