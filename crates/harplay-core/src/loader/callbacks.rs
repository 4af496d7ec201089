use super::types::{LoadContext, LoadError, LoadStats, LoaderResponse, NetworkDetails};

/// Callback contract between the loader and its Player.
///
/// `on_success`, `on_error` and `on_timeout` fire at most once per `load`;
/// `on_progress` may fire many times. All run on the thread that pumps
/// [`ResourceLoader::poll`](super::ResourceLoader::poll). To stop the load
/// from inside a callback, trigger an [`AbortHandle`](super::AbortHandle).
pub trait LoaderCallbacks {
    fn on_success(
        &mut self,
        response: LoaderResponse,
        stats: &LoadStats,
        context: &LoadContext,
        details: NetworkDetails<'_>,
    );

    /// `data` is the chunk just received, present only when the context asked
    /// for progress data.
    fn on_progress(
        &mut self,
        _stats: &LoadStats,
        _context: &LoadContext,
        _data: Option<&[u8]>,
        _details: NetworkDetails<'_>,
    ) {
    }

    fn on_error(&mut self, error: &LoadError, context: &LoadContext, details: NetworkDetails<'_>);

    /// No readiness change within the configured timeout. The request is
    /// still alive; the Player decides whether to abort.
    fn on_timeout(&mut self, stats: &LoadStats, context: &LoadContext);
}
