use thiserror::Error;

/// Errors raised while preparing or sending a request.
///
/// Failures of an attempt that was sent (connection refused, reset, bad
/// status) are not errors here: they complete the request with a status.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The URL could not be opened (unparsable or disallowed scheme).
    #[error("cannot open request: {0}")]
    Open(String),
    /// Operation not valid in the request's current readiness state.
    #[error("invalid request state: {0}")]
    InvalidState(&'static str),
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("curl multi: {0}")]
    Multi(#[from] curl::MultiError),
}
