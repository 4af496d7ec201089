//! Classify the final HTTP status of an attempt.

/// What a completed attempt's status means for the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx: the body is delivered.
    Success,
    /// 400..=498: the request itself is wrong, a retry cannot fix it.
    ClientError,
    /// Anything else: 5xx, unfollowed 3xx, 1xx, 499, and 0 for transport failures.
    Retryable,
}

/// Classify an HTTP status code for the retry decision.
pub fn classify_http_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        400..=498 => StatusClass::ClientError,
        _ => StatusClass::Retryable,
    }
}
