//! Retry and backoff policy.
//!
//! Decides, from the final HTTP status of an attempt, whether the loader
//! delivers the body, reports a terminal error, or schedules another attempt
//! after an exponentially growing delay.

mod classify;
mod policy;

pub use classify::{classify_http_status, StatusClass};
pub use policy::{Backoff, RetryDecision, RetryPolicy};
