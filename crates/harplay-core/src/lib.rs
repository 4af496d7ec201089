pub mod config;
pub mod logging;

// Resource loading core
pub mod loader;
pub mod retry;
pub mod transport;

// Front-end glue: pasted HAR tokens and forwarded headers
pub mod har;
pub mod headers;
