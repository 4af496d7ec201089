//! CLI command handlers. Each command is in its own file.

mod completions;
mod config;
mod fetch;
mod har;
mod load;

pub use completions::run_completions;
pub use config::run_config;
pub use fetch::run_fetch;
pub use har::run_har;
