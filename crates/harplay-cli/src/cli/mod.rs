//! CLI for harplay: fetch media resources the way a streaming player does.

mod commands;
mod player;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use harplay_core::config;
use std::path::PathBuf;

use commands::{run_completions, run_config, run_fetch, run_har};

/// Top-level CLI for harplay.
#[derive(Debug, Parser)]
#[command(name = "harplay")]
#[command(about = "harplay: retrying, time-boxed resource loader for streaming media", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch a URL (manifest, playlist or segment).
    Fetch {
        /// HTTP/HTTPS URL to fetch.
        url: String,

        /// Extra request header, `Name: value`. May be repeated.
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Fetch the request captured in a HAR file or pasted HAR token.
    Har {
        /// Path to the HAR file or token, or `-` to read it from stdin.
        path: String,

        /// Forward the captured cookies as a `Cookie` header.
        #[arg(long)]
        allow_cookies: bool,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// Print the config file path and the effective settings.
    Config,

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Loader flags shared by `fetch` and `har`. Unset values come from config.toml.
#[derive(Debug, Clone, Default, Args)]
pub struct LoadArgs {
    /// Decode the response as UTF-8 text.
    #[arg(long)]
    pub text: bool,

    /// Byte range START-END to request (END exclusive).
    #[arg(long, value_name = "START-END", value_parser = parse_range)]
    pub range: Option<(u64, u64)>,

    /// Write the body here instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Retries after the first failed attempt.
    #[arg(long, value_name = "N")]
    pub max_retry: Option<u32>,

    /// Silence allowed between readiness changes before a timeout is reported.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Delay before the first retry.
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,

    /// Ceiling for the retry delay.
    #[arg(long, value_name = "MS")]
    pub max_retry_delay_ms: Option<u64>,

    /// Give up when a timeout is reported instead of waiting for the transfer.
    #[arg(long)]
    pub abort_on_timeout: bool,
}

/// Parses `START-END` into `(start, end)` with `start < end`.
fn parse_range(s: &str) -> std::result::Result<(u64, u64), String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected START-END, got {s:?}"))?;
    let start: u64 = start
        .trim()
        .parse()
        .map_err(|e| format!("invalid range start {start:?}: {e}"))?;
    let end: u64 = end
        .trim()
        .parse()
        .map_err(|e| format!("invalid range end {end:?}: {e}"))?;
    if end <= start {
        return Err(format!("range end {end} must be greater than start {start}"));
    }
    Ok((start, end))
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = cli.command {
            return run_completions(shell);
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch { url, headers, load } => run_fetch(&cfg, &url, &headers, &load)?,
            CliCommand::Har {
                path,
                allow_cookies,
                load,
            } => run_har(&cfg, &path, allow_cookies, &load)?,
            CliCommand::Config => run_config(&cfg)?,
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}
