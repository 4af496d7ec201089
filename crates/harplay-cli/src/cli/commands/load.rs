//! Shared body of `fetch` and `har`: run one load and write the result.

use anyhow::{Context, Result};
use harplay_core::config::{HarplayConfig, LoaderSettings};
use harplay_core::headers::RequestHeaders;
use harplay_core::loader::{
    LoadConfig, LoadContext, LoadStats, LoaderOptions, ResourceLoader, ResponseType,
};
use harplay_core::transport::CurlTransport;
use std::io::Write;
use std::path::Path;

use crate::cli::player::{self, Outcome};
use crate::cli::LoadArgs;

impl LoadArgs {
    /// Config-file settings with command-line overrides applied.
    pub fn load_config(&self, settings: &LoaderSettings) -> LoadConfig {
        LoaderSettings {
            max_retry: self.max_retry.unwrap_or(settings.max_retry),
            timeout_ms: self.timeout_ms.unwrap_or(settings.timeout_ms),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(settings.retry_delay_ms),
            max_retry_delay_ms: self.max_retry_delay_ms.unwrap_or(settings.max_retry_delay_ms),
        }
        .load_config()
    }

    pub fn context(&self, url: &str) -> LoadContext {
        let response_type = if self.text {
            ResponseType::Text
        } else {
            ResponseType::Binary
        };
        let context = LoadContext::new(url, response_type);
        match self.range {
            Some((start, end)) => context.with_range(start, end),
            None => context,
        }
    }
}

pub fn run_load(cfg: &HarplayConfig, url: &str, headers: RequestHeaders, args: &LoadArgs) -> Result<()> {
    let options = if headers.is_empty() {
        LoaderOptions::default()
    } else {
        LoaderOptions {
            setup_request: Some(headers.into_setup_hook()),
        }
    };
    let mut loader = ResourceLoader::new(CurlTransport::default(), options);
    let config = args.load_config(&cfg.loader);
    let outcome = player::play(&mut loader, args.context(url), config, args.abort_on_timeout);
    loader.destroy();

    match outcome? {
        Outcome::Success { response, stats } => {
            print_stats(&stats);
            write_body(args.out.as_deref(), response.data.as_bytes())
        }
        Outcome::Failed(error) => Err(anyhow::Error::new(error).context(format!("load failed: {url}"))),
        Outcome::TimedOut(stats) => anyhow::bail!(
            "timed out loading {url} after {} bytes ({} retries)",
            stats.loaded,
            stats.retry_count
        ),
    }
}

fn print_stats(stats: &LoadStats) {
    let elapsed = stats.load_duration().unwrap_or_default();
    eprintln!(
        "Loaded {} bytes in {:.3}s (first byte after {:.3}s, {} retries, {:.2} Mbit/s)",
        stats.loaded,
        elapsed.as_secs_f64(),
        stats
            .first_byte_time
            .saturating_sub(stats.request_start_time)
            .as_secs_f64(),
        stats.retry_count,
        stats.bw_estimate / 1_000_000.0
    );
}

fn write_body(out: Option<&Path>, body: &[u8]) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
            eprintln!("Saved to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(body).context("write body to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
