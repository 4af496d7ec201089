//! `harplay fetch <url>` – fetch one resource.

use anyhow::Result;
use harplay_core::config::HarplayConfig;
use harplay_core::headers::RequestHeaders;

use super::load::run_load;
use crate::cli::LoadArgs;

pub fn run_fetch(cfg: &HarplayConfig, url: &str, header_lines: &[String], args: &LoadArgs) -> Result<()> {
    let mut headers = RequestHeaders::new();
    for line in header_lines {
        headers.push_line(line)?;
    }
    run_load(cfg, url, headers, args)
}
