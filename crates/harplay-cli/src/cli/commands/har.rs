//! `harplay har <path|->` – replay the request captured in a HAR file or token.

use anyhow::{Context, Result};
use harplay_core::config::HarplayConfig;
use harplay_core::har;
use harplay_core::headers::RequestHeaders;
use std::io::Read;
use std::path::Path;

use super::load::run_load;
use crate::cli::LoadArgs;

pub fn run_har(cfg: &HarplayConfig, path: &str, allow_cookies: bool, args: &LoadArgs) -> Result<()> {
    let spec = if path == "-" {
        let mut token = String::new();
        std::io::stdin()
            .read_to_string(&mut token)
            .context("read HAR token from stdin")?;
        har::decode_token(&token)?
    } else {
        har::load_file(Path::new(path))?
    };

    let include_cookies = allow_cookies || cfg.headers.include_cookies;
    let headers = RequestHeaders::from_har(&spec, &cfg.headers.allow_list(), include_cookies);
    tracing::info!(
        url = %spec.url,
        headers = headers.len(),
        cookies = include_cookies && !spec.cookies.is_empty(),
        "replaying HAR request"
    );
    eprintln!("URL: {}", spec.url);
    for (name, value) in headers.iter() {
        if name.eq_ignore_ascii_case("cookie") {
            eprintln!("  {name}: (cookies included)");
        } else {
            eprintln!("  {name}: {value}");
        }
    }
    run_load(cfg, &spec.url, headers, args)
}
