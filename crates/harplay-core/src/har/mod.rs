//! HAR decoding: turn a pasted HAR token (or a HAR file) into the stream URL
//! plus the headers and cookies the browser sent with it.
//!
//! The token is what a user copies out of the browser's network panel and
//! pastes into the front-end: a base64-encoded JSON entry. Raw JSON (an entry
//! or a whole HAR log) is accepted too.

mod parse;

use anyhow::{Context, Result};
use base64::Engine;
use std::path::Path;

use parse::{HarDocument, HarEntry, HarNameValue};

/// Request captured in a HAR entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarRequestSpec {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
}

/// Decode a pasted token: base64 JSON, or raw JSON.
pub fn decode_token(token: &str) -> Result<HarRequestSpec> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("HAR token is empty");
    }
    let json = if token.starts_with('{') {
        token.as_bytes().to_vec()
    } else {
        let compact: String = token.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .context("HAR token is neither JSON nor base64")?
    };
    decode_json(&json)
}

/// Read a HAR file (or a saved token) from disk.
pub fn load_file(path: &Path) -> Result<HarRequestSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read HAR file: {}", path.display()))?;
    decode_token(&text).with_context(|| format!("decode HAR: {}", path.display()))
}

fn decode_json(json: &[u8]) -> Result<HarRequestSpec> {
    let doc: HarDocument = serde_json::from_slice(json).context("parse HAR JSON")?;
    let entry = match doc {
        HarDocument::Entry(entry) => entry,
        HarDocument::Log(log) => {
            let entries = log.log.entries;
            if entries.is_empty() {
                anyhow::bail!("HAR file has no entries");
            }
            let best = select_stream_entry(&entries);
            entries
                .into_iter()
                .nth(best)
                .context("HAR entry index out of range")?
        }
    };
    let request = entry.request;
    if request.url.trim().is_empty() {
        anyhow::bail!("HAR entry has no request URL");
    }
    Ok(HarRequestSpec {
        url: request.url.trim().to_string(),
        headers: pairs(request.headers),
        cookies: pairs(request.cookies),
    })
}

fn pairs(items: Vec<HarNameValue>) -> Vec<(String, String)> {
    items.into_iter().map(|h| (h.name, h.value)).collect()
}

/// True for URLs of adaptive-streaming manifests.
fn looks_like_manifest(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    path.ends_with(".m3u8") || path.ends_with(".mpd")
}

fn response_ok(entry: &HarEntry) -> bool {
    entry
        .response
        .as_ref()
        .map_or(true, |r| r.status == 0 || (200..300).contains(&r.status))
}

fn has_content_length(entry: &HarEntry) -> bool {
    entry.response.as_ref().is_some_and(|r| {
        r.headers
            .iter()
            .any(|h| h.name.eq_ignore_ascii_case("content-length"))
    })
}

/// Prefer successful responses, then manifest URLs, then responses with a
/// declared length, then later entries.
fn select_stream_entry(entries: &[HarEntry]) -> usize {
    entries
        .iter()
        .enumerate()
        .max_by_key(|(i, e)| {
            (
                response_ok(e),
                looks_like_manifest(&e.request.url),
                has_content_length(e),
                *i,
            )
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}
