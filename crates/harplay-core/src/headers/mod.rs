//! Header allow-listing for requests forwarded from a HAR capture.
//!
//! Browsers record many headers a replayed request must not carry (HTTP/2
//! pseudo-headers, encodings the client cannot decode, hop-by-hop fields).
//! Only names on an explicit [`HeaderAllowList`] are forwarded.

use std::collections::BTreeSet;

use crate::har::HarRequestSpec;
use crate::loader::SetupRequest;
use crate::transport::{Request, TransportError};

/// Header names forwarded by default.
pub const DEFAULT_ALLOWED_HEADERS: &[&str] = &[
    "host",
    "referer",
    "origin",
    "accept",
    "sec-fetch-dest",
    "sec-fetch-mode",
    "sec-fetch-site",
];

/// Case-insensitive set of header names that may be forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderAllowList {
    names: BTreeSet<String>,
}

impl Default for HeaderAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_HEADERS.iter().copied())
    }
}

impl HeaderAllowList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_ascii_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    /// Pseudo-headers (`:authority`, `:path`, ...) are never allowed.
    pub fn allows(&self, name: &str) -> bool {
        !name.starts_with(':') && self.names.contains(&name.trim().to_ascii_lowercase())
    }

    pub fn filter(&self, headers: &[(String, String)]) -> Vec<(String, String)> {
        headers
            .iter()
            .filter(|(name, _)| self.allows(name))
            .cloned()
            .collect()
    }
}

/// Headers to set on every request the loader sends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: Vec<(String, String)>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allowed headers of a captured request, plus a `Cookie` header built
    /// from its cookies when `include_cookies` is set.
    pub fn from_har(spec: &HarRequestSpec, allow: &HeaderAllowList, include_cookies: bool) -> Self {
        let mut headers = Self {
            entries: allow.filter(&spec.headers),
        };
        if include_cookies && !spec.cookies.is_empty() && headers.get("cookie").is_none() {
            let cookie = spec
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.push("Cookie", cookie);
        }
        headers
    }

    /// Parse a `Name: value` line as given on the command line.
    pub fn push_line(&mut self, line: &str) -> anyhow::Result<()> {
        let (name, value) = line
            .split_once(':')
            .filter(|(name, _)| !name.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("header must look like `Name: value`, got {line:?}"))?;
        self.push(name.trim(), value.trim());
        Ok(())
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Request setup hook setting these headers. Fails on an unopened
    /// request, which makes the loader open it and run the hook again.
    pub fn into_setup_hook(self) -> SetupRequest {
        Box::new(
            move |request: &mut dyn Request, _url: &str| -> Result<(), TransportError> {
                for (name, value) in &self.entries {
                    request.set_request_header(name, value)?;
                }
                Ok(())
            },
        )
    }
}
