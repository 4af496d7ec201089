//! Minimal HAR 1.2 structures: a full log, or a single pasted entry.

use serde::Deserialize;

/// Either a complete HAR file or one entry copied out of it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum HarDocument {
    Log(HarLog),
    Entry(HarEntry),
}

/// Root HAR log (top-level wrapper).
#[derive(Debug, Deserialize)]
pub struct HarLog {
    pub log: HarRoot,
}

#[derive(Debug, Deserialize)]
pub struct HarRoot {
    pub entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
pub struct HarEntry {
    pub request: HarRequest,
    #[serde(default)]
    pub response: Option<HarResponse>,
}

#[derive(Debug, Deserialize)]
pub struct HarRequest {
    pub url: String,
    #[serde(default)]
    pub headers: Vec<HarNameValue>,
    #[serde(default)]
    pub cookies: Vec<HarNameValue>,
}

#[derive(Debug, Deserialize)]
pub struct HarResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<HarNameValue>,
}

/// HAR header or cookie.
#[derive(Debug, Deserialize)]
pub struct HarNameValue {
    pub name: String,
    pub value: String,
}
