use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::headers::{HeaderAllowList, DEFAULT_ALLOWED_HEADERS};
use crate::loader::LoadConfig;

/// Retry and timeout parameters of the resource loader (`[loader]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Retries after the first failed attempt.
    pub max_retry: u32,
    /// Silence allowed between readiness changes before a timeout is reported.
    pub timeout_ms: u64,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay_ms: u64,
    /// Ceiling for the retry delay.
    pub max_retry_delay_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_retry: 6,
            timeout_ms: 20_000,
            retry_delay_ms: 1_000,
            max_retry_delay_ms: 64_000,
        }
    }
}

impl LoaderSettings {
    /// A zero timeout would fire on every poll; it is clamped to 1ms.
    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            max_retry: self.max_retry,
            timeout: Duration::from_millis(self.timeout_ms.max(1)),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
        }
    }
}

/// Which captured headers are forwarded (`[headers]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderSettings {
    /// Header names forwarded from a HAR capture (case-insensitive).
    pub allow: Vec<String>,
    /// Forward the captured cookies as a `Cookie` header.
    pub include_cookies: bool,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            allow: DEFAULT_ALLOWED_HEADERS.iter().map(|s| s.to_string()).collect(),
            include_cookies: false,
        }
    }
}

impl HeaderSettings {
    pub fn allow_list(&self) -> HeaderAllowList {
        HeaderAllowList::new(&self.allow)
    }
}

/// Global configuration loaded from `~/.config/harplay/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HarplayConfig {
    #[serde(default)]
    pub loader: LoaderSettings,
    #[serde(default)]
    pub headers: HeaderSettings,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("harplay")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HarplayConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HarplayConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: HarplayConfig = toml::from_str(&data)?;
    Ok(cfg)
}
