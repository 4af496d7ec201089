//! `harplay config` – show where the config lives and what is in effect.

use anyhow::Result;
use harplay_core::config::{self, HarplayConfig};

pub fn run_config(cfg: &HarplayConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
