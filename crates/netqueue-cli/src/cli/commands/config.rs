//! `netqueue config` – show where the config lives and what is in effect.

use anyhow::Result;
use netqueue_core::config::{self, NetqueueConfig};

pub fn run_config(cfg: &NetqueueConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", cfg.to_toml()?);
    println!("# bundle cache: {}", cfg.bundle_dir().display());
    Ok(())
}
