use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::cache::DiskBundleCache;

/// Global configuration loaded from `~/.config/netqueue/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetqueueConfig {
    /// Maximum number of requests running at once. Negative values are treated as 0.
    pub max_concurrent: i64,
    /// Seconds allowed for the TCP/TLS connect phase.
    pub connect_timeout_secs: u64,
    /// Abort a transfer whose throughput stays below this many bytes/sec...
    pub low_speed_limit_bytes: u32,
    /// ...for this many seconds.
    pub low_speed_time_secs: u64,
    /// Hard limit for a whole transfer, in seconds.
    pub timeout_secs: u64,
    /// Optional User-Agent header for every transfer.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Bundle cache directory; defaults to `~/.cache/netqueue/bundles`.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for NetqueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            timeout_secs: 3600,
            user_agent: None,
            cache_dir: None,
        }
    }
}

impl NetqueueConfig {
    /// Bundle cache directory: `cache_dir` if set, else the XDG cache home.
    /// Falls back to a directory under the system temp dir when neither is
    /// available.
    pub fn bundle_dir(&self) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => DiskBundleCache::default_dir().unwrap_or_else(|e| {
                tracing::warn!("no XDG cache dir ({}), using temp dir", e);
                std::env::temp_dir().join("netqueue").join("bundles")
            }),
        }
    }

    /// Render as the TOML written to the config file.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("netqueue")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<NetqueueConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = NetqueueConfig::default();
        let toml = default_cfg.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: NetqueueConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
