//! Configuration schema for shellcache
//!
//! Configuration is stored at `~/.config/shellcache/config.toml`

use crate::cache::MatchOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Application shell generation
    pub worker: WorkerConfig,

    /// Cache key matching
    pub matching: MatchOptions,

    /// Network fetch settings
    pub network: NetworkConfig,

    /// Bucket storage settings
    pub storage: StorageConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable audit logging of lifecycle events
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { audit_log: true }
    }
}

/// The generation being deployed: bucket name plus asset list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Version-tagged bucket name; change it whenever the shell changes
    pub bucket_name: String,

    /// Origin that relative asset paths and fetch targets resolve against
    pub origin: String,

    /// Application shell, fetched and cached at install time
    pub assets: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bucket_name: "speechsync-cache-v1".to_string(),
            origin: "http://localhost:7860".to_string(),
            assets: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
                "/sw.js".to_string(),
                "/icons/icon-192x192.png".to_string(),
                "/icons/icon-512x512.png".to_string(),
            ],
        }
    }
}

/// Network fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// User-Agent sent when the request carries none
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("shellcache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Bucket storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding bucket directories (default: `<state_dir>/buckets`)
    pub dir: Option<PathBuf>,
}
