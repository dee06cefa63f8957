//! Configuration management for shellcache

pub mod schema;

pub use schema::Config;

use crate::cache::validate_bucket_name;
use crate::error::{ShellcacheError, ShellcacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use url::Url;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
    state_dir: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default paths
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            state_dir: Self::default_state_dir(),
        }
    }

    /// Create a config manager with a custom config path
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            state_dir: Self::default_state_dir(),
        }
    }

    /// Override the state directory
    pub fn with_state_dir(mut self, dir: PathBuf) -> Self {
        self.state_dir = dir;
        self
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellcache")
            .join("config.toml")
    }

    /// Get the default state directory path
    pub fn default_state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shellcache")
    }

    /// State directory (registration, audit log, default bucket storage)
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Directory holding bucket directories
    pub fn storage_dir(&self, config: &Config) -> PathBuf {
        config
            .storage
            .dir
            .clone()
            .unwrap_or_else(|| self.state_dir.join("buckets"))
    }

    /// Get the audit log path
    pub fn audit_log_path(&self) -> PathBuf {
        self.state_dir.join("audit.log")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> ShellcacheResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load and validate configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ShellcacheResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            ShellcacheError::io(format!("reading config from {}", path.display()), e)
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ShellcacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::validate(&config).map_err(|e| ShellcacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Check values that would only fail later, at install time
    pub fn validate(config: &Config) -> ShellcacheResult<()> {
        validate_bucket_name(&config.worker.bucket_name)?;

        let origin = Url::parse(&config.worker.origin).map_err(|e| ShellcacheError::InvalidUrl {
            url: config.worker.origin.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(ShellcacheError::InvalidUrl {
                url: config.worker.origin.clone(),
                reason: "origin must use http or https".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> ShellcacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            ShellcacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> ShellcacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShellcacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state directory exists
    pub async fn ensure_state_dir(&self) -> ShellcacheResult<()> {
        fs::create_dir_all(&self.state_dir).await.map_err(|e| {
            ShellcacheError::io(format!("creating directory {}", self.state_dir.display()), e)
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
