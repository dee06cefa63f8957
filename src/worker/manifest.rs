//! The application shell a generation installs

use crate::cache::{validate_bucket_name, MatchOptions};
use crate::config::Config;
use crate::error::{ShellcacheError, ShellcacheResult};
use url::Url;

/// Bucket name, resolved asset URLs and key-matching policy of one generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellManifest {
    pub bucket_name: String,
    pub assets: Vec<Url>,
    pub matching: MatchOptions,
}

impl ShellManifest {
    /// Build a manifest, resolving each asset against `origin`
    pub fn new(
        bucket_name: impl Into<String>,
        origin: &Url,
        assets: &[String],
        matching: MatchOptions,
    ) -> ShellcacheResult<Self> {
        let bucket_name = bucket_name.into();
        validate_bucket_name(&bucket_name)?;

        let assets = assets
            .iter()
            .map(|asset| {
                origin.join(asset).map_err(|e| ShellcacheError::InvalidUrl {
                    url: asset.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<ShellcacheResult<Vec<_>>>()?;

        Ok(Self {
            bucket_name,
            assets,
            matching,
        })
    }

    /// Build the manifest described by configuration
    pub fn from_config(config: &Config) -> ShellcacheResult<Self> {
        let origin = Self::origin(config)?;
        Self::new(
            config.worker.bucket_name.clone(),
            &origin,
            &config.worker.assets,
            config.matching,
        )
    }

    /// Parse the configured origin
    pub fn origin(config: &Config) -> ShellcacheResult<Url> {
        Url::parse(&config.worker.origin).map_err(|e| ShellcacheError::InvalidUrl {
            url: config.worker.origin.clone(),
            reason: e.to_string(),
        })
    }
}
