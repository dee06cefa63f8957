//! Persisted generation records

use crate::cache::MatchOptions;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::worker::{ServiceWorker, ShellManifest, WorkerState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Host-side record of one worker generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Worker id
    pub id: Uuid,

    /// Bucket this generation owns
    pub bucket_name: String,

    /// Resolved asset URLs
    pub assets: Vec<String>,

    /// Key-matching policy at registration time
    #[serde(default)]
    pub matching: MatchOptions,

    /// Current lifecycle state
    pub state: WorkerState,

    /// When the generation was registered
    pub created_at: DateTime<Utc>,

    /// When the record last changed
    pub updated_at: DateTime<Utc>,
}

impl GenerationRecord {
    /// Snapshot a worker
    pub fn from_worker(worker: &ServiceWorker) -> Self {
        let now = Utc::now();
        let manifest = worker.manifest();
        Self {
            id: worker.id(),
            bucket_name: manifest.bucket_name.clone(),
            assets: manifest.assets.iter().map(|u| u.to_string()).collect(),
            matching: manifest.matching,
            state: worker.state(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update state from a worker, keeping the creation time
    pub fn sync(&mut self, worker: &ServiceWorker) {
        self.state = worker.state();
        self.updated_at = Utc::now();
    }

    /// Rebuild the manifest this generation was registered with
    pub fn manifest(&self) -> ShellcacheResult<ShellManifest> {
        let assets = self
            .assets
            .iter()
            .map(|asset| {
                Url::parse(asset).map_err(|e| ShellcacheError::InvalidUrl {
                    url: asset.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<ShellcacheResult<Vec<_>>>()?;

        Ok(ShellManifest {
            bucket_name: self.bucket_name.clone(),
            assets,
            matching: self.matching,
        })
    }

    /// Short id for display
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }
}
