//! The offline asset cache worker
//!
//! One `ServiceWorker` is one generation of the application shell. The host
//! drives it through three events, each guarded by the state machine in
//! [`WorkerState`]:
//!
//! - `install`: fetch every asset and commit them to the generation's bucket
//!   in one batch. Any failure discards the generation.
//! - `activate`: delete every bucket not named after this generation, wait
//!   for all deletions, then claim clients.
//! - `handle_fetch`: cache-first resolution, network fallback, no write-back.

use crate::cache::{CacheStorage, RequestKey};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::http::{Request, Response};
use crate::network::Network;
use crate::worker::clients::Clients;
use crate::worker::manifest::ShellManifest;
use crate::worker::state::WorkerState;
use futures_util::future::{join_all, try_join_all};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Capabilities the host provides to a worker
#[derive(Clone)]
pub struct HostCapabilities {
    pub storage: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub clients: Arc<dyn Clients>,
}

/// Outcome of a successful install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub bucket_name: String,
    pub cached: usize,
}

/// Outcome of activation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stale buckets removed
    pub deleted: Vec<String>,
    /// Stale buckets whose deletion failed, with the reason
    pub failed: Vec<(String, String)>,
    /// Whether client takeover succeeded
    pub claimed: bool,
}

/// Where an intercepted request was answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Result of fetch interception
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub source: ResponseSource,
    pub response: Response,
}

/// One generation of the offline asset cache
pub struct ServiceWorker {
    id: Uuid,
    manifest: ShellManifest,
    state: WorkerState,
    host: HostCapabilities,
}

impl ServiceWorker {
    /// Register a new generation
    pub fn new(manifest: ShellManifest, host: HostCapabilities) -> Self {
        Self::restore(Uuid::new_v4(), manifest, WorkerState::Registered, host)
    }

    /// Rebuild a generation the host persisted earlier
    pub fn restore(
        id: Uuid,
        manifest: ShellManifest,
        state: WorkerState,
        host: HostCapabilities,
    ) -> Self {
        Self {
            id,
            manifest,
            state,
            host,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn manifest(&self) -> &ShellManifest {
        &self.manifest
    }

    pub fn bucket_name(&self) -> &str {
        &self.manifest.bucket_name
    }

    fn transition(&mut self, next: WorkerState) -> ShellcacheResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ShellcacheError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("Worker {} {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Populate this generation's bucket with the application shell
    pub async fn install(&mut self) -> ShellcacheResult<InstallReport> {
        self.transition(WorkerState::Installing)?;
        info!("Installing generation {}", self.manifest.bucket_name);

        match self.populate().await {
            Ok(cached) => {
                self.transition(WorkerState::Installed)?;
                info!(
                    "Cached application shell in {} ({} assets)",
                    self.manifest.bucket_name, cached
                );
                Ok(InstallReport {
                    bucket_name: self.manifest.bucket_name.clone(),
                    cached,
                })
            }
            Err(e) => {
                error!("Caching failed: {}", e);
                self.transition(WorkerState::Redundant)?;
                Err(ShellcacheError::InstallFailed {
                    bucket: self.manifest.bucket_name.clone(),
                    source: Box::new(e),
                })
            }
        }
    }

    async fn populate(&self) -> ShellcacheResult<usize> {
        let requests: Vec<Request> = self
            .manifest
            .assets
            .iter()
            .cloned()
            .map(Request::get)
            .collect();

        let mut seen = HashSet::new();
        for request in &requests {
            if !seen.insert(RequestKey::from_request(request)) {
                return Err(ShellcacheError::DuplicateAsset(request.url.to_string()));
            }
        }

        // Nothing is written unless every asset arrived
        let entries = try_join_all(requests.iter().map(|request| self.fetch_asset(request))).await?;
        let cached = entries.len();

        let storage = &self.host.storage;
        storage.open(&self.manifest.bucket_name).await?;
        storage.put_all(&self.manifest.bucket_name, entries).await?;
        Ok(cached)
    }

    async fn fetch_asset(&self, request: &Request) -> ShellcacheResult<(RequestKey, Response)> {
        let response = self.host.network.fetch(request).await?;
        if !response.is_ok() {
            return Err(ShellcacheError::AssetStatus {
                url: request.url.to_string(),
                status: response.status,
            });
        }
        debug!("Fetched {} ({} bytes)", request.url, response.body.len());
        Ok((RequestKey::from_request(request), response))
    }

    /// Remove stale generations' buckets, then take over clients
    pub async fn activate(&mut self) -> ShellcacheResult<ActivationReport> {
        self.transition(WorkerState::Activating)?;
        info!("Activating generation {}", self.manifest.bucket_name);

        let mut report = ActivationReport::default();
        let storage = &self.host.storage;
        let current = self.manifest.bucket_name.as_str();

        match storage.keys().await {
            Ok(names) => {
                let stale: Vec<String> = names.into_iter().filter(|name| name != current).collect();

                let deletions = stale.iter().map(|name| async move {
                    info!("Clearing old cache {}", name);
                    (name, storage.delete(name).await)
                });

                // Every deletion settles before clients are claimed
                for (name, result) in join_all(deletions).await {
                    match result {
                        Ok(true) => report.deleted.push(name.clone()),
                        Ok(false) => debug!("Bucket {} already gone", name),
                        Err(e) => {
                            warn!("Failed to clear old cache {}: {}", name, e);
                            report.failed.push((name.clone(), e.to_string()));
                        }
                    }
                }
            }
            Err(e) => warn!("Could not enumerate cache buckets: {}", e),
        }

        match self.host.clients.claim(self.id).await {
            Ok(()) => report.claimed = true,
            Err(e) => warn!("Client takeover failed: {}", e),
        }

        self.transition(WorkerState::Active)?;
        info!("Generation {} active", self.manifest.bucket_name);
        Ok(report)
    }

    /// Resolve an intercepted request: bucket first, then network
    pub async fn handle_fetch(&self, request: &Request) -> ShellcacheResult<FetchOutcome> {
        if !self.state.is_active() {
            return Err(ShellcacheError::NotActive(self.state));
        }
        info!("Fetching {} {}", request.method, request.url);

        let lookup = self
            .host
            .storage
            .match_request(&self.manifest.bucket_name, request, self.manifest.matching)
            .await;

        match lookup {
            Ok(Some(response)) => {
                debug!("Cache hit for {}", request.url);
                return Ok(FetchOutcome {
                    source: ResponseSource::Cache,
                    response,
                });
            }
            Ok(None) => debug!("Cache miss for {}", request.url),
            Err(e) => debug!("Cache lookup failed for {}, treating as miss: {}", request.url, e),
        }

        let response = self.host.network.fetch(request).await?;
        Ok(FetchOutcome {
            source: ResponseSource::Network,
            response,
        })
    }

    /// Discard this generation
    pub fn retire(&mut self) -> ShellcacheResult<()> {
        self.transition(WorkerState::Redundant)
    }
}
