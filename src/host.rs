//! Host runtime assembly
//!
//! Wires the on-disk storage, the HTTP network and the generation registry
//! into worker capabilities, and drives the lifecycle events the way a
//! browser host would: register + install, activate the waiting generation,
//! route fetches through the active one.

use crate::audit::{events, AuditLog};
use crate::cache::{CacheStorage, DiskStorage};
use crate::config::{Config, ConfigManager};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::http::Request;
use crate::network::{HttpNetwork, Network};
use crate::registration::{GenerationRecord, RegistrationManager};
use crate::worker::{
    ActivationReport, FetchOutcome, HostCapabilities, InstallReport, ServiceWorker, ShellManifest,
};
use std::sync::Arc;
use tracing::debug;

/// Everything the CLI needs to run lifecycle events
pub struct Host {
    config: Config,
    storage: Arc<DiskStorage>,
    network: Arc<dyn Network>,
    registry: Arc<RegistrationManager>,
    audit: AuditLog,
}

impl Host {
    /// Build a host from configuration
    pub fn new(config: &Config, manager: &ConfigManager) -> Self {
        let storage_dir = manager.storage_dir(config);
        debug!("Bucket storage at {}", storage_dir.display());

        Self {
            config: config.clone(),
            storage: Arc::new(DiskStorage::new(storage_dir)),
            network: Arc::new(HttpNetwork::new(&config.network)),
            registry: Arc::new(RegistrationManager::new(manager.state_dir())),
            audit: AuditLog::new(config, manager),
        }
    }

    /// Replace the network capability
    pub fn with_network(mut self, network: Arc<dyn Network>) -> Self {
        self.network = network;
        self
    }

    pub fn storage(&self) -> &DiskStorage {
        &self.storage
    }

    pub fn registry(&self) -> &RegistrationManager {
        &self.registry
    }

    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities {
            storage: self.storage.clone(),
            network: self.network.clone(),
            clients: self.registry.clone(),
        }
    }

    fn restore(&self, record: &GenerationRecord) -> ShellcacheResult<ServiceWorker> {
        Ok(ServiceWorker::restore(
            record.id,
            record.manifest()?,
            record.state,
            self.capabilities(),
        ))
    }

    /// Register a generation from config and run its install event
    pub async fn install(&self) -> ShellcacheResult<(GenerationRecord, InstallReport)> {
        let manifest = ShellManifest::from_config(&self.config)?;
        let mut worker = ServiceWorker::new(manifest, self.capabilities());
        let mut record = GenerationRecord::from_worker(&worker);

        // Recorded once settled, so an interrupted install leaves no record
        let result = worker.install().await;
        record.sync(&worker);

        match result {
            Ok(report) => {
                self.registry.replace_waiting(&record).await?;
                self.audit
                    .log(
                        events::INSTALL_COMPLETED,
                        &serde_json::json!({
                            "generation": record.id,
                            "bucket": report.bucket_name,
                            "cached": report.cached,
                        }),
                    )
                    .await;
                Ok((record, report))
            }
            Err(e) => {
                self.registry.record(&record).await?;
                self.audit
                    .log(
                        events::INSTALL_FAILED,
                        &serde_json::json!({
                            "generation": record.id,
                            "bucket": record.bucket_name,
                            "error": e.to_string(),
                        }),
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Run the activate event for the waiting generation
    pub async fn activate(&self) -> ShellcacheResult<(GenerationRecord, ActivationReport)> {
        let mut record = self
            .registry
            .waiting()
            .await?
            .ok_or(ShellcacheError::NoGeneration("waiting"))?;

        let mut worker = self.restore(&record)?;
        let report = worker.activate().await?;
        record.sync(&worker);
        self.registry.promote(&record).await?;

        for bucket in &report.deleted {
            self.audit
                .log(events::BUCKET_DELETED, &serde_json::json!({ "bucket": bucket }))
                .await;
        }
        self.audit
            .log(
                events::ACTIVATE_COMPLETED,
                &serde_json::json!({
                    "generation": record.id,
                    "bucket": record.bucket_name,
                    "deleted": report.deleted,
                    "failed": report.failed.len(),
                    "claimed": report.claimed,
                }),
            )
            .await;
        Ok((record, report))
    }

    /// Route a request through the active generation
    pub async fn fetch(&self, request: &Request) -> ShellcacheResult<FetchOutcome> {
        let record = self
            .registry
            .active()
            .await?
            .ok_or(ShellcacheError::NoGeneration("active"))?;

        self.restore(&record)?.handle_fetch(request).await
    }

    /// Remove a bucket by hand; returns whether it existed
    pub async fn delete_bucket(&self, name: &str) -> ShellcacheResult<bool> {
        let existed = self.storage.delete(name).await?;
        if existed {
            self.audit
                .log(
                    events::BUCKET_DELETED,
                    &serde_json::json!({ "bucket": name, "manual": true }),
                )
                .await;
        }
        Ok(existed)
    }

    /// Bucket names with their entry counts
    pub async fn bucket_summary(&self) -> ShellcacheResult<Vec<(String, usize)>> {
        let mut summary = Vec::new();
        for name in self.storage.keys().await? {
            let count = self.storage.entries(&name).await?.len();
            summary.push((name, count));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, Response};
    use crate::registration::Registration;
    use crate::worker::{ResponseSource, WorkerState};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use url::Url;

    /// Origin that answers every path and notes what the registry held
    struct CountingOrigin {
        calls: AtomicUsize,
        registry_path: PathBuf,
        registry_sizes: Mutex<Vec<usize>>,
        fail_path: Option<&'static str>,
    }

    impl CountingOrigin {
        fn new(temp: &TempDir) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                registry_path: temp.path().join("state").join("registration.json"),
                registry_sizes: Mutex::new(Vec::new()),
                fail_path: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Network for CountingOrigin {
        async fn fetch(&self, request: &Request) -> ShellcacheResult<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let size = match std::fs::read_to_string(&self.registry_path) {
                Ok(content) => serde_json::from_str::<Registration>(&content)
                    .map(|reg| reg.generations.len())
                    .unwrap_or(usize::MAX),
                Err(_) => 0,
            };
            self.registry_sizes.lock().unwrap().push(size);

            let path = request.url.path().to_string();
            if self.fail_path == Some(path.as_str()) {
                return Err(ShellcacheError::network(request.url.as_str(), "connection reset"));
            }
            Ok(Response::new(200, format!("origin {path}")).with_header("Content-Type", "text/plain"))
        }
    }

    fn disk_host(temp: &TempDir, assets: &[&str], origin: Arc<CountingOrigin>) -> Host {
        let mut config = Config::default();
        config.worker.origin = "http://localhost:7860".to_string();
        config.worker.assets = assets.iter().map(|a| a.to_string()).collect();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"))
            .with_state_dir(temp.path().join("state"));
        Host::new(&config, &manager).with_network(origin)
    }

    fn get(path: &str) -> Request {
        Request::parse(Method::Get, path, Some(&Url::parse("http://localhost:7860").unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn cached_shell_served_from_disk_without_network() {
        let temp = TempDir::new().unwrap();
        let origin = Arc::new(CountingOrigin::new(&temp));
        let host = disk_host(&temp, &["/", "/index.html"], origin.clone());

        let (_, report) = host.install().await.unwrap();
        assert_eq!(report.cached, 2);
        host.activate().await.unwrap();
        assert_eq!(origin.calls(), 2);

        let outcome = host.fetch(&get("/index.html")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.body, b"origin /index.html");
        assert_eq!(outcome.response.header("content-type"), Some("text/plain"));
        assert_eq!(origin.calls(), 2);

        // Fresh host over the same state dir still hits the cache
        let again = disk_host(&temp, &["/", "/index.html"], origin.clone());
        let outcome = again.fetch(&get("/")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(origin.calls(), 2);
    }

    #[tokio::test]
    async fn miss_is_not_written_to_disk() {
        let temp = TempDir::new().unwrap();
        let origin = Arc::new(CountingOrigin::new(&temp));
        let host = disk_host(&temp, &["/", "/index.html"], origin.clone());
        host.install().await.unwrap();
        host.activate().await.unwrap();

        let before = host.storage().entries("speechsync-cache-v1").await.unwrap();
        let outcome = host.fetch(&get("/api/transcribe?lang=en")).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.response.body, b"origin /api/transcribe");
        assert_eq!(origin.calls(), 3);
        assert_eq!(
            host.storage().entries("speechsync-cache-v1").await.unwrap(),
            before
        );

        // Second request for the same URL goes to the network again
        host.fetch(&get("/api/transcribe?lang=en")).await.unwrap();
        assert_eq!(origin.calls(), 4);
    }

    #[tokio::test]
    async fn failed_asset_commits_nothing_to_disk() {
        let temp = TempDir::new().unwrap();
        let mut origin = CountingOrigin::new(&temp);
        origin.fail_path = Some("/manifest.json");
        let host = disk_host(&temp, &["/", "/index.html", "/manifest.json"], Arc::new(origin));

        host.install().await.unwrap_err();

        assert!(host.bucket_summary().await.unwrap().is_empty());
        assert!(host.registry().active().await.unwrap().is_none());
        assert!(matches!(
            host.activate().await.unwrap_err(),
            ShellcacheError::NoGeneration("waiting")
        ));
    }

    #[tokio::test]
    async fn generation_recorded_only_after_install_settles() {
        let temp = TempDir::new().unwrap();
        let origin = Arc::new(CountingOrigin::new(&temp));
        let host = disk_host(&temp, &["/", "/index.html"], origin.clone());

        let (record, _) = host.install().await.unwrap();

        // Nothing was registered while assets were still being fetched
        assert_eq!(*origin.registry_sizes.lock().unwrap(), vec![0, 0]);
        let generations = host.registry().list().await.unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].id, record.id);
        assert_eq!(generations[0].state, WorkerState::Installed);
    }

    fn offline_host(temp: &TempDir, assets: Vec<String>) -> Host {
        let mut config = Config::default();
        config.worker.origin = "http://127.0.0.1:1".to_string();
        config.worker.assets = assets;
        config.network.timeout_secs = 2;
        let manager = ConfigManager::with_path(temp.path().join("config.toml"))
            .with_state_dir(temp.path().join("state"));
        Host::new(&config, &manager)
    }

    #[tokio::test]
    async fn unreachable_asset_leaves_generation_redundant() {
        let temp = TempDir::new().unwrap();
        let host = offline_host(&temp, vec!["/index.html".to_string()]);

        let err = host.install().await.unwrap_err();
        assert!(matches!(err, ShellcacheError::InstallFailed { .. }));

        let generations = host.registry().list().await.unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].state, WorkerState::Redundant);
        assert!(host.registry().waiting().await.unwrap().is_none());
        assert!(matches!(
            host.activate().await.unwrap_err(),
            ShellcacheError::NoGeneration("waiting")
        ));
    }

    #[tokio::test]
    async fn empty_shell_goes_active() {
        let temp = TempDir::new().unwrap();
        let host = offline_host(&temp, Vec::new());

        let (installed, report) = host.install().await.unwrap();
        assert_eq!(report.cached, 0);
        assert_eq!(installed.state, WorkerState::Installed);

        let (active, activation) = host.activate().await.unwrap();
        assert_eq!(active.id, installed.id);
        assert_eq!(active.state, WorkerState::Active);
        assert!(activation.claimed);
        assert_eq!(host.registry().controller().await.unwrap(), Some(active.id));

        let summary = host.bucket_summary().await.unwrap();
        assert_eq!(summary, vec![("speechsync-cache-v1".to_string(), 0)]);
    }

    #[tokio::test]
    async fn manual_delete_reports_existence() {
        let temp = TempDir::new().unwrap();
        let host = offline_host(&temp, Vec::new());
        host.storage().open("old-v0").await.unwrap();

        assert!(host.delete_bucket("old-v0").await.unwrap());
        assert!(!host.delete_bucket("old-v0").await.unwrap());
        assert!(host.bucket_summary().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_without_active_generation() {
        let temp = TempDir::new().unwrap();
        let host = offline_host(&temp, Vec::new());
        let request = Request::parse(crate::http::Method::Get, "http://127.0.0.1:1/", None).unwrap();

        let err = host.fetch(&request).await.unwrap_err();
        assert!(matches!(err, ShellcacheError::NoGeneration("active")));
    }

    #[tokio::test]
    async fn miss_on_active_generation_hits_network() {
        let temp = TempDir::new().unwrap();
        let host = offline_host(&temp, Vec::new());
        host.install().await.unwrap();
        host.activate().await.unwrap();

        let request =
            Request::parse(crate::http::Method::Get, "http://127.0.0.1:1/api", None).unwrap();
        let err = host.fetch(&request).await.unwrap_err();
        assert!(err.is_network());
    }
}
