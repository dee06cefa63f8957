//! Generation registry
//!
//! Plays the host's part of the lifecycle: remembers which generation is
//! waiting, which one is active, and which one controls clients. State is a
//! single `registration.json` under the state directory.

use crate::cache::disk::write_file;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::registration::state::GenerationRecord;
use crate::worker::{Clients, WorkerState};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// On-disk registry contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registration {
    /// Generation currently controlling clients
    pub controller: Option<Uuid>,

    /// Every generation ever registered, oldest first
    pub generations: Vec<GenerationRecord>,
}

impl Registration {
    fn newest_in(&self, state: WorkerState) -> Option<&GenerationRecord> {
        self.generations.iter().rev().find(|g| g.state == state)
    }
}

/// Registry manager handles generation records and client takeover
pub struct RegistrationManager {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RegistrationManager {
    /// Create a manager storing `registration.json` in `state_dir`
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("registration.json"),
            lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> ShellcacheResult<Registration> {
        if !self.path.exists() {
            return Ok(Registration::default());
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            ShellcacheError::io(format!("reading registry {}", self.path.display()), e)
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn write(&self, registration: &Registration) -> ShellcacheResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ShellcacheError::io("creating state directory", e))?;
        }

        let content = serde_json::to_vec_pretty(registration)?;
        write_file(&self.path, &content).await
    }

    /// Apply a change under the registry lock
    async fn update<F>(&self, change: F) -> ShellcacheResult<()>
    where
        F: FnOnce(&mut Registration) -> ShellcacheResult<()> + Send,
    {
        let _guard = self.lock.lock().await;
        let mut registration = self.read().await?;
        change(&mut registration)?;
        self.write(&registration).await
    }

    /// Load the registry
    pub async fn load(&self) -> ShellcacheResult<Registration> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    /// Insert or replace a generation record
    pub async fn record(&self, record: &GenerationRecord) -> ShellcacheResult<()> {
        self.update(|reg| {
            match reg.generations.iter_mut().find(|g| g.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => reg.generations.push(record.clone()),
            }
            Ok(())
        })
        .await?;
        debug!("Recorded generation {} as {}", record.id, record.state);
        Ok(())
    }

    /// Get a generation by id
    pub async fn get(&self, id: Uuid) -> ShellcacheResult<Option<GenerationRecord>> {
        Ok(self.load().await?.generations.into_iter().find(|g| g.id == id))
    }

    /// List all generations, oldest first
    pub async fn list(&self) -> ShellcacheResult<Vec<GenerationRecord>> {
        Ok(self.load().await?.generations)
    }

    /// Newest installed generation waiting to activate
    pub async fn waiting(&self) -> ShellcacheResult<Option<GenerationRecord>> {
        Ok(self.load().await?.newest_in(WorkerState::Installed).cloned())
    }

    /// Newest active generation
    pub async fn active(&self) -> ShellcacheResult<Option<GenerationRecord>> {
        Ok(self.load().await?.newest_in(WorkerState::Active).cloned())
    }

    /// Generation controlling clients
    pub async fn controller(&self) -> ShellcacheResult<Option<Uuid>> {
        Ok(self.load().await?.controller)
    }

    /// Record a freshly installed generation; an older waiting one is discarded
    pub async fn replace_waiting(&self, record: &GenerationRecord) -> ShellcacheResult<()> {
        self.update(|reg| {
            for g in reg.generations.iter_mut() {
                if g.id != record.id && g.state == WorkerState::Installed {
                    info!("Discarding waiting generation {}", g.bucket_name);
                    g.state = WorkerState::Redundant;
                    g.updated_at = Utc::now();
                }
            }
            match reg.generations.iter_mut().find(|g| g.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => reg.generations.push(record.clone()),
            }
            Ok(())
        })
        .await
    }

    /// Record an activated generation; every previously active one is retired
    pub async fn promote(&self, record: &GenerationRecord) -> ShellcacheResult<()> {
        if record.state != WorkerState::Active {
            return Err(ShellcacheError::Internal(format!(
                "cannot promote generation in state {}",
                record.state
            )));
        }

        self.update(|reg| {
            for g in reg.generations.iter_mut() {
                if g.id != record.id && g.state == WorkerState::Active {
                    info!("Retiring generation {}", g.bucket_name);
                    g.state = WorkerState::Redundant;
                    g.updated_at = Utc::now();
                }
            }
            match reg.generations.iter_mut().find(|g| g.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => reg.generations.push(record.clone()),
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl Clients for RegistrationManager {
    async fn claim(&self, worker_id: Uuid) -> ShellcacheResult<()> {
        self.update(|reg| {
            reg.controller = Some(worker_id);
            Ok(())
        })
        .await?;
        info!("Generation {} now controls clients", worker_id);
        Ok(())
    }
}
