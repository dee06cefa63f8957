//! Audit logging for lifecycle events
//!
//! Writes JSON lines to `<state_dir>/audit.log`: installs, activations and
//! bucket deletions, so an operator can reconstruct which generation served
//! what and when.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Event names written to the audit log
pub mod events {
    pub const INSTALL_COMPLETED: &str = "install.completed";
    pub const INSTALL_FAILED: &str = "install.failed";
    pub const ACTIVATE_COMPLETED: &str = "activate.completed";
    pub const BUCKET_DELETED: &str = "bucket.deleted";
}

/// File-based audit logger that appends JSON lines
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    /// Create a new audit logger from config
    pub fn new(config: &Config, manager: &ConfigManager) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: manager.audit_log_path(),
        }
    }

    /// Log an audit event as a JSON line
    ///
    /// IO failures are logged and dropped; the lifecycle operation that
    /// produced the event has already happened.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log: {}", e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
