//! Filesystem-backed cache storage
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<bucket>/<digest>.json   entry metadata (key, status, headers)
//! <root>/<bucket>/<digest>.body   raw response body
//! <root>/.staging-<uuid>/         batch being prepared by put_all
//! <root>/.retired-<uuid>/         previous bucket contents during a swap
//! ```
//!
//! `put_all` builds the complete new bucket in a staging directory and swaps
//! it in with directory renames. Single `put`s write the body before the
//! metadata file, so an entry is only visible once its body is complete.

use crate::cache::key::RequestKey;
use crate::cache::storage::CacheStorage;
use crate::cache::validate_bucket_name;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::http::Response;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const STAGING_PREFIX: &str = ".staging-";
const RETIRED_PREFIX: &str = ".retired-";
const META_EXT: &str = "json";
const BODY_EXT: &str = "body";

/// Metadata persisted next to each body file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    key: RequestKey,
    status: u16,
    headers: Vec<(String, String)>,
    body_len: u64,
    stored_at: DateTime<Utc>,
}

/// Buckets stored as directories on disk
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Create a store rooted at `root` (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> ShellcacheResult<PathBuf> {
        validate_bucket_name(bucket)?;
        Ok(self.root.join(bucket))
    }

    async fn write_entry(
        dir: &Path,
        key: &RequestKey,
        response: &Response,
    ) -> ShellcacheResult<()> {
        let digest = key.digest();
        let meta = EntryMeta {
            key: key.clone(),
            status: response.status,
            headers: response.headers.clone(),
            body_len: response.body.len() as u64,
            stored_at: Utc::now(),
        };

        let body_path = dir.join(format!("{digest}.{BODY_EXT}"));
        write_file(&body_path, &response.body).await?;

        let content = serde_json::to_vec_pretty(&meta)?;
        write_file(&dir.join(format!("{digest}.{META_EXT}")), &content).await
    }

    async fn read_meta(path: &Path) -> ShellcacheResult<Option<EntryMeta>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ShellcacheError::io(
                format!("reading cache entry {}", path.display()),
                e,
            )),
        }
    }

    /// Carry over existing entries the batch does not replace
    async fn merge_existing(bucket_dir: &Path, staging: &Path) -> ShellcacheResult<()> {
        let mut dir = match fs::read_dir(bucket_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(ShellcacheError::io(
                    format!("reading bucket {}", bucket_dir.display()),
                    e,
                ))
            }
        };

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ShellcacheError::io("reading bucket entries", e))?
        {
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(".tmp") {
                continue;
            }
            let target = staging.join(&name);
            if fs::try_exists(&target).await.unwrap_or(false) {
                continue;
            }
            fs::copy(entry.path(), &target).await.map_err(|e| {
                ShellcacheError::io(format!("copying {}", entry.path().display()), e)
            })?;
        }
        Ok(())
    }

    /// Swap the staged directory in for the bucket with directory renames
    ///
    /// Readers see either the old bucket or the new one; entries never land
    /// one at a time.
    async fn commit_staged(&self, staging: &Path, bucket_dir: &Path) -> ShellcacheResult<()> {
        Self::merge_existing(bucket_dir, staging).await?;

        let retired = self
            .root
            .join(format!("{RETIRED_PREFIX}{}", uuid::Uuid::new_v4()));
        let had_bucket = match fs::rename(bucket_dir, &retired).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return Err(ShellcacheError::io(
                    format!("retiring bucket {}", bucket_dir.display()),
                    e,
                ))
            }
        };

        if let Err(e) = fs::rename(staging, bucket_dir).await {
            if had_bucket {
                if let Err(restore) = fs::rename(&retired, bucket_dir).await {
                    warn!("Failed to restore bucket {}: {}", bucket_dir.display(), restore);
                }
            }
            return Err(ShellcacheError::io(
                format!("committing bucket {}", bucket_dir.display()),
                e,
            ));
        }

        if had_bucket {
            if let Err(e) = fs::remove_dir_all(&retired).await {
                debug!("Failed to remove retired bucket {}: {}", retired.display(), e);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, bucket: &str) -> ShellcacheResult<()> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShellcacheError::io(format!("creating bucket {}", dir.display()), e))
    }

    async fn has(&self, bucket: &str) -> ShellcacheResult<bool> {
        let dir = self.bucket_dir(bucket)?;
        match fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ShellcacheError::io(
                format!("checking bucket {}", dir.display()),
                e,
            )),
        }
    }

    async fn keys(&self) -> ShellcacheResult<Vec<String>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ShellcacheError::io(
                    format!("listing buckets in {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ShellcacheError::io("listing buckets", e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, bucket: &str) -> ShellcacheResult<bool> {
        let dir = self.bucket_dir(bucket)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ShellcacheError::io(
                format!("deleting bucket {}", dir.display()),
                e,
            )),
        }
    }

    async fn get(&self, bucket: &str, key: &RequestKey) -> ShellcacheResult<Option<Response>> {
        let dir = self.bucket_dir(bucket)?;
        let digest = key.digest();

        let Some(meta) = Self::read_meta(&dir.join(format!("{digest}.{META_EXT}"))).await? else {
            return Ok(None);
        };
        if meta.key != *key {
            warn!("Digest collision in bucket {} for {}", bucket, key);
            return Ok(None);
        }

        let body_path = dir.join(format!("{digest}.{BODY_EXT}"));
        let body = fs::read(&body_path).await.map_err(|e| {
            ShellcacheError::io(format!("reading cache body {}", body_path.display()), e)
        })?;

        Ok(Some(Response {
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(&self, bucket: &str, key: RequestKey, response: Response) -> ShellcacheResult<()> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShellcacheError::io(format!("creating bucket {}", dir.display()), e))?;
        Self::write_entry(&dir, &key, &response).await
    }

    async fn put_all(
        &self,
        bucket: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> ShellcacheResult<()> {
        let bucket_dir = self.bucket_dir(bucket)?;
        let staging = self
            .root
            .join(format!("{STAGING_PREFIX}{}", uuid::Uuid::new_v4()));

        fs::create_dir_all(&staging)
            .await
            .map_err(|e| ShellcacheError::io("creating staging directory", e))?;

        let mut result = Ok(());
        for (key, response) in &entries {
            if let Err(e) = Self::write_entry(&staging, key, response).await {
                result = Err(e);
                break;
            }
        }
        if result.is_ok() {
            result = self.commit_staged(&staging, &bucket_dir).await;
        }

        // Gone already after a successful commit
        if fs::try_exists(&staging).await.unwrap_or(false) {
            if let Err(e) = fs::remove_dir_all(&staging).await {
                debug!("Failed to remove staging dir {}: {}", staging.display(), e);
            }
        }
        result
    }

    async fn entries(&self, bucket: &str) -> ShellcacheResult<Vec<RequestKey>> {
        let dir = self.bucket_dir(bucket)?;
        let mut read = match fs::read_dir(&dir).await {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ShellcacheError::BucketNotFound(bucket.to_string()))
            }
            Err(e) => {
                return Err(ShellcacheError::io(
                    format!("listing bucket {}", dir.display()),
                    e,
                ))
            }
        };

        let mut keys = Vec::new();
        while let Some(entry) = read
            .next_entry()
            .await
            .map_err(|e| ShellcacheError::io("listing bucket entries", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == META_EXT) {
                if let Some(meta) = Self::read_meta(&path).await? {
                    keys.push(meta.key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Write via a temp file + rename so readers never see partial content
pub(crate) async fn write_file(path: &Path, content: &[u8]) -> ShellcacheResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)
        .await
        .map_err(|e| ShellcacheError::io(format!("writing {}", tmp.display()), e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| ShellcacheError::io(format!("renaming {}", path.display()), e))
}
