//! In-process cache storage

use crate::cache::key::RequestKey;
use crate::cache::storage::CacheStorage;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::http::Response;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type Bucket = BTreeMap<RequestKey, Response>;

/// Buckets held in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    buckets: RwLock<BTreeMap<String, Bucket>>,
}

impl MemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, bucket: &str) -> ShellcacheResult<()> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn has(&self, bucket: &str) -> ShellcacheResult<bool> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn keys(&self) -> ShellcacheResult<Vec<String>> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn delete(&self, bucket: &str) -> ShellcacheResult<bool> {
        Ok(self.buckets.write().await.remove(bucket).is_some())
    }

    async fn get(&self, bucket: &str, key: &RequestKey) -> ShellcacheResult<Option<Response>> {
        Ok(self
            .buckets
            .read()
            .await
            .get(bucket)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(&self, bucket: &str, key: RequestKey, response: Response) -> ShellcacheResult<()> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(key, response);
        Ok(())
    }

    async fn put_all(
        &self,
        bucket: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> ShellcacheResult<()> {
        // Single write guard: readers see either none or all of the batch
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default().extend(entries);
        Ok(())
    }

    async fn entries(&self, bucket: &str) -> ShellcacheResult<Vec<RequestKey>> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .map(|entries| entries.keys().cloned().collect())
            .ok_or_else(|| ShellcacheError::BucketNotFound(bucket.to_string()))
    }
}
