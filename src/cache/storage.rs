//! Cache storage abstraction
//!
//! The cache-bucket store is a capability handed to the worker rather than
//! an ambient global, so tests can run against [`MemoryStorage`] and the CLI
//! against [`DiskStorage`].
//!
//! [`MemoryStorage`]: crate::cache::MemoryStorage
//! [`DiskStorage`]: crate::cache::DiskStorage

use crate::cache::key::{MatchOptions, RequestKey};
use crate::error::ShellcacheResult;
use crate::http::{Request, Response};
use async_trait::async_trait;

/// Named buckets of request -> response entries
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a bucket, creating it if absent
    async fn open(&self, bucket: &str) -> ShellcacheResult<()>;

    /// Check whether a bucket exists
    async fn has(&self, bucket: &str) -> ShellcacheResult<bool>;

    /// List all bucket names
    async fn keys(&self) -> ShellcacheResult<Vec<String>>;

    /// Delete a bucket and all its entries; returns whether it existed
    async fn delete(&self, bucket: &str) -> ShellcacheResult<bool>;

    /// Look up an entry by exact key
    async fn get(&self, bucket: &str, key: &RequestKey) -> ShellcacheResult<Option<Response>>;

    /// Store a single entry, overwriting any previous one
    async fn put(&self, bucket: &str, key: RequestKey, response: Response) -> ShellcacheResult<()>;

    /// Store a batch of entries atomically: all land or none do
    async fn put_all(
        &self,
        bucket: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> ShellcacheResult<()>;

    /// List the keys stored in a bucket
    async fn entries(&self, bucket: &str) -> ShellcacheResult<Vec<RequestKey>>;

    /// Find the response answering `request` under `options`
    async fn match_request(
        &self,
        bucket: &str,
        request: &Request,
        options: MatchOptions,
    ) -> ShellcacheResult<Option<Response>> {
        let query = RequestKey::from_request(request);
        if options.is_exact() {
            return self.get(bucket, &query).await;
        }

        for stored in self.entries(bucket).await? {
            if stored.matches(&query, options) {
                return self.get(bucket, &stored).await;
            }
        }
        Ok(None)
    }
}
