//! Request identity used as the cache key
//!
//! Entries are keyed by method and URL. The fragment never participates;
//! query strings and methods participate unless [`MatchOptions`] relaxes them.
//! Headers are never consulted.

use crate::http::{Method, Request};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Key-matching policy for cache lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Compare URLs without their query string
    pub ignore_search: bool,
    /// Let a request of any method match a stored entry
    pub ignore_method: bool,
}

impl MatchOptions {
    /// Exact method + URL matching
    pub fn exact() -> Self {
        Self::default()
    }

    /// Whether a direct key lookup is sufficient
    pub fn is_exact(&self) -> bool {
        !self.ignore_search && !self.ignore_method
    }
}

/// Identity of a cached request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl RequestKey {
    /// Build a key from a method and URL, dropping the fragment
    pub fn new(method: Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method,
            url: url.into(),
        }
    }

    /// Build the key for an intercepted request
    pub fn from_request(request: &Request) -> Self {
        Self::new(request.method, &request.url)
    }

    /// Whether `self` (a stored key) answers `query` under `options`
    pub fn matches(&self, query: &RequestKey, options: MatchOptions) -> bool {
        if !options.ignore_method && self.method != query.method {
            return false;
        }
        if options.ignore_search {
            strip_query(&self.url) == strip_query(&query.url)
        } else {
            self.url == query.url
        }
    }

    /// Stable file-safe digest of the key (hex SHA-256, first 16 bytes)
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_str().as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
