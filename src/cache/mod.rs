//! Cache bucket storage
//!
//! A bucket is a named key-value store of request -> response entries,
//! scoped to one generation of the application shell. Bucket names carry the
//! generation tag (e.g. `speechsync-cache-v1`): activation deletes every
//! bucket whose name differs from the current one.
//!
//! # Entry lifecycle
//!
//! | Phase | Operation | Writes |
//! |-------|-----------|--------|
//! | Install | `put_all` of the whole shell | yes, atomically |
//! | Fetch | `match_request` | never |
//! | Activate (next generation) | `delete` | removes whole bucket |

pub mod disk;
pub mod key;
pub mod memory;
pub mod storage;

pub use disk::DiskStorage;
pub use key::{MatchOptions, RequestKey};
pub use memory::MemoryStorage;
pub use storage::CacheStorage;

use crate::error::{ShellcacheError, ShellcacheResult};

/// Check that a bucket name is usable as a single path component
pub fn validate_bucket_name(name: &str) -> ShellcacheResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(ShellcacheError::InvalidBucketName(name.to_string()))
    }
}
