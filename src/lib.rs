//! Shellcache - offline application shell cache
//!
//! Pre-caches a fixed list of shell assets into a versioned bucket during
//! install, deletes every other bucket on activation, and answers requests
//! cache-first with a network fallback.

pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod network;
pub mod registration;
pub mod ui;
pub mod worker;

pub use error::{ShellcacheError, ShellcacheResult};
