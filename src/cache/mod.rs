//! Key/value pass-through cache for generated content.
//!
//! ```text
//! ResponseCache ──► KvStore ──┬─ MemoryKv (lru, per-entry expiry)
//!                             └─ HttpKv   (managed KV over REST)
//! ```
//!
//! Entries are JSON blobs under a string key with a fixed one-year expiry.
//! Nothing is refreshed or invalidated; cache failures are logged and never
//! fail a flow.

pub mod http;
pub mod memory;
pub mod response;

pub use http::HttpKv;
pub use memory::MemoryKv;
pub use response::{cache_key, Generated, ResponseCache, ONE_YEAR_SECS};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("KV store returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("KV request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests;
