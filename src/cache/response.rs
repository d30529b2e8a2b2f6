use super::KvStore;
use crate::pipeline::Outcome;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const ONE_YEAR_SECS: u64 = 31_536_000;

/// A freshly generated value and whether it may be stored. Fallback values
/// are never cached.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub value: T,
    pub cacheable: bool,
}

impl<T> Generated<T> {
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            cacheable: true,
        }
    }
}

impl<T> From<Outcome<T>> for Generated<T> {
    fn from(outcome: Outcome<T>) -> Self {
        let cacheable = !outcome.is_fallback();
        Self {
            value: outcome.value,
            cacheable,
        }
    }
}

#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(ONE_YEAR_SECS),
        }
    }

    /// A stored value that no longer decodes as `T` counts as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Cached value does not decode");
                None
            }
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Value does not serialize, not caching");
                return;
            }
        };
        if let Err(e) = self.store.put(key, &raw, self.ttl).await {
            warn!(key, error = %e, "Cache write failed");
        }
    }

    pub async fn get_or_generate<T, F, Fut>(&self, key: &str, generate: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Generated<T>>,
    {
        if let Some(hit) = self.get_json(key).await {
            debug!(key, "Cache hit");
            return hit;
        }

        let generated = generate().await;
        if generated.cacheable {
            self.put_json(key, &generated.value).await;
        }
        generated.value
    }
}

/// Stable key for a flow request: flow name plus a BLAKE3 digest of the
/// request's JSON form. Always `flow.len() + 65` bytes.
pub fn cache_key<T: Serialize>(flow: &str, request: &T) -> String {
    let body = serde_json::to_vec(request).unwrap_or_default();
    format!("{}:{}", flow, blake3::hash(&body).to_hex())
}
