//! Process-local cache buckets.
//!
//! Useful for hosts without a writable disk and for tests. An optional byte
//! quota makes `put` fail with [`BridgeError::QuotaExceeded`] the way a full
//! browser cache does.

use async_trait::async_trait;
use bridge_traits::{
    cache::{CacheBucket, CacheStorage, CachedResponse},
    error::{BridgeError, Result},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// [`CacheStorage`] kept entirely in memory.
#[derive(Default)]
pub struct MemoryCacheStorage {
    buckets: Mutex<HashMap<String, Arc<MemoryCacheBucket>>>,
    quota_bytes: Option<u64>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit each bucket to `quota_bytes` of stored bodies.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>> {
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCacheBucket::new(self.quota_bytes)))
            .clone();
        Ok(bucket)
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool> {
        Ok(self.buckets.lock().remove(name).is_some())
    }
}

/// One in-memory bucket.
pub struct MemoryCacheBucket {
    entries: Mutex<HashMap<String, CachedResponse>>,
    quota_bytes: Option<u64>,
}

impl MemoryCacheBucket {
    fn new(quota_bytes: Option<u64>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes,
        }
    }

    /// Total size of stored bodies.
    pub fn used_bytes(&self) -> u64 {
        self.entries.lock().values().map(CachedResponse::size).sum()
    }
}

#[async_trait]
impl CacheBucket for MemoryCacheBucket {
    async fn match_key(&self, key: &str) -> Result<Option<CachedResponse>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, response: CachedResponse) -> Result<()> {
        let mut entries = self.entries.lock();
        if let Some(quota) = self.quota_bytes {
            let others: u64 = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.size())
                .sum();
            if others + response.size() > quota {
                return Err(BridgeError::QuotaExceeded(format!(
                    "{} bytes would exceed quota of {} bytes",
                    others + response.size(),
                    quota
                )));
            }
        }
        entries.insert(key.to_string(), response);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}
