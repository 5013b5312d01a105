//! Persistent Cache Facility
//!
//! A durable, origin-scoped key/value store of response-like blobs, opened
//! by bucket name. Mirrors what a browser exposes as `caches.open(name)`:
//! `match`, `put`, `delete` and `keys` on an opened bucket.
//!
//! Capacity is enforced by the host, not by the core. A full store reports
//! [`BridgeError::QuotaExceeded`](crate::error::BridgeError::QuotaExceeded)
//! on `put`. Callers must treat every operation as fallible and the facility
//! as possibly absent altogether.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::Result;

/// A stored blob plus its content-type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub content_type: String,
    pub body: Bytes,
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(content_type: impl Into<String>, body: Bytes) -> Self {
        Self {
            content_type: content_type.into(),
            body,
            stored_at: Utc::now(),
        }
    }

    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}

/// Entry point of the host cache facility.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::cache::{CacheStorage, CachedResponse};
///
/// async fn remember(storage: &dyn CacheStorage, key: &str, body: bytes::Bytes) -> Result<()> {
///     let bucket = storage.open("media-cache-v1").await?;
///     bucket.put(key, CachedResponse::new("audio/mpeg", body)).await
/// }
/// ```
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open (creating if needed) the bucket called `name`.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>>;

    /// Delete a whole bucket. Returns `false` if it did not exist.
    async fn delete_bucket(&self, name: &str) -> Result<bool>;
}

/// One named bucket inside the cache facility.
#[async_trait]
pub trait CacheBucket: Send + Sync {
    /// Look up a complete entry. Partial entries are never visible.
    async fn match_key(&self, key: &str) -> Result<Option<CachedResponse>>;

    /// Store an entry atomically, replacing any previous value.
    async fn put(&self, key: &str, response: CachedResponse) -> Result<()>;

    /// Remove an entry. Returns `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All keys currently stored, in no particular order.
    async fn keys(&self) -> Result<Vec<String>>;
}
