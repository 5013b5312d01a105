//! Persistent cache store over a host [`CacheStorage`] facility.
//!
//! Every operation degrades instead of failing: an absent or broken host
//! cache reads as a miss, and removals become no-ops. Only `put` reports
//! an error, and callers treat that as advisory.

use super::key::CacheKeyScheme;
use crate::config::PrefetchConfig;
use crate::handle::{LocalPlayableReference, ObjectHandle};
use crate::item::ItemId;
use bridge_traits::cache::{CacheBucket, CacheStorage, CachedResponse};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media::ObjectUrlStore;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct PersistentCacheStore {
    storage: Option<Arc<dyn CacheStorage>>,
    bucket_name: String,
    keys: CacheKeyScheme,
    object_urls: Arc<dyn ObjectUrlStore>,
}

impl PersistentCacheStore {
    /// `storage` may be `None` when the host has no cache facility.
    pub fn new(
        storage: Option<Arc<dyn CacheStorage>>,
        object_urls: Arc<dyn ObjectUrlStore>,
        config: &PrefetchConfig,
    ) -> Self {
        Self {
            storage,
            bucket_name: config.cache_name.clone(),
            keys: CacheKeyScheme::new(config.cache_key_prefix.clone()),
            object_urls,
        }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    pub fn object_urls(&self) -> &Arc<dyn ObjectUrlStore> {
        &self.object_urls
    }

    async fn bucket(&self) -> Option<Arc<dyn CacheBucket>> {
        let storage = self.storage.as_ref()?;
        match storage.open(&self.bucket_name).await {
            Ok(bucket) => Some(bucket),
            Err(e) => {
                warn!(bucket = %self.bucket_name, error = %e, "Cache bucket unavailable");
                None
            }
        }
    }

    /// Looks up `id` and mints a fresh object handle for the hit.
    ///
    /// The caller owns the returned handle.
    pub async fn get(&self, id: &ItemId) -> Option<LocalPlayableReference> {
        let cached = self.lookup(id).await?;
        self.materialize(&cached)
    }

    /// Raw cached bytes for `id`, without allocating a handle.
    pub async fn lookup(&self, id: &ItemId) -> Option<CachedResponse> {
        let bucket = self.bucket().await?;
        let key = self.keys.key_for(id);
        match bucket.match_key(&key).await {
            Ok(Some(cached)) => {
                debug!(item_id = %id, size = cached.size(), "Cache hit");
                Some(cached)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(item_id = %id, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Wraps cached bytes in a new object handle owned by the caller.
    pub fn materialize(&self, cached: &CachedResponse) -> Option<LocalPlayableReference> {
        match self
            .object_urls
            .create_object_url(cached.body.clone(), &cached.content_type)
        {
            Ok(url) => Some(LocalPlayableReference::Local(ObjectHandle::new(url))),
            Err(e) => {
                warn!(error = %e, "Failed to allocate object handle");
                None
            }
        }
    }

    /// Persists a complete blob. The write is all-or-nothing at the bucket.
    #[instrument(skip(self, body), fields(item_id = %id, size = body.len()))]
    pub async fn put(&self, id: &ItemId, body: Bytes, content_type: &str) -> BridgeResult<()> {
        let storage = self.storage.as_ref().ok_or_else(|| {
            BridgeError::NotAvailable("persistent cache storage".to_string())
        })?;
        let bucket = storage.open(&self.bucket_name).await?;
        bucket
            .put(&self.keys.key_for(id), CachedResponse::new(content_type, body))
            .await?;
        debug!("Stored cached copy");
        Ok(())
    }

    pub async fn contains(&self, id: &ItemId) -> bool {
        let Some(bucket) = self.bucket().await else {
            return false;
        };
        matches!(bucket.match_key(&self.keys.key_for(id)).await, Ok(Some(_)))
    }

    /// Returns `true` if an entry was deleted.
    pub async fn remove(&self, id: &ItemId) -> bool {
        let Some(bucket) = self.bucket().await else {
            return false;
        };
        match bucket.delete(&self.keys.key_for(id)).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(item_id = %id, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Identifiers with a persisted copy, in key order.
    pub async fn cached_items(&self) -> Vec<ItemId> {
        let Some(bucket) = self.bucket().await else {
            return Vec::new();
        };
        match bucket.keys().await {
            Ok(keys) => {
                let mut items: Vec<ItemId> =
                    keys.iter().filter_map(|key| self.keys.item_for(key)).collect();
                items.sort();
                items
            }
            Err(e) => {
                warn!(error = %e, "Listing cache keys failed");
                Vec::new()
            }
        }
    }

    /// Deletes every entry of this scheme and returns how many went away.
    #[instrument(skip(self), fields(bucket = %self.bucket_name))]
    pub async fn clear_all(&self) -> usize {
        let Some(bucket) = self.bucket().await else {
            return 0;
        };
        let keys = match bucket.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Listing cache keys failed");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|key| self.keys.item_for(key).is_some()) {
            match bucket.delete(key).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(%key, error = %e, "Cache delete failed"),
            }
        }
        debug!(removed, "Cleared cache entries");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::{InMemoryObjectUrls, MemoryCacheStorage};

    struct BrokenStorage;

    #[async_trait]
    impl CacheStorage for BrokenStorage {
        async fn open(&self, _name: &str) -> BridgeResult<Arc<dyn CacheBucket>> {
            Err(BridgeError::OperationFailed("denied".to_string()))
        }

        async fn delete_bucket(&self, _name: &str) -> BridgeResult<bool> {
            Err(BridgeError::OperationFailed("denied".to_string()))
        }
    }

    fn store_with(
        storage: Option<Arc<dyn CacheStorage>>,
    ) -> (PersistentCacheStore, Arc<InMemoryObjectUrls>) {
        let urls = Arc::new(InMemoryObjectUrls::new());
        let store = PersistentCacheStore::new(storage, urls.clone(), &PrefetchConfig::default());
        (store, urls)
    }

    #[tokio::test]
    async fn put_then_get_mints_handle() {
        let (store, urls) = store_with(Some(Arc::new(MemoryCacheStorage::new())));
        let id = ItemId::new("a b.mp3");

        assert!(store.get(&id).await.is_none());
        store
            .put(&id, Bytes::from_static(b"audio"), "audio/mpeg")
            .await
            .unwrap();

        let reference = store.get(&id).await.unwrap();
        assert!(reference.is_local());
        assert_eq!(
            urls.resolve(reference.src()),
            Some(("audio/mpeg".to_string(), Bytes::from_static(b"audio")))
        );
        assert!(store.contains(&id).await);
        assert_eq!(store.cached_items().await, vec![id]);
    }

    #[tokio::test]
    async fn missing_storage_degrades() {
        let (store, urls) = store_with(None);
        let id = ItemId::new("x");

        assert!(!store.is_available());
        assert!(store.get(&id).await.is_none());
        assert!(!store.remove(&id).await);
        assert_eq!(store.clear_all().await, 0);
        assert!(store.cached_items().await.is_empty());
        assert!(matches!(
            store.put(&id, Bytes::new(), "audio/mpeg").await,
            Err(BridgeError::NotAvailable(_))
        ));
        assert_eq!(urls.live_count(), 0);
    }

    #[tokio::test]
    async fn broken_storage_reads_as_miss() {
        let (store, _) = store_with(Some(Arc::new(BrokenStorage)));
        let id = ItemId::new("x");

        assert!(store.get(&id).await.is_none());
        assert!(!store.contains(&id).await);
        assert!(!store.remove(&id).await);
        assert_eq!(store.clear_all().await, 0);
        assert!(store.put(&id, Bytes::new(), "audio/mpeg").await.is_err());
    }

    #[tokio::test]
    async fn full_storage_rejects_put() {
        let (store, _) = store_with(Some(Arc::new(MemoryCacheStorage::with_quota(4))));
        let result = store
            .put(&ItemId::new("big"), Bytes::from_static(b"too large"), "audio/mpeg")
            .await;
        assert!(matches!(result, Err(BridgeError::QuotaExceeded(_))));
    }

    #[tokio::test]
    async fn remove_and_clear_all() {
        let (store, _) = store_with(Some(Arc::new(MemoryCacheStorage::new())));
        for name in ["1", "2", "3"] {
            store
                .put(&ItemId::new(name), Bytes::from_static(b"x"), "audio/ogg")
                .await
                .unwrap();
        }

        assert!(store.remove(&ItemId::new("2")).await);
        assert!(!store.remove(&ItemId::new("2")).await);
        assert_eq!(store.clear_all().await, 2);
        assert!(store.cached_items().await.is_empty());
    }
}
