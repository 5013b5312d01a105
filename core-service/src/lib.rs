//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] and a host media element into
//! a ready playback session with its prefetch engine and persistent cache.
//! Desktop apps typically enable the `desktop-shims` feature, which fills in
//! any bridge the host did not inject with the `bridge-desktop` defaults.

pub mod error;

pub use error::{CoreError, Result};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

use std::sync::Arc;

use bridge_traits::media::MediaElement;
use core_playback::{
    ItemId, PendingFetch, PersistentCacheStore, PlaybackSessionController, PrefetchConfig,
    PrefetchCoordinator, Priority, RemoteAddress, RetryingFetcher, StreamEndpoint,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus, EventStream};
use tracing::{info, instrument, warn};

/// Primary façade exposed to host applications.
///
/// Owns one playback session, the prefetch coordinator behind it and the
/// persistent cache store they share.
#[derive(Clone)]
pub struct MediaCore {
    session: PlaybackSessionController,
    coordinator: PrefetchCoordinator,
    store: Arc<PersistentCacheStore>,
    endpoint: StreamEndpoint,
    event_bus: EventBus,
}

impl MediaCore {
    /// Create a core with the default prefetch policies.
    pub fn new(config: CoreConfig, element: Arc<dyn MediaElement>) -> Result<Self> {
        Self::with_prefetch_config(config, element, PrefetchConfig::default())
    }

    /// Create a core with custom retry and handoff settings.
    ///
    /// The bucket name and feature flags of `config` take precedence over
    /// the matching fields of `prefetch`.
    pub fn with_prefetch_config(
        config: CoreConfig,
        element: Arc<dyn MediaElement>,
        prefetch: PrefetchConfig,
    ) -> Result<Self> {
        config.validate()?;

        let continuation =
            prefetch.background_continuation && config.features.background_continuation;
        let prefetch = prefetch
            .with_cache_name(config.cache_name.clone())
            .with_background_continuation(continuation);
        prefetch.validate()?;

        let storage = if config.features.persistent_cache {
            config.cache_storage.clone()
        } else {
            None
        };
        if storage.is_none() {
            warn!("Persistent cache unavailable, items will stream without local copies");
        }

        let event_bus = EventBus::new(config.event_buffer_size);
        let endpoint = StreamEndpoint::new(config.stream_base_url.clone());
        let store = Arc::new(PersistentCacheStore::new(
            storage,
            Arc::clone(&config.object_urls),
            &prefetch,
        ));
        let fetcher = RetryingFetcher::new(Arc::clone(&config.http_client), &prefetch);
        let coordinator =
            PrefetchCoordinator::new(Arc::clone(&store), fetcher, event_bus.clone());
        let session = PlaybackSessionController::new(
            element,
            coordinator.clone(),
            endpoint.clone(),
            prefetch,
            event_bus.clone(),
        );

        info!(
            stream_base_url = %endpoint.base(),
            cache = %store.bucket_name(),
            persistent = store.is_available(),
            "Media core initialized"
        );

        Ok(Self {
            session,
            coordinator,
            store,
            endpoint,
            event_bus,
        })
    }

    pub fn session(&self) -> &PlaybackSessionController {
        &self.session
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to every core event from now on.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn address_for(&self, id: &ItemId) -> RemoteAddress {
        self.endpoint.address_for(id)
    }

    /// Fetches `id` into the cache without touching playback.
    ///
    /// Shares the transfer with any selection of the same item.
    pub fn prefetch(&self, id: &ItemId, priority: Priority) -> PendingFetch {
        self.coordinator
            .prefetch(id, &self.endpoint.address_for(id), priority)
    }

    pub async fn is_cached(&self, id: &ItemId) -> bool {
        self.store.contains(id).await
    }

    pub async fn cached_items(&self) -> Vec<ItemId> {
        self.store.cached_items().await
    }

    /// Deletes the persisted copy of `id`.
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn remove_cached(&self, id: &ItemId) -> bool {
        let removed = self.store.remove(id).await;
        if removed {
            let _ = self.event_bus.emit(CoreEvent::Cache(CacheEvent::Removed {
                item_id: id.to_string(),
            }));
        }
        removed
    }

    /// Deletes every persisted copy and returns how many were removed.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self) -> usize {
        let entries = self.store.clear_all().await;
        let _ = self
            .event_bus
            .emit(CoreEvent::Cache(CacheEvent::Cleared { entries }));
        entries
    }

    /// Tears the playback session down. Running transfers still finish.
    pub fn shutdown(&self) {
        self.session.dispose();
    }
}
