//! Prefetch coordinator.
//!
//! `prefetch` registers (or joins) the operation for an identifier before it
//! returns, then hands back a [`PendingFetch`]. The operation itself runs as
//! a spawned task: it outlives every waiter, finishes its cache write, and
//! drops its registry entry when it settles.

use super::fetcher::RetryingFetcher;
use super::registry::{InFlightRegistry, PendingCopy};
use super::Priority;
use crate::cache::PersistentCacheStore;
use crate::handle::LocalPlayableReference;
use crate::item::{ItemId, RemoteAddress};
use bridge_traits::cache::CachedResponse;
use core_async::future::share;
use core_async::task;
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Handle on a registered prefetch operation.
///
/// Cloning shares the same operation. Each [`resolve`](Self::resolve) call
/// mints its own object handle, so callers never release each other's
/// handles.
#[derive(Clone)]
pub struct PendingFetch {
    id: ItemId,
    copy: PendingCopy,
    store: Arc<PersistentCacheStore>,
}

impl PendingFetch {
    pub fn item_id(&self) -> &ItemId {
        &self.id
    }

    /// Waits for the operation. `None` means no local copy was produced.
    pub async fn resolve(self) -> Option<LocalPlayableReference> {
        let cached = self.copy.await?;
        self.store.materialize(&cached)
    }
}

struct CoordinatorInner {
    store: Arc<PersistentCacheStore>,
    fetcher: RetryingFetcher,
    registry: InFlightRegistry,
    event_bus: EventBus,
}

/// Cache check, de-duplication, retrying fetch and store.
#[derive(Clone)]
pub struct PrefetchCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl PrefetchCoordinator {
    pub fn new(
        store: Arc<PersistentCacheStore>,
        fetcher: RetryingFetcher,
        event_bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                store,
                fetcher,
                registry: InFlightRegistry::new(),
                event_bus,
            }),
        }
    }

    pub fn store(&self) -> &Arc<PersistentCacheStore> {
        &self.inner.store
    }

    /// Returns the operation for `id`, starting one if none is in flight.
    ///
    /// Must be called from within a runtime. Joining an in-flight operation
    /// keeps that operation's priority; nothing new touches the network.
    pub fn prefetch(
        &self,
        id: &ItemId,
        address: &RemoteAddress,
        priority: Priority,
    ) -> PendingFetch {
        let (copy, joined) = self.inner.registry.acquire_or_register(id, |op_id| {
            let inner = Arc::clone(&self.inner);
            let id = id.clone();
            let address = address.clone();
            let operation = task::spawn(async move {
                let copy = inner.fetch_and_store(&id, &address, priority).await;
                inner.registry.settle(&id, op_id);
                copy
            });
            share(async move {
                operation.await.unwrap_or_else(|e| {
                    warn!(error = %e, "Prefetch task aborted");
                    None
                })
            })
        });

        if joined {
            debug!(item_id = %id, %priority, "Joined in-flight prefetch");
        }

        PendingFetch {
            id: id.clone(),
            copy,
            store: Arc::clone(&self.inner.store),
        }
    }

    /// Stops tracking in-flight operations for de-duplication.
    ///
    /// Running transfers are not cancelled; they finish and store their
    /// result on their own.
    pub fn clear_all(&self) -> usize {
        let cleared = self.inner.registry.clear();
        debug!(cleared, "Cleared in-flight registry");
        cleared
    }

    pub fn in_flight(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_in_flight(&self, id: &ItemId) -> bool {
        self.inner.registry.contains(id)
    }
}

impl CoordinatorInner {
    #[instrument(skip(self, id, address), fields(item_id = %id, %priority))]
    async fn fetch_and_store(
        &self,
        id: &ItemId,
        address: &RemoteAddress,
        priority: Priority,
    ) -> Option<CachedResponse> {
        if let Some(cached) = self.store.lookup(id).await {
            self.emit(CacheEvent::CacheHit {
                item_id: id.to_string(),
            });
            return Some(cached);
        }

        self.emit(CacheEvent::PrefetchStarted {
            item_id: id.to_string(),
            priority: priority.to_string(),
        });

        let blob = match self.fetcher.fetch(address, priority).await {
            Ok(blob) => blob,
            Err(failure) => {
                warn!(attempts = failure.attempts, error = %failure.last_error, "Prefetch failed");
                self.emit(CacheEvent::PrefetchFailed {
                    item_id: id.to_string(),
                    attempts: failure.attempts,
                    message: failure.last_error.to_string(),
                });
                return None;
            }
        };

        let cached = CachedResponse::new(blob.content_type, blob.body);
        if let Err(e) = self
            .store
            .put(id, cached.body.clone(), &cached.content_type)
            .await
        {
            if e.is_unavailable() {
                debug!("No persistent cache, keeping copy in memory only");
            } else {
                warn!(error = %e, "Failed to persist fetched copy");
            }
            self.emit(CacheEvent::StoreFailed {
                item_id: id.to_string(),
                message: e.to_string(),
            });
        }

        info!(bytes = cached.size(), attempts = blob.attempts, "Prefetch completed");
        self.emit(CacheEvent::PrefetchCompleted {
            item_id: id.to_string(),
            bytes: cached.size(),
            attempts: blob.attempts,
        });
        Some(cached)
    }

    fn emit(&self, event: CacheEvent) {
        let _ = self.event_bus.emit(CoreEvent::Cache(event));
    }
}
