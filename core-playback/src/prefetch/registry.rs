//! In-flight request registry.
//!
//! Maps an identifier to the one shared operation currently fetching it.
//! Registration happens under a blocking lock with no suspension point
//! between the lookup and the insert, so two callers can never both miss
//! and start separate transfers.

use crate::item::ItemId;
use bridge_traits::cache::CachedResponse;
use core_async::future::SharedTask;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Completion signal shared by every caller of one operation.
pub type PendingCopy = SharedTask<Option<CachedResponse>>;

struct Entry {
    op_id: u64,
    copy: PendingCopy,
}

#[derive(Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<ItemId, Entry>>,
    next_op: AtomicU64,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live operation for `id`, or registers the one built by
    /// `start`.
    ///
    /// `start` receives the operation id to pass back to
    /// [`settle`](Self::settle). It runs with the registry locked and must
    /// not call back into the registry synchronously. The boolean is `true`
    /// when an existing operation was joined.
    pub fn acquire_or_register<F>(&self, id: &ItemId, start: F) -> (PendingCopy, bool)
    where
        F: FnOnce(u64) -> PendingCopy,
    {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(id) {
            // An operation that died without settling still resolves; a
            // resolved entry is never handed to new callers.
            if entry.copy.peek().is_none() {
                return (entry.copy.clone(), true);
            }
        }

        let op_id = self.next_op.fetch_add(1, Ordering::Relaxed);
        let copy = start(op_id);
        entries.insert(
            id.clone(),
            Entry {
                op_id,
                copy: copy.clone(),
            },
        );
        trace!(item_id = %id, op_id, "Registered in-flight operation");
        (copy, false)
    }

    /// Drops the entry for `id` if it still belongs to `op_id`.
    pub fn settle(&self, id: &ItemId, op_id: u64) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(id) {
            Some(entry) if entry.op_id == op_id => {
                entries.remove(id);
                trace!(item_id = %id, op_id, "Settled in-flight operation");
                true
            }
            _ => false,
        }
    }

    /// Forgets every entry. Running operations are not cancelled.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_async::future::share;
    use futures::future::pending;

    fn never() -> PendingCopy {
        share(pending::<Option<CachedResponse>>())
    }

    fn ready() -> PendingCopy {
        share(async { None })
    }

    #[test]
    fn second_caller_joins_first() {
        let registry = InFlightRegistry::new();
        let id = ItemId::new("a");

        let (_, joined) = registry.acquire_or_register(&id, |_| never());
        assert!(!joined);

        let mut started = false;
        let (_, joined) = registry.acquire_or_register(&id, |_| {
            started = true;
            never()
        });
        assert!(joined);
        assert!(!started);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn settle_only_removes_own_operation() {
        let registry = InFlightRegistry::new();
        let id = ItemId::new("a");

        let mut first = 0;
        registry.acquire_or_register(&id, |op| {
            first = op;
            never()
        });
        registry.clear();

        let mut second = 0;
        registry.acquire_or_register(&id, |op| {
            second = op;
            never()
        });
        assert_ne!(first, second);

        assert!(!registry.settle(&id, first));
        assert!(registry.contains(&id));
        assert!(registry.settle(&id, second));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn resolved_entry_is_replaced() {
        let registry = InFlightRegistry::new();
        let id = ItemId::new("a");

        let (copy, _) = registry.acquire_or_register(&id, |_| ready());
        assert!(copy.await.is_none());

        let (_, joined) = registry.acquire_or_register(&id, |_| never());
        assert!(!joined);
    }

    #[test]
    fn clear_reports_count() {
        let registry = InFlightRegistry::new();
        registry.acquire_or_register(&ItemId::new("a"), |_| never());
        registry.acquire_or_register(&ItemId::new("b"), |_| never());
        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }
}
