//! Integration tests for the prefetch engine: de-duplication, cache
//! short-circuit, retry policies and degraded storage.

mod common;

use bridge_desktop::MemoryCacheStorage;
use bridge_traits::cache::CacheStorage;
use common::{drain, FakeMediaElement, FixedRandom, Harness, Reply, ScriptedHttp, BODY};
use core_async::time::{sleep, Duration, Instant};
use core_playback::{ItemId, PrefetchConfig, Priority, RemoteAddress};
use core_runtime::events::{CacheEvent, CoreEvent};
use futures::future::join_all;
use std::sync::Arc;

fn target(harness: &Harness, id: &str) -> (ItemId, RemoteAddress) {
    (ItemId::new(id), RemoteAddress::new(harness.address(id)))
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_share_one_transfer() {
    let harness = Harness::new(ScriptedHttp::ok_after(Duration::from_millis(500)));
    let (id, address) = target(&harness, "album/01 intro.mp3");

    let pending: Vec<_> = (0..5)
        .map(|i| {
            let priority = if i % 2 == 0 { Priority::High } else { Priority::Low };
            harness.coordinator.prefetch(&id, &address, priority)
        })
        .collect();
    assert_eq!(harness.coordinator.in_flight(), 1);

    let results = join_all(pending.into_iter().map(|p| p.resolve())).await;

    assert_eq!(harness.http.calls(), 1);
    assert!(results.iter().all(|r| r.as_ref().map_or(false, |r| r.is_local())));
    // every caller owns a distinct handle over the same bytes
    assert_eq!(harness.urls.live_count(), 5);
    for reference in results.iter().flatten() {
        let (content_type, body) = harness.urls.resolve(reference.src()).unwrap();
        assert_eq!(content_type, "audio/mpeg");
        assert_eq!(&body[..], BODY);
    }
    assert_eq!(harness.coordinator.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_after_success_is_served_from_cache() {
    let harness = Harness::new(ScriptedHttp::ok_after(Duration::from_millis(100)));
    let (id, address) = target(&harness, "a.mp3");
    let mut events = harness.event_bus.subscribe();

    assert!(harness
        .coordinator
        .prefetch(&id, &address, Priority::High)
        .resolve()
        .await
        .is_some());
    assert!(harness
        .coordinator
        .prefetch(&id, &address, Priority::Low)
        .resolve()
        .await
        .is_some());

    assert_eq!(harness.http.calls(), 1);
    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::Cache(CacheEvent::PrefetchCompleted { attempts: 1, .. })
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, CoreEvent::Cache(CacheEvent::CacheHit { .. }))));
}

#[tokio::test(start_paused = true)]
async fn test_high_priority_retries_with_backoff() {
    let http = ScriptedHttp::scripted(
        Duration::ZERO,
        vec![Reply::Transport, Reply::Status(503)],
        Reply::Ok,
    );
    let harness = Harness::new(http);
    let (id, address) = target(&harness, "a.mp3");

    let start = Instant::now();
    let copy = harness
        .coordinator
        .prefetch(&id, &address, Priority::High)
        .resolve()
        .await;

    assert!(copy.is_some());
    assert_eq!(harness.http.calls(), 3);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(3000), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(3500), "{:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_high_priority_exhaustion_yields_none() {
    let harness = Harness::new(ScriptedHttp::scripted(
        Duration::ZERO,
        vec![],
        Reply::Status(500),
    ));
    let (id, address) = target(&harness, "a.mp3");
    let mut events = harness.event_bus.subscribe();

    let copy = harness
        .coordinator
        .prefetch(&id, &address, Priority::High)
        .resolve()
        .await;

    assert!(copy.is_none());
    assert_eq!(harness.http.calls(), 3);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        CoreEvent::Cache(CacheEvent::PrefetchFailed { attempts: 3, .. })
    )));
}

#[tokio::test(start_paused = true)]
async fn test_low_priority_single_failure_yields_none() {
    let harness = Harness::new(ScriptedHttp::scripted(
        Duration::ZERO,
        vec![Reply::Transport],
        Reply::Ok,
    ));
    let (id, address) = target(&harness, "a.mp3");

    let copy = harness
        .coordinator
        .prefetch(&id, &address, Priority::Low)
        .resolve()
        .await;

    assert!(copy.is_none());
    assert_eq!(harness.http.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_final_but_later_request_starts_fresh() {
    let harness = Harness::new(ScriptedHttp::scripted(
        Duration::ZERO,
        vec![Reply::Status(404)],
        Reply::Ok,
    ));
    let (id, address) = target(&harness, "a.mp3");

    let first = harness
        .coordinator
        .prefetch(&id, &address, Priority::High)
        .resolve()
        .await;
    assert!(first.is_none());
    assert_eq!(harness.http.calls(), 1);
    assert!(!harness.coordinator.is_in_flight(&id));

    let second = harness
        .coordinator
        .prefetch(&id, &address, Priority::High)
        .resolve()
        .await;
    assert!(second.is_some());
    assert_eq!(harness.http.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_low_priority_attempt_times_out() {
    let harness = Harness::new(ScriptedHttp::ok_after(Duration::from_secs(90)));
    let (id, address) = target(&harness, "slow.mp3");

    let start = Instant::now();
    let copy = harness
        .coordinator
        .prefetch(&id, &address, Priority::Low)
        .resolve()
        .await;

    assert!(copy.is_none());
    assert_eq!(harness.http.calls(), 1);
    assert!(start.elapsed() < Duration::from_secs(61));
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_still_returns_copy() {
    let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::with_quota(4));
    let harness = Harness::build_with_storage(
        ScriptedHttp::ok_after(Duration::ZERO),
        FakeMediaElement::new(),
        PrefetchConfig::default(),
        Arc::new(FixedRandom(0)),
        Some(storage),
    );
    let (id, address) = target(&harness, "a.mp3");
    let mut events = harness.event_bus.subscribe();

    let copy = harness
        .coordinator
        .prefetch(&id, &address, Priority::High)
        .resolve()
        .await;

    assert!(copy.is_some());
    assert!(!harness.store.contains(&id).await);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, CoreEvent::Cache(CacheEvent::StoreFailed { .. }))));
}

#[tokio::test(start_paused = true)]
async fn test_missing_cache_facility_still_returns_copy() {
    let harness = Harness::build_with_storage(
        ScriptedHttp::ok_after(Duration::ZERO),
        FakeMediaElement::new(),
        PrefetchConfig::default(),
        Arc::new(FixedRandom(0)),
        None,
    );
    let (id, address) = target(&harness, "a.mp3");

    let first = harness
        .coordinator
        .prefetch(&id, &address, Priority::High)
        .resolve()
        .await;
    assert!(first.is_some());

    // nothing persisted, so the next request goes back to the network
    harness
        .coordinator
        .prefetch(&id, &address, Priority::High)
        .resolve()
        .await;
    assert_eq!(harness.http.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_all_does_not_cancel_running_transfer() {
    let harness = Harness::new(ScriptedHttp::ok_after(Duration::from_secs(5)));
    let (id, address) = target(&harness, "a.mp3");

    let pending = harness.coordinator.prefetch(&id, &address, Priority::High);
    assert_eq!(harness.coordinator.clear_all(), 1);
    assert_eq!(harness.coordinator.in_flight(), 0);

    // nobody waits on the result, the transfer still lands in the cache
    drop(pending);
    sleep(Duration::from_secs(6)).await;
    assert!(harness.store.contains(&id).await);
    assert_eq!(harness.http.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_prefetch_still_persists() {
    let harness = Harness::new(ScriptedHttp::ok_after(Duration::from_secs(2)));
    let (id, address) = target(&harness, "a.mp3");

    drop(harness.coordinator.prefetch(&id, &address, Priority::Low));
    sleep(Duration::from_secs(3)).await;

    assert!(harness.store.contains(&id).await);
    assert_eq!(harness.store.cached_items().await, vec![id]);
}
