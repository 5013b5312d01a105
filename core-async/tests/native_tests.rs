//! Integration tests for the runtime facade.

use core_async::future::{race_deadline, share, Raced};
use core_async::sync::{self, CancellationToken};
use core_async::{task, time};
use std::sync::Arc;

#[tokio::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    assert_eq!(handle.await.unwrap(), 42);
}

#[tokio::test(start_paused = true)]
async fn test_sleep_advances_virtual_clock() {
    let start = time::Instant::now();
    time::sleep(time::Duration::from_secs(2)).await;
    assert!(start.elapsed() >= time::Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_mutex() {
    let mutex = Arc::new(sync::Mutex::new(0));
    let mutex_clone = mutex.clone();

    task::spawn(async move {
        *mutex_clone.lock().await += 1;
    })
    .await
    .unwrap();

    assert_eq!(*mutex.lock().await, 1);
}

#[tokio::test]
async fn test_cancellation_token_is_shared() {
    let token = CancellationToken::new();
    let observer = token.clone();
    assert!(!observer.is_cancelled());
    token.cancel();
    assert!(observer.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn test_spawned_shared_task_survives_abandoned_waiter() {
    let handle = task::spawn(async {
        time::sleep(time::Duration::from_secs(5)).await;
        11u8
    });
    let shared = share(async move { handle.await.ok() });

    let raced = race_deadline(time::Duration::from_secs(1), shared.clone()).await;
    assert!(raced.is_elapsed());
    drop(raced);

    assert_eq!(shared.await, Some(11));
}

#[tokio::test(start_paused = true)]
async fn test_race_completed_variant() {
    let raced = race_deadline(time::Duration::from_secs(1), Box::pin(async { 5 })).await;
    assert!(matches!(raced, Raced::Completed(5)));
}
