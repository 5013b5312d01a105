//! Time-related abstractions.
//!
//! Re-exports Tokio's timer primitives. `Instant` is Tokio's instant rather
//! than the standard library's so that tests running with a paused clock
//! (`#[tokio::test(start_paused = true)]`) observe the same virtual time the
//! timers use.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! # async fn example() {
//! let start = Instant::now();
//! sleep(Duration::from_millis(10)).await;
//! assert!(start.elapsed() >= Duration::from_millis(10));
//! # }
//! ```

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};
pub use tokio::time::{error::Elapsed, interval, sleep, sleep_until, timeout, Instant, Interval};

/// Returns the current wall-clock time as milliseconds since `UNIX_EPOCH`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Converts fractional seconds (media element clock) into a `Duration`.
///
/// Negative and non-finite inputs clamp to zero.
pub fn secs_f64_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
