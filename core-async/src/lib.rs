//! Runtime facade for the streamcache core crates.
//!
//! Every `core-*` and `bridge-*` crate reaches the async runtime through this
//! crate instead of naming Tokio directly. Keeping the seam in one place means
//! the scheduling model (timers, task spawning, locks, shared completion
//! signals) is defined once for the whole workspace.
//!
//! # Modules
//!
//! - `task`: task spawning and join handles
//! - `time`: sleep, timeout and a pausable monotonic `Instant`
//! - `sync`: async locks, channels and `CancellationToken`
//! - `future`: shared futures and deadline races
//! - `runtime`: blocking entry points for synchronous callers
//!
//! # Examples
//!
//! ```rust
//! use core_async::future::{race_deadline, Raced};
//! use core_async::time::Duration;
//!
//! # async fn example() {
//! match race_deadline(Duration::from_secs(3), Box::pin(async { 42 })).await {
//!     Raced::Completed(value) => assert_eq!(value, 42),
//!     Raced::DeadlineElapsed(_pending) => unreachable!(),
//! }
//! # }
//! ```

pub mod future;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
