//! Shared futures and deadline races.
//!
//! [`SharedTask`] is a cloneable handle to a single underlying computation:
//! every clone resolves to the same output, and the computation itself only
//! runs once. It is the completion signal stored by de-duplication tables.
//!
//! [`race_deadline`] waits for a future for at most a fixed duration and
//! hands the unfinished future back on timeout, so the caller decides whether
//! to keep waiting, re-issue, or walk away.

use futures::future::{self, BoxFuture, Either, FutureExt, Shared};
use std::future::Future;

use crate::time::{sleep, Duration};

/// A type-erased, cloneable future whose output is computed once.
pub type SharedTask<T> = Shared<BoxFuture<'static, T>>;

/// Boxes and shares `future`.
pub fn share<F>(future: F) -> SharedTask<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Clone,
{
    future.boxed().shared()
}

/// Outcome of [`race_deadline`].
pub enum Raced<T, F> {
    /// The future finished before the deadline.
    Completed(T),
    /// The deadline fired first; the future is returned untouched.
    DeadlineElapsed(F),
}

impl<T, F> Raced<T, F> {
    /// Returns `true` if the deadline fired first.
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Raced::DeadlineElapsed(_))
    }
}

/// Races `future` against a timer of length `deadline`.
///
/// # Examples
///
/// ```rust
/// use core_async::future::{race_deadline, Raced};
/// use core_async::time::Duration;
///
/// # async fn example() {
/// let slow = Box::pin(core_async::time::sleep(Duration::from_secs(10)));
/// match race_deadline(Duration::from_millis(5), slow).await {
///     Raced::Completed(()) => unreachable!(),
///     Raced::DeadlineElapsed(still_running) => drop(still_running),
/// }
/// # }
/// ```
pub async fn race_deadline<F>(deadline: Duration, future: F) -> Raced<F::Output, F>
where
    F: Future + Unpin,
{
    let timer = Box::pin(sleep(deadline));
    match future::select(future, timer).await {
        Either::Left((output, _)) => Raced::Completed(output),
        Either::Right(((), pending)) => Raced::DeadlineElapsed(pending),
    }
}
