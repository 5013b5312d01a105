//! # Prefetch Engine
//!
//! Fetches full item copies into the persistent cache with at most one
//! network transfer per identifier at any time.
//!
//! - [`RetryingFetcher`]: one download under a priority-dependent retry policy
//! - [`InFlightRegistry`]: identifier to shared pending operation
//! - [`PrefetchCoordinator`]: cache check, dedup, fetch and store glued together

pub mod coordinator;
pub mod fetcher;
pub mod registry;

pub use coordinator::{PendingFetch, PrefetchCoordinator};
pub use fetcher::{FetchedBlob, RetryingFetcher};
pub use registry::InFlightRegistry;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy selector for a prefetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// The user just asked for this item.
    High,
    /// Background continuation after the handoff deadline.
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
