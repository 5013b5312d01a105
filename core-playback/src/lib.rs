//! # Prefetch and Playback Core
//!
//! Streams remote media items while caching full copies locally, so repeat
//! playback and scrubbing do not depend on the network.
//!
//! ## Overview
//!
//! - [`cache`]: persistent cache store over the host cache facility
//! - [`prefetch`]: retrying fetcher, in-flight de-duplication and the
//!   coordinator combining them with the cache
//! - [`session`]: playback session controller with stream-to-cache handoff
//!
//! ## Example
//!
//! ```ignore
//! use core_playback::{
//!     PersistentCacheStore, PlaybackSessionController, PrefetchConfig,
//!     PrefetchCoordinator, RetryingFetcher, StreamEndpoint,
//! };
//!
//! let config = PrefetchConfig::default();
//! let store = Arc::new(PersistentCacheStore::new(storage, object_urls, &config));
//! let fetcher = RetryingFetcher::new(http, &config);
//! let coordinator = PrefetchCoordinator::new(store, fetcher, event_bus.clone());
//! let session = PlaybackSessionController::new(
//!     element,
//!     coordinator,
//!     StreamEndpoint::new("https://media.example/api/stream"),
//!     config,
//!     event_bus,
//! );
//! session.set_items(items);
//! session.select(0).await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod handle;
pub mod item;
pub mod prefetch;
pub mod session;

pub use cache::{CacheKeyScheme, PersistentCacheStore};
pub use config::{FetchPolicy, PrefetchConfig};
pub use error::{FetchError, FetchFailure, PlaybackError, Result};
pub use handle::{LocalPlayableReference, ObjectHandle};
pub use item::{ItemId, MediaItem, RemoteAddress, StreamEndpoint};
pub use prefetch::{
    FetchedBlob, InFlightRegistry, PendingFetch, PrefetchCoordinator, Priority, RetryingFetcher,
};
pub use session::{
    HandoffOutcome, HandoffTask, PlaybackSessionController, RandomSource, SeededRandom,
    SelectionOutcome, SessionPhase, SessionSnapshot, ThreadRngSource, TrackQueue,
};
