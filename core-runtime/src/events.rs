//! # Event Bus System
//!
//! Provides an event-driven architecture for the streaming cache core using
//! `tokio::sync::broadcast`. The playback session and the prefetch engine
//! publish typed events; UI layers and diagnostics subscribe.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit   ┌───────────┐
//! │ Session control  ├─────────>│           │   subscribe   ┌────────────┐
//! └──────────────────┘          │ EventBus  ├──────────────>│ Subscriber │
//! ┌──────────────────┐   emit   │ (broadcast│               └────────────┘
//! │ Prefetch / cache ├─────────>│  channel) ├──────────────>  ...
//! └──────────────────┘          └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Cache(CacheEvent::CacheHit {
//!     item_id: "album/01.mp3".to_string(),
//! })).ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Cache(_)));
//! # }
//! ```
//!
//! ## Event Types
//!
//! ### Playback Events
//! - `TrackChanged`: A new item was selected
//! - `Started` / `Paused` / `Resumed`: Play state changes
//! - `PositionChanged` / `DurationChanged`: Media element progress
//! - `Completed`: The item played to its end
//! - `SourceSwapped`: Streaming source was replaced by a cached copy
//! - `Error`: Host media element reported an error
//!
//! ### Cache Events
//! - `PrefetchStarted`: A network transfer began for an item
//! - `CacheHit`: A request was served from the persistent cache
//! - `PrefetchCompleted` / `PrefetchFailed`: Transfer outcome
//! - `StoreFailed`: A fetched copy could not be persisted
//! - `Removed` / `Cleared`: Explicit invalidation
//!
//! ## Error Handling
//!
//! Publishing never fails the caller in practice: with no subscribers
//! `emit` returns an error that publishers discard with `.ok()`. Slow
//! subscribers receive `RecvError::Lagged(n)` and may continue; `Closed`
//! means every sender was dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Position updates arrive several times per second, so the buffer is sized
/// for a few seconds of backlog.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback session events
    Playback(PlaybackEvent),
    /// Prefetch and persistent cache events
    Cache(CacheEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::PrefetchFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::StoreFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::TrackChanged { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::SourceSwapped { .. }) => EventSeverity::Info,
            CoreEvent::Cache(CacheEvent::PrefetchCompleted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the playback session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new item became the active selection.
    TrackChanged {
        item_id: String,
        title: String,
        /// Position in the filtered view.
        index: usize,
        /// `true` when playback starts from a persisted copy.
        from_cache: bool,
    },
    /// Playback started.
    Started { item_id: String },
    /// Playback paused.
    Paused {
        item_id: String,
        /// Position when paused (milliseconds).
        position_ms: u64,
    },
    /// Playback resumed after pause.
    Resumed {
        item_id: String,
        /// Position when resumed (milliseconds).
        position_ms: u64,
    },
    /// Playback position changed (seek or natural progression).
    PositionChanged { item_id: String, position_ms: u64 },
    /// Media duration became known or changed.
    DurationChanged { item_id: String, duration_ms: u64 },
    /// Item finished playing naturally.
    Completed { item_id: String },
    /// The streaming source was replaced by a local copy.
    SourceSwapped {
        item_id: String,
        /// Position carried across the swap (milliseconds).
        position_ms: u64,
        /// `true` when the copy arrived after the handoff deadline.
        late: bool,
    },
    /// The host media element reported an error.
    Error {
        item_id: Option<String>,
        message: String,
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::TrackChanged { .. } => "Track changed",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::DurationChanged { .. } => "Duration changed",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::SourceSwapped { .. } => "Switched to cached copy",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events related to prefetching and the persistent cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// A network transfer began.
    PrefetchStarted {
        item_id: String,
        /// `"high"` or `"low"`.
        priority: String,
    },
    /// A request was satisfied from the persistent cache.
    CacheHit { item_id: String },
    /// A transfer finished and produced a local copy.
    PrefetchCompleted {
        item_id: String,
        bytes: u64,
        attempts: u32,
    },
    /// A transfer exhausted its attempts.
    PrefetchFailed {
        item_id: String,
        attempts: u32,
        message: String,
    },
    /// A fetched copy could not be persisted. Playback is unaffected.
    StoreFailed { item_id: String, message: String },
    /// An entry was explicitly removed.
    Removed { item_id: String },
    /// The whole cache bucket was emptied.
    Cleared { entries: usize },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::PrefetchStarted { .. } => "Prefetch started",
            CacheEvent::CacheHit { .. } => "Served from cache",
            CacheEvent::PrefetchCompleted { .. } => "Prefetch completed",
            CacheEvent::PrefetchFailed { .. } => "Prefetch failed",
            CacheEvent::StoreFailed { .. } => "Cache write failed",
            CacheEvent::Removed { .. } => "Cache entry removed",
            CacheEvent::Cleared { .. } => "Cache cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. [`CoreConfig`](crate::config::CoreConfig)
    /// validation rejects that value before a bus is built from it.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future events.
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(16);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(16);
/// let cache_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Cache(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str) -> CoreEvent {
        CoreEvent::Cache(CacheEvent::CacheHit {
            item_id: id.to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(hit("a")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Playback(PlaybackEvent::SourceSwapped {
            item_id: "a".to_string(),
            position_ms: 12_500,
            late: true,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Playback(_)));

        bus.emit(hit("a")).ok();
        let completed = CoreEvent::Playback(PlaybackEvent::Completed {
            item_id: "a".to_string(),
        });
        bus.emit(completed.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), completed);
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(hit(&format!("item-{}", i))).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity_and_description() {
        let error = CoreEvent::Playback(PlaybackEvent::Error {
            item_id: None,
            message: "decode".to_string(),
            recoverable: false,
        });
        assert_eq!(error.severity(), EventSeverity::Error);

        let failed = CoreEvent::Cache(CacheEvent::PrefetchFailed {
            item_id: "a".to_string(),
            attempts: 3,
            message: "timeout".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Warning);

        let position = CoreEvent::Playback(PlaybackEvent::PositionChanged {
            item_id: "a".to_string(),
            position_ms: 5000,
        });
        assert_eq!(position.severity(), EventSeverity::Debug);
        assert_eq!(hit("a").description(), "Served from cache");
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let handle1 = tokio::spawn(async move {
            for i in 0..10 {
                bus1.emit(hit(&format!("a-{}", i))).ok();
            }
        });
        let handle2 = tokio::spawn(async move {
            for i in 0..10u64 {
                bus2.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
                    item_id: "b".to_string(),
                    position_ms: i * 250,
                }))
                .ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Cache(CacheEvent::PrefetchStarted {
            item_id: "album/01.mp3".to_string(),
            priority: "high".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Cache\""));
        assert!(json.contains("\"event\":\"PrefetchStarted\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }
}
