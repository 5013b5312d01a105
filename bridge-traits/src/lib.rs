//! # Host Bridge Traits
//!
//! Capabilities the prefetch engine needs from its host, expressed as traits
//! so each host can supply its own adapter.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Single-shot async HTTP requests
//! - [`CacheStorage`](cache::CacheStorage) - Durable, named buckets of response blobs
//! - [`MediaElement`](media::MediaElement) - The host's audio element
//! - [`ObjectUrlStore`](media::ObjectUrlStore) - Object handles for in-memory blobs
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Optional Capabilities
//!
//! The cache facility may be missing on some hosts (private browsing,
//! sandboxed webviews). The core treats a missing [`CacheStorage`] as
//! "caching disabled" and keeps streaming directly. The HTTP client and the
//! media element are required; the core fails fast without them:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| CoreError::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided. \
//!                  Desktop: ensure default feature is enabled.".to_string()
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should convert their native errors into it and keep the
//! message actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! spawned fetch tasks.

pub mod cache;
pub mod error;
pub mod http;
pub mod logging;
pub mod media;

pub use error::BridgeError;

// Re-export commonly used types
pub use cache::{CacheBucket, CacheStorage, CachedResponse};
pub use http::{ContentRange, HttpClient, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{MediaElement, MediaEvent, ObjectUrlStore};
