//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `CacheStorage` using `tokio::fs` under the platform cache directory
//! - `CacheStorage` kept in memory, with an optional quota
//! - `ObjectUrlStore` as an in-process handle registry
//!
//! The media element itself is always supplied by the host application.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileCacheStorage, InMemoryObjectUrls, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = Arc::new(ReqwestHttpClient::new());
//!     let cache_storage = Arc::new(FileCacheStorage::new());
//!     let object_urls = Arc::new(InMemoryObjectUrls::new());
//!
//!     // Use in core configuration
//! }
//! ```

mod file_cache;
mod http;
mod memory_cache;
mod object_urls;

pub use file_cache::{FileCacheBucket, FileCacheStorage};
pub use http::ReqwestHttpClient;
pub use memory_cache::{MemoryCacheBucket, MemoryCacheStorage};
pub use object_urls::InMemoryObjectUrls;
