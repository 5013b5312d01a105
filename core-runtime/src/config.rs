//! # Core Configuration Module
//!
//! Provides configuration management for the streaming cache core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all injected host bridges and settings. It enforces
//! fail-fast validation so a missing required bridge is reported at startup,
//! not on the first playback attempt.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Fetches full items for the cache (desktop default: reqwest)
//! - `ObjectUrlStore` - Mints playable handles for cached blobs
//!   (desktop default: in-process registry)
//!
//! ## Optional Dependencies
//!
//! - `CacheStorage` - Durable cache facility. When absent the core runs
//!   degraded: every lookup is a miss and every write is a no-op. With the
//!   `desktop-shims` feature a file-backed store is injected by default.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .stream_base_url("https://media.example/api/stream")
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ### Configuration with Custom Bridges
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .stream_base_url("/api/stream")
//!     .cache_name("media-cache-v2")
//!     .http_client(Arc::new(MyHttpClient))
//!     .cache_storage(Arc::new(MyCacheStorage))
//!     .object_urls(Arc::new(MyObjectUrls))
//!     .event_buffer_size(512)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{CacheStorage, HttpClient, ObjectUrlStore};
use std::sync::Arc;

/// Bucket name used when none is configured.
pub const DEFAULT_CACHE_NAME: &str = "media-cache-v1";

const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Core configuration for the streaming cache core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base address items are streamed from. The item identifier is
    /// percent-encoded and appended as the final path segment.
    pub stream_base_url: String,

    /// Name of the persistent cache bucket
    pub cache_name: String,

    /// HTTP client for full-item fetches
    pub http_client: Arc<dyn HttpClient>,

    /// Durable cache facility; `None` means caching is disabled
    pub cache_storage: Option<Arc<dyn CacheStorage>>,

    /// Object handle minting for cached blobs
    pub object_urls: Arc<dyn ObjectUrlStore>,

    /// Capacity of the event bus
    pub event_buffer_size: usize,

    /// Features flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("stream_base_url", &self.stream_base_url)
            .field("cache_name", &self.cache_name)
            .field("http_client", &"HttpClient { ... }")
            .field(
                "cache_storage",
                &self.cache_storage.as_ref().map(|_| "CacheStorage { ... }"),
            )
            .field("object_urls", &"ObjectUrlStore { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Persist fetched items. Disabling it drops any configured cache facility.
    pub persistent_cache: bool,

    /// After the handoff deadline, keep waiting for the copy at low priority
    /// and swap when it lands.
    pub background_continuation: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            persistent_cache: true,
            background_continuation: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Stream base address is not empty and has no query string
    /// - Cache bucket name is not empty
    /// - Event buffer size is within `1..=65536`
    pub fn validate(&self) -> Result<()> {
        if self.stream_base_url.trim().is_empty() {
            return Err(Error::Config(
                "Stream base URL cannot be empty".to_string(),
            ));
        }

        if self.stream_base_url.contains('?') || self.stream_base_url.contains('#') {
            return Err(Error::Config(
                "Stream base URL must not carry a query string or fragment; \
                 the item identifier is appended as a path segment"
                    .to_string(),
            ));
        }

        if self.cache_name.trim().is_empty() {
            return Err(Error::Config("Cache name cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to fetch items for the cache. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Other hosts: inject a native HTTP adapter."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn object_urls_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ObjectUrlStore".to_string(),
        message: "ObjectUrlStore implementation is required to play cached copies. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default InMemoryObjectUrls. \
                 Web: inject a URL.createObjectURL adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_object_urls() -> Result<Arc<dyn ObjectUrlStore>> {
    use bridge_desktop::InMemoryObjectUrls;

    let store: Arc<dyn ObjectUrlStore> = Arc::new(InMemoryObjectUrls::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_object_urls() -> Result<Arc<dyn ObjectUrlStore>> {
    Err(object_urls_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_cache_storage() -> Option<Arc<dyn CacheStorage>> {
    use bridge_desktop::FileCacheStorage;

    let storage: Arc<dyn CacheStorage> = Arc::new(FileCacheStorage::new());
    Some(storage)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_cache_storage() -> Option<Arc<dyn CacheStorage>> {
    tracing::info!("No CacheStorage provided; persistent caching is disabled");
    None
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    stream_base_url: Option<String>,
    cache_name: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    cache_storage: Option<Arc<dyn CacheStorage>>,
    object_urls: Option<Arc<dyn ObjectUrlStore>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the base address items are streamed from (required).
    ///
    /// A trailing `/` is ignored.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .stream_base_url("https://media.example/api/stream/");
    /// ```
    pub fn stream_base_url(mut self, url: impl Into<String>) -> Self {
        self.stream_base_url = Some(url.into());
        self
    }

    /// Sets the persistent cache bucket name.
    ///
    /// Default: [`DEFAULT_CACHE_NAME`]
    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = Some(name.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the durable cache facility.
    ///
    /// If not provided, the desktop default (file-backed) will be used when
    /// the `desktop-shims` feature is enabled. Otherwise caching is disabled.
    pub fn cache_storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.cache_storage = Some(storage);
        self
    }

    /// Sets the object handle store.
    pub fn object_urls(mut self, store: Arc<dyn ObjectUrlStore>) -> Self {
        self.object_urls = Some(store);
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Enables or disables persistent caching.
    ///
    /// Default: true
    pub fn enable_persistent_cache(mut self, enabled: bool) -> Self {
        self.features.persistent_cache = enabled;
        self
    }

    /// Enables or disables the low-priority continuation after the handoff
    /// deadline.
    ///
    /// Default: true
    pub fn enable_background_continuation(mut self, enabled: bool) -> Self {
        self.features.background_continuation = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The stream base URL is missing or invalid
    /// - A required bridge is missing and no desktop default is available
    /// - Configuration values are out of range
    pub fn build(self) -> Result<CoreConfig> {
        let stream_base_url = self.stream_base_url.ok_or_else(|| {
            Error::Config(
                "Stream base URL is required. Use .stream_base_url() to set it.".to_string(),
            )
        })?;
        let stream_base_url = stream_base_url.trim_end_matches('/').to_string();

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let object_urls = match self.object_urls {
            Some(store) => store,
            None => provide_default_object_urls()?,
        };

        let cache_storage = if self.features.persistent_cache {
            self.cache_storage.or_else(provide_default_cache_storage)
        } else {
            None
        };

        let config = CoreConfig {
            stream_base_url,
            cache_name: self
                .cache_name
                .unwrap_or_else(|| DEFAULT_CACHE_NAME.to_string()),
            http_client,
            cache_storage,
            object_urls,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::cache::{CacheBucket, CachedResponse};
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use bytes::Bytes;

    struct StubHttpClient;

    #[async_trait]
    impl HttpClient for StubHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse::new(200, Bytes::new()))
        }
    }

    struct StubObjectUrls;

    impl ObjectUrlStore for StubObjectUrls {
        fn create_object_url(&self, _body: Bytes, _content_type: &str) -> BridgeResult<String> {
            Ok("blob:stub".to_string())
        }

        fn revoke_object_url(&self, _url: &str) {}
    }

    struct StubCacheStorage;

    #[async_trait]
    impl CacheStorage for StubCacheStorage {
        async fn open(&self, _name: &str) -> BridgeResult<Arc<dyn CacheBucket>> {
            Ok(Arc::new(StubBucket))
        }

        async fn delete_bucket(&self, _name: &str) -> BridgeResult<bool> {
            Ok(false)
        }
    }

    struct StubBucket;

    #[async_trait]
    impl CacheBucket for StubBucket {
        async fn match_key(&self, _key: &str) -> BridgeResult<Option<CachedResponse>> {
            Ok(None)
        }

        async fn put(&self, _key: &str, _response: CachedResponse) -> BridgeResult<()> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn stubbed() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(StubHttpClient))
            .object_urls(Arc::new(StubObjectUrls))
    }

    #[test]
    fn test_builder_with_all_bridges() {
        let config = stubbed()
            .stream_base_url("https://media.example/stream/")
            .cache_name("custom")
            .cache_storage(Arc::new(StubCacheStorage))
            .event_buffer_size(32)
            .build()
            .unwrap();

        assert_eq!(config.stream_base_url, "https://media.example/stream");
        assert_eq!(config.cache_name, "custom");
        assert!(config.cache_storage.is_some());
        assert_eq!(config.event_buffer_size, 32);
        assert_eq!(config.features, FeatureFlags::default());
    }

    #[test]
    fn test_defaults() {
        let config = stubbed()
            .stream_base_url("/api/stream")
            .cache_storage(Arc::new(StubCacheStorage))
            .build()
            .unwrap();

        assert_eq!(config.cache_name, DEFAULT_CACHE_NAME);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.features.persistent_cache);
        assert!(config.features.background_continuation);
    }

    #[test]
    fn test_missing_base_url() {
        let result = stubbed().build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("stream_base_url")));
    }

    #[test]
    fn test_rejects_query_in_base_url() {
        let result = stubbed()
            .stream_base_url("https://media.example/stream?sig=1")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_bad_event_buffer_size() {
        assert!(stubbed()
            .stream_base_url("/s")
            .event_buffer_size(0)
            .build()
            .is_err());
        assert!(stubbed()
            .stream_base_url("/s")
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build()
            .is_err());
    }

    #[test]
    fn test_disabling_persistent_cache_drops_storage() {
        let config = stubbed()
            .stream_base_url("/s")
            .cache_storage(Arc::new(StubCacheStorage))
            .enable_persistent_cache(false)
            .build()
            .unwrap();

        assert!(config.cache_storage.is_none());
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = stubbed().stream_base_url("/s").build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("HttpClient { ... }"));
        assert!(rendered.contains("stream_base_url"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_http_client_fails_fast() {
        let result = CoreConfig::builder()
            .stream_base_url("/s")
            .object_urls(Arc::new(StubObjectUrls))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => assert_eq!(capability, "HttpClient"),
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_cache_storage_is_degraded_not_error() {
        let config = stubbed().stream_base_url("/s").build().unwrap();
        assert!(config.cache_storage.is_none());
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_desktop_defaults_are_injected() {
        let config = CoreConfig::builder()
            .stream_base_url("https://media.example/stream")
            .build()
            .unwrap();

        assert!(config.cache_storage.is_some());
    }
}
