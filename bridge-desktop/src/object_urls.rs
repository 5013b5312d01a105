//! In-process object handle registry.
//!
//! Desktop media backends cannot load a `blob:` URL directly, so the
//! registry keeps the bytes reachable by handle until it is revoked. A host
//! media adapter resolves the handle back into bytes when the element loads.

use bridge_traits::{error::Result, media::ObjectUrlStore};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::trace;

const SCHEME: &str = "blob:streamcache/";

#[derive(Default)]
pub struct InMemoryObjectUrls {
    live: Mutex<HashMap<String, (String, Bytes)>>,
}

impl InMemoryObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes and content type behind a live handle.
    pub fn resolve(&self, url: &str) -> Option<(String, Bytes)> {
        self.live.lock().get(url).cloned()
    }

    /// Number of handles created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_object_url(url: &str) -> bool {
        url.starts_with(SCHEME)
    }
}

impl ObjectUrlStore for InMemoryObjectUrls {
    fn create_object_url(&self, body: Bytes, content_type: &str) -> Result<String> {
        let url = format!("{}{}", SCHEME, uuid::Uuid::new_v4());
        trace!(%url, size = body.len(), "Created object handle");
        self.live
            .lock()
            .insert(url.clone(), (content_type.to_string(), body));
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) {
        if self.live.lock().remove(url).is_some() {
            trace!(%url, "Revoked object handle");
        }
    }
}
