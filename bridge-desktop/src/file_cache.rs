//! Durable cache buckets on the local file system.
//!
//! Layout: `<root>/<bucket>/<sha256(key)>.bin` holds the body and
//! `<sha256(key)>.json` holds the original key and content type. The sidecar
//! is written last, through a temp file and a rename, so a reader never sees
//! a partially written entry.

use async_trait::async_trait;
use bridge_traits::{
    cache::{CacheBucket, CacheStorage, CachedResponse},
    error::{BridgeError, Result},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

const BODY_EXT: &str = "bin";
const META_EXT: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    content_type: String,
    size: u64,
    stored_at: DateTime<Utc>,
}

/// [`CacheStorage`] backed by `tokio::fs` under a root directory.
pub struct FileCacheStorage {
    root: PathBuf,
}

impl FileCacheStorage {
    /// Use the platform cache directory (`~/.cache/streamcache` on Linux).
    pub fn new() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("streamcache");
        Self { root }
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, name: &str) -> PathBuf {
        self.root.join(urlencoding::encode(name).as_ref())
    }
}

impl Default for FileCacheStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStorage for FileCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheBucket>> {
        let dir = self.bucket_dir(name);
        fs::create_dir_all(&dir).await?;
        debug!(path = ?dir, bucket = name, "Opened cache bucket");
        Ok(Arc::new(FileCacheBucket { dir }))
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool> {
        let dir = self.bucket_dir(name);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(path = ?dir, "Deleted cache bucket");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }
}

/// One bucket directory.
pub struct FileCacheBucket {
    dir: PathBuf,
}

impl FileCacheBucket {
    fn entry_stem(key: &str) -> String {
        format!("{:x}", Sha256::digest(key.as_bytes()))
    }

    fn body_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", stem, BODY_EXT))
    }

    fn meta_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", stem, META_EXT))
    }

    async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));
        if let Err(e) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(map_write_error(e));
        }
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_meta(path: &Path) -> Result<Option<EntryMeta>> {
        let raw = match fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BridgeError::Io(e)),
        };
        match serde_json::from_slice(&raw) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                warn!(path = ?path, error = %e, "Ignoring unreadable cache sidecar");
                Ok(None)
            }
        }
    }
}

fn map_write_error(e: std::io::Error) -> BridgeError {
    if e.kind() == ErrorKind::StorageFull {
        BridgeError::QuotaExceeded(e.to_string())
    } else {
        BridgeError::Io(e)
    }
}

#[async_trait]
impl CacheBucket for FileCacheBucket {
    async fn match_key(&self, key: &str) -> Result<Option<CachedResponse>> {
        let stem = Self::entry_stem(key);
        let Some(meta) = Self::read_meta(&self.meta_path(&stem)).await? else {
            return Ok(None);
        };

        let body = match fs::read(self.body_path(&stem)).await {
            Ok(body) => Bytes::from(body),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BridgeError::Io(e)),
        };
        if body.len() as u64 != meta.size {
            warn!(key, expected = meta.size, actual = body.len(), "Cache entry size mismatch");
            return Ok(None);
        }

        Ok(Some(CachedResponse {
            content_type: meta.content_type,
            body,
            stored_at: meta.stored_at,
        }))
    }

    async fn put(&self, key: &str, response: CachedResponse) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let stem = Self::entry_stem(key);

        // Hide the old entry before replacing its body.
        let _ = fs::remove_file(self.meta_path(&stem)).await;

        Self::write_atomic(&self.body_path(&stem), &response.body).await?;

        let meta = EntryMeta {
            key: key.to_string(),
            content_type: response.content_type,
            size: response.body.len() as u64,
            stored_at: response.stored_at,
        };
        let encoded = serde_json::to_vec(&meta)
            .map_err(|e| BridgeError::OperationFailed(format!("Encode cache sidecar: {}", e)))?;
        Self::write_atomic(&self.meta_path(&stem), &encoded).await?;

        debug!(key, size = meta.size, "Stored cache entry");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let stem = Self::entry_stem(key);
        let existed = match fs::remove_file(self.meta_path(&stem)).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(BridgeError::Io(e)),
        };
        match fs::remove_file(self.body_path(&stem)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(BridgeError::Io(e)),
        }
        Ok(existed)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut read_dir = match fs::read_dir(&self.dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(META_EXT) {
                continue;
            }
            if let Some(meta) = Self::read_meta(&path).await? {
                keys.push(meta.key);
            }
        }

        debug!(path = ?self.dir, count = keys.len(), "Listed cache keys");
        Ok(keys)
    }
}
