//! # Local Playable References
//!
//! What the host media element is pointed at: either a process-local object
//! handle over cached bytes, or the remote address itself. Object handles
//! are owned by whoever last assigned them and must be released through the
//! [`ObjectUrlStore`] that minted them.

use crate::item::RemoteAddress;
use bridge_traits::media::ObjectUrlStore;
use std::fmt;

/// Handle minted by an [`ObjectUrlStore`] for a cached blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle(String);

impl ObjectHandle {
    pub(crate) fn new(url: String) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalPlayableReference {
    /// Cached copy behind an object handle.
    Local(ObjectHandle),
    /// Live stream, no local copy yet.
    Remote(RemoteAddress),
}

impl LocalPlayableReference {
    /// Value assigned to the media element's source.
    pub fn src(&self) -> &str {
        match self {
            LocalPlayableReference::Local(handle) => handle.as_str(),
            LocalPlayableReference::Remote(address) => address.as_str(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, LocalPlayableReference::Local(_))
    }

    /// `true` if this is the live stream of `address`.
    pub fn is_streaming(&self, address: &RemoteAddress) -> bool {
        matches!(self, LocalPlayableReference::Remote(current) if current == address)
    }

    /// Revokes the object handle. Remote references hold nothing to free.
    pub fn release(&self, object_urls: &dyn ObjectUrlStore) {
        if let LocalPlayableReference::Local(handle) = self {
            object_urls.revoke_object_url(handle.as_str());
        }
    }
}
