//! # Media Items and Addresses
//!
//! An [`ItemId`] is an opaque key naming a media item in the remote store.
//! Every address or key derived from it goes through the same percent
//! encoding, so one identifier always maps to one stream URL and one cache
//! entry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable identifier of a remote media item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form used inside URLs and cache keys.
    pub fn encoded(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// URL from which the full item can be fetched or streamed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteAddress(String);

impl RemoteAddress {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives remote addresses from identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    base: String,
}

impl StreamEndpoint {
    /// Trailing slashes on `base` are ignored.
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `<base>/<percent-encoded id>`
    pub fn address_for(&self, id: &ItemId) -> RemoteAddress {
        RemoteAddress(format!("{}/{}", self.base, id.encoded()))
    }
}

/// An entry of the track list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: ItemId,
    pub title: String,
}

impl MediaItem {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// Uses the identifier as the display title.
    pub fn from_id(id: impl Into<ItemId>) -> Self {
        let id = id.into();
        let title = id.as_str().to_string();
        Self { id, title }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_encodes_identifier() {
        let endpoint = StreamEndpoint::new("https://media.example/api/stream/");
        let address = endpoint.address_for(&ItemId::new("albums/Side A/01 intro.mp3"));
        assert_eq!(
            address.as_str(),
            "https://media.example/api/stream/albums%2FSide%20A%2F01%20intro.mp3"
        );
    }

    #[test]
    fn same_identifier_same_address() {
        let endpoint = StreamEndpoint::new("https://media.example/stream");
        let id = ItemId::from("a&b?.flac");
        assert_eq!(endpoint.address_for(&id), endpoint.address_for(&id.clone()));
        assert!(!endpoint.address_for(&id).as_str().contains('?'));
    }

    #[test]
    fn item_from_id_uses_identifier_as_title() {
        let item = MediaItem::from_id("track.mp3");
        assert_eq!(item.title, "track.mp3");
        assert_eq!(item.id.to_string(), "track.mp3");
    }
}
