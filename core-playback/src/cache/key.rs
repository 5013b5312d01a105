//! Cache key derivation.

use crate::item::ItemId;

/// Maps identifiers to persisted entry keys and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyScheme {
    prefix: String,
}

impl CacheKeyScheme {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `<prefix>/<percent-encoded id>`
    pub fn key_for(&self, id: &ItemId) -> String {
        format!("{}/{}", self.prefix, id.encoded())
    }

    /// Recovers the identifier from a key produced by [`key_for`](Self::key_for).
    /// Keys from other schemes yield `None`.
    pub fn item_for(&self, key: &str) -> Option<ItemId> {
        let encoded = key.strip_prefix(&self.prefix)?.strip_prefix('/')?;
        if encoded.is_empty() {
            return None;
        }
        urlencoding::decode(encoded)
            .ok()
            .map(|decoded| ItemId::new(decoded.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips_through_identifier() {
        let scheme = CacheKeyScheme::new("/cache");
        let id = ItemId::new("Live/Set 2 (encore).ogg");
        let key = scheme.key_for(&id);
        assert_eq!(key, "/cache/Live%2FSet%202%20%28encore%29.ogg");
        assert_eq!(scheme.item_for(&key), Some(id));
    }

    #[test]
    fn foreign_keys_are_ignored() {
        let scheme = CacheKeyScheme::new("/cache");
        assert_eq!(scheme.item_for("/other/x"), None);
        assert_eq!(scheme.item_for("/cache"), None);
        assert_eq!(scheme.item_for("/cache/"), None);
        assert_eq!(scheme.item_for("/cachex/y"), None);
    }
}
