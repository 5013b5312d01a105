//! Media element and object-handle bridge traits.
//!
//! The host owns the actual audio element. The core only drives it through
//! [`MediaElement`] and observes it through [`MediaEvent`]s that the host
//! forwards. Local copies of cached blobs are exposed to the element as
//! short-lived object handles minted by an [`ObjectUrlStore`].

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Events the host forwards from its media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Duration and dimensions are known; seeking is now possible.
    LoadedMetadata,
    /// Playback position advanced.
    TimeUpdate,
    /// Playback reached the end of the current source.
    Ended,
    /// The element dropped its source.
    Emptied,
    /// The element failed to load or decode its source.
    Error(String),
}

/// A host-owned audio element.
///
/// Positions and durations are in seconds, volume is in `0.0..=1.0`,
/// mirroring the host element's own units.
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Start or resume playback. Fails when the host refuses autoplay or the
    /// source cannot be played.
    async fn play(&self) -> Result<()>;

    fn pause(&self);

    fn is_paused(&self) -> bool;

    fn current_time(&self) -> f64;

    fn set_current_time(&self, seconds: f64);

    /// `None` until metadata has loaded or for unbounded streams.
    fn duration(&self) -> Option<f64>;

    fn volume(&self) -> f64;

    fn set_volume(&self, volume: f64);

    /// Currently assigned source address, empty when none.
    fn src(&self) -> String;

    fn set_src(&self, src: &str);

    /// Reload the element after a source change.
    fn load(&self);
}

/// Mints and revokes object handles for in-memory blobs.
pub trait ObjectUrlStore: Send + Sync {
    /// Create a handle the media element can load `body` from.
    fn create_object_url(&self, body: Bytes, content_type: &str) -> Result<String>;

    /// Release a handle. Revoking an unknown handle is a no-op.
    fn revoke_object_url(&self, url: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_event_error_carries_message() {
        let event = MediaEvent::Error("decode failed".to_string());
        assert_ne!(event, MediaEvent::Ended);
        if let MediaEvent::Error(message) = event {
            assert_eq!(message, "decode failed");
        }
    }
}
