//! # Playback Error Types
//!
//! Two families live here. [`FetchError`] classifies a single network
//! attempt and drives the retry decision; it never escapes the prefetch
//! engine. [`PlaybackError`] is what session callers can see: misuse of the
//! session API and failures reported by the host media element.

use bridge_traits::BridgeError;
use std::time::Duration;
use thiserror::Error;

/// Outcome class of one fetch attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The remote store does not know the item. Retrying cannot help.
    #[error("Item not found at {url}")]
    NotFound { url: String },

    /// Any other non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Connection, TLS or body transfer failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The attempt exceeded its time budget.
    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    /// Returns `true` if another attempt may succeed.
    ///
    /// Only a 404 is final; timeouts are retried exactly like transport
    /// failures.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::NotFound { .. })
    }
}

impl From<BridgeError> for FetchError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout => FetchError::Timeout(Duration::ZERO),
            other => FetchError::Transport(other.to_string()),
        }
    }
}

/// Terminal result of a fetch that ran out of attempts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Gave up after {attempts} attempt(s): {last_error}")]
pub struct FetchFailure {
    pub attempts: u32,
    pub last_error: FetchError,
}

/// Errors surfaced by the playback session.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The requested position is outside the filtered view.
    #[error("Index {index} out of range for {len} item(s)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A transport control was used before any item was selected.
    #[error("No item selected")]
    NothingSelected,

    /// Volume must be within `0.0..=1.0`.
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f64),

    /// The session was torn down.
    #[error("Playback session disposed")]
    Disposed,

    /// Rejected configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The host media element refused an operation.
    #[error("Media element error: {0}")]
    Media(#[from] BridgeError),
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
