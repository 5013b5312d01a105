//! # Prefetch Configuration
//!
//! Retry policies per priority, the stream-to-cache handoff deadline, and
//! the naming of persisted entries.

use crate::error::{PlaybackError, Result};
use crate::prefetch::Priority;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry, backoff and timeout policy for one priority class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles for every further retry.
    pub base_delay: Duration,
    /// Budget for a single attempt, body included.
    pub attempt_timeout: Duration,
}

impl FetchPolicy {
    /// User-initiated playback: 3 attempts, 1s/2s backoff, 30s per attempt.
    pub const fn high() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1000),
            attempt_timeout: Duration::from_secs(30),
        }
    }

    /// Background continuation: one attempt with a longer window.
    pub const fn low() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(1000),
            attempt_timeout: Duration::from_secs(60),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` (zero-based): `base_delay * 2^retry`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Prefetch engine and handoff configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// How long a fresh selection waits for a cached copy at high priority
    /// before falling back to a low-priority continuation.
    ///
    /// Default: 3 seconds.
    #[serde(default = "default_handoff_deadline")]
    pub handoff_deadline: Duration,

    #[serde(default = "FetchPolicy::high")]
    pub high: FetchPolicy,

    #[serde(default = "FetchPolicy::low")]
    pub low: FetchPolicy,

    /// Keep waiting at low priority once the deadline passes.
    ///
    /// Default: true.
    #[serde(default = "default_background_continuation")]
    pub background_continuation: bool,

    /// Persistent cache bucket name.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Prefix of persisted entry keys; the encoded identifier follows a `/`.
    #[serde(default = "default_cache_key_prefix")]
    pub cache_key_prefix: String,

    /// Content type recorded when the server sends none.
    #[serde(default = "default_fallback_content_type")]
    pub fallback_content_type: String,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            handoff_deadline: default_handoff_deadline(),
            high: FetchPolicy::high(),
            low: FetchPolicy::low(),
            background_continuation: default_background_continuation(),
            cache_name: default_cache_name(),
            cache_key_prefix: default_cache_key_prefix(),
            fallback_content_type: default_fallback_content_type(),
        }
    }
}

impl PrefetchConfig {
    pub fn policy(&self, priority: Priority) -> &FetchPolicy {
        match priority {
            Priority::High => &self.high,
            Priority::Low => &self.low,
        }
    }

    pub fn with_handoff_deadline(mut self, deadline: Duration) -> Self {
        self.handoff_deadline = deadline;
        self
    }

    pub fn with_policy(mut self, priority: Priority, policy: FetchPolicy) -> Self {
        match priority {
            Priority::High => self.high = policy,
            Priority::Low => self.low = policy,
        }
        self
    }

    pub fn with_background_continuation(mut self, enabled: bool) -> Self {
        self.background_continuation = enabled;
        self
    }

    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    pub fn with_cache_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_key_prefix = prefix.into();
        self
    }

    pub fn with_fallback_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.fallback_content_type = content_type.into();
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.handoff_deadline.is_zero() {
            return Err(PlaybackError::InvalidConfig(
                "handoff_deadline must be > 0".to_string(),
            ));
        }

        for (name, policy) in [("high", &self.high), ("low", &self.low)] {
            if policy.attempt_timeout.is_zero() {
                return Err(PlaybackError::InvalidConfig(format!(
                    "{} priority attempt_timeout must be > 0",
                    name
                )));
            }
            if policy.max_retries > 10 {
                return Err(PlaybackError::InvalidConfig(format!(
                    "{} priority max_retries cannot exceed 10",
                    name
                )));
            }
        }

        if self.cache_name.trim().is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "cache_name cannot be empty".to_string(),
            ));
        }

        if self.cache_key_prefix.ends_with('/') {
            return Err(PlaybackError::InvalidConfig(
                "cache_key_prefix must not end with '/'".to_string(),
            ));
        }

        if !self.fallback_content_type.contains('/') {
            return Err(PlaybackError::InvalidConfig(format!(
                "fallback_content_type '{}' is not a media type",
                self.fallback_content_type
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_handoff_deadline() -> Duration {
    Duration::from_secs(3)
}

fn default_background_continuation() -> bool {
    true
}

fn default_cache_name() -> String {
    core_runtime::config::DEFAULT_CACHE_NAME.to_string()
}

fn default_cache_key_prefix() -> String {
    "/cache".to_string()
}

fn default_fallback_content_type() -> String {
    "audio/mpeg".to_string()
}
