//! Workspace placeholder crate.
//!
//! Exposes feature flags mapping to the individual workspace crates so a host
//! application can depend on `streamcache-workspace` and pick either the full
//! desktop facade (`desktop-shims`, pulls in `core-service`) or just the
//! prefetch/playback engine (`playback-only`, pulls in `core-playback`).

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "playback-only")]
pub use core_playback as playback;
