//! # Playback Session
//!
//! Track list, search filter, transport controls and the stream-then-swap
//! handoff around a single host media element.

pub mod controller;
pub mod queue;
pub mod state;

pub use controller::{HandoffOutcome, HandoffTask, PlaybackSessionController, SelectionOutcome};
pub use queue::{RandomSource, SeededRandom, ThreadRngSource, TrackQueue};
pub use state::{SessionPhase, SessionSnapshot};
