//! Session state and its public snapshot.

use crate::handle::LocalPlayableReference;
use crate::item::ItemId;
use serde::{Deserialize, Serialize};

/// Where the session is in the stream-then-swap cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Nothing selected, or the session was disposed.
    Idle,
    /// Playing the remote address.
    Streaming,
    /// Replacing the stream with a local copy.
    Swapping,
    /// Playing a local copy.
    StreamingFromCache,
}

/// Point-in-time view of the session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub current_item: Option<ItemId>,
    /// Position of the current item in the filtered view.
    pub view_index: Option<usize>,
    /// Position of the current item in the full list.
    pub global_index: Option<usize>,
    pub is_playing: bool,
    /// Seconds.
    pub position: f64,
    /// Seconds, once metadata is known.
    pub duration: Option<f64>,
    pub shuffle: bool,
    pub volume: f64,
    /// Source assigned to the media element.
    pub src: Option<String>,
}

/// Position and play state to re-apply once a swapped source has loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PendingRestore {
    pub position: f64,
    pub play: bool,
}

#[derive(Debug)]
pub(crate) struct SessionState {
    pub current_global: Option<usize>,
    pub current_item: Option<ItemId>,
    pub active: Option<LocalPlayableReference>,
    pub is_playing: bool,
    pub position: f64,
    pub duration: Option<f64>,
    pub shuffle: bool,
    pub volume: f64,
    pub phase: SessionPhase,
    pub pending_restore: Option<PendingRestore>,
    /// Bumped on every selection; an async step that resumes under a
    /// different value belongs to a superseded selection.
    pub selection: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_global: None,
            current_item: None,
            active: None,
            is_playing: false,
            position: 0.0,
            duration: None,
            shuffle: false,
            volume: 1.0,
            phase: SessionPhase::Idle,
            pending_restore: None,
            selection: 0,
        }
    }
}

impl SessionState {
    pub fn snapshot(&self, view_index: Option<usize>) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            current_item: self.current_item.clone(),
            view_index,
            global_index: self.current_global,
            is_playing: self.is_playing,
            position: self.position,
            duration: self.duration,
            shuffle: self.shuffle,
            volume: self.volume,
            src: self.active.as_ref().map(|r| r.src().to_string()),
        }
    }
}
