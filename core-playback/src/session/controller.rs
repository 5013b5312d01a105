//! # Playback Session Controller
//!
//! Owns the host media element and drives the stream-then-swap cycle:
//!
//! 1. A selected item with a persisted copy plays from that copy.
//! 2. Otherwise the remote address starts playing at once, and a
//!    high-priority prefetch is raced against the handoff deadline.
//! 3. A copy that arrives in time replaces the stream with position,
//!    play state and volume carried over.
//! 4. After the deadline the prefetch is re-issued at low priority. The
//!    registry attaches it to the running transfer, and a late copy is
//!    swapped in only if the same address is still playing.
//!
//! Staleness is detected by comparing the active source with the address
//! the prefetch was started for. Results for anything else are dropped and
//! their handles released.

use super::queue::{RandomSource, ThreadRngSource, TrackQueue};
use super::state::{PendingRestore, SessionPhase, SessionSnapshot, SessionState};
use crate::config::PrefetchConfig;
use crate::error::{PlaybackError, Result};
use crate::handle::LocalPlayableReference;
use crate::item::{ItemId, MediaItem, RemoteAddress, StreamEndpoint};
use crate::prefetch::{PendingFetch, PrefetchCoordinator, Priority};
use bridge_traits::media::{MediaElement, MediaEvent, ObjectUrlStore};
use core_async::future::{race_deadline, Raced};
use core_async::sync::CancellationToken;
use core_async::task::{self, JoinHandle};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use futures::future::{self, Either};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Distance in seconds below which a restored position is left alone.
const RESTORE_TOLERANCE_SECS: f64 = 0.25;

/// Result of a selection.
#[derive(Debug)]
pub enum SelectionOutcome {
    /// Playing a persisted copy; no network transfer was started.
    Cached { item_id: ItemId },
    /// Streaming the remote address with a handoff in progress.
    Streaming {
        item_id: ItemId,
        handoff: HandoffTask,
    },
    /// A newer selection took over before this one started playing.
    Superseded { item_id: ItemId },
}

impl SelectionOutcome {
    pub fn item_id(&self) -> &ItemId {
        match self {
            SelectionOutcome::Cached { item_id }
            | SelectionOutcome::Streaming { item_id, .. }
            | SelectionOutcome::Superseded { item_id } => item_id,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, SelectionOutcome::Cached { .. })
    }

    pub fn into_handoff(self) -> Option<HandoffTask> {
        match self {
            SelectionOutcome::Streaming { handoff, .. } => Some(handoff),
            _ => None,
        }
    }
}

/// How a stream-to-cache handoff ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffOutcome {
    /// The local copy replaced the stream.
    Swapped { late: bool },
    /// The prefetch produced nothing; streaming continues.
    NoCopy,
    /// The copy arrived for an item that is no longer playing.
    Discarded,
    /// Stopped waiting: deadline passed without continuation, or the
    /// session was disposed.
    Abandoned,
}

/// Background handoff for one selection.
#[derive(Debug)]
pub struct HandoffTask(JoinHandle<HandoffOutcome>);

impl HandoffTask {
    pub async fn wait(self) -> HandoffOutcome {
        self.0.await.unwrap_or(HandoffOutcome::Abandoned)
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

struct SessionInner {
    element: Arc<dyn MediaElement>,
    coordinator: PrefetchCoordinator,
    endpoint: StreamEndpoint,
    object_urls: Arc<dyn ObjectUrlStore>,
    config: PrefetchConfig,
    random: Arc<dyn RandomSource>,
    event_bus: EventBus,
    // Lock order: queue before state. Neither is held across an await.
    queue: Mutex<TrackQueue>,
    state: Mutex<SessionState>,
    cancel: CancellationToken,
}

/// Playback session over one host media element.
///
/// Cheap to clone; clones drive the same session.
#[derive(Clone)]
pub struct PlaybackSessionController {
    inner: Arc<SessionInner>,
}

impl PlaybackSessionController {
    pub fn new(
        element: Arc<dyn MediaElement>,
        coordinator: PrefetchCoordinator,
        endpoint: StreamEndpoint,
        config: PrefetchConfig,
        event_bus: EventBus,
    ) -> Self {
        Self::with_random_source(
            element,
            coordinator,
            endpoint,
            config,
            event_bus,
            Arc::new(ThreadRngSource),
        )
    }

    /// Like [`new`](Self::new) with an explicit shuffle source.
    pub fn with_random_source(
        element: Arc<dyn MediaElement>,
        coordinator: PrefetchCoordinator,
        endpoint: StreamEndpoint,
        config: PrefetchConfig,
        event_bus: EventBus,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let object_urls = Arc::clone(coordinator.store().object_urls());
        let volume = element.volume();
        Self {
            inner: Arc::new(SessionInner {
                element,
                coordinator,
                endpoint,
                object_urls,
                config,
                random,
                event_bus,
                queue: Mutex::new(TrackQueue::default()),
                state: Mutex::new(SessionState {
                    volume,
                    ..SessionState::default()
                }),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn coordinator(&self) -> &PrefetchCoordinator {
        &self.inner.coordinator
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(PlaybackError::Disposed);
        }
        Ok(())
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.inner.event_bus.emit(CoreEvent::Playback(event));
    }

    // ------------------------------------------------------------------
    // Track list
    // ------------------------------------------------------------------

    /// Replaces the track list. The current item keeps playing and is
    /// re-located in the new list by identifier.
    pub fn set_items(&self, items: Vec<MediaItem>) {
        let mut queue = self.inner.queue.lock();
        queue.set_items(items);
        let mut state = self.inner.state.lock();
        state.current_global = state
            .current_item
            .as_ref()
            .and_then(|id| queue.items().iter().position(|item| &item.id == id));
    }

    pub fn items(&self) -> Vec<MediaItem> {
        self.inner.queue.lock().items().to_vec()
    }

    pub fn set_filter(&self, query: impl Into<String>) {
        self.inner.queue.lock().set_filter(query);
    }

    /// Items currently visible through the search filter.
    pub fn visible_items(&self) -> Vec<MediaItem> {
        self.inner.queue.lock().view().cloned().collect()
    }

    pub fn set_shuffle(&self, shuffle: bool) {
        self.inner.state.lock().shuffle = shuffle;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let queue = self.inner.queue.lock();
        let state = self.inner.state.lock();
        let view_index = state
            .current_global
            .and_then(|global| queue.view_index_of(global));
        state.snapshot(view_index)
    }

    // ------------------------------------------------------------------
    // Selection and handoff
    // ------------------------------------------------------------------

    /// Selects the item at `view_index` of the filtered view and starts
    /// playing it.
    #[instrument(skip(self))]
    pub async fn select(&self, view_index: usize) -> Result<SelectionOutcome> {
        self.ensure_live()?;
        let (global, item) = {
            let queue = self.inner.queue.lock();
            let global = queue
                .global_index(view_index)
                .ok_or(PlaybackError::IndexOutOfRange {
                    index: view_index,
                    len: queue.view_len(),
                })?;
            let item = queue
                .item(global)
                .cloned()
                .ok_or(PlaybackError::IndexOutOfRange {
                    index: view_index,
                    len: queue.view_len(),
                })?;
            (global, item)
        };
        self.activate(global, item, view_index).await
    }

    async fn activate(
        &self,
        global: usize,
        item: MediaItem,
        view_index: usize,
    ) -> Result<SelectionOutcome> {
        let item_id = item.id.clone();
        let address = self.inner.endpoint.address_for(&item_id);
        let selection = {
            let mut state = self.inner.state.lock();
            state.selection += 1;
            state.current_global = Some(global);
            state.current_item = Some(item_id.clone());
            state.pending_restore = None;
            state.selection
        };

        let cached = self.inner.coordinator.store().get(&item_id).await;
        let from_cache = cached.is_some();
        let reference = cached.unwrap_or_else(|| LocalPlayableReference::Remote(address.clone()));

        let previous = {
            let mut state = self.inner.state.lock();
            if state.selection != selection || self.is_disposed() {
                None
            } else {
                let element = &self.inner.element;
                element.pause();
                element.set_src(reference.src());
                element.load();
                state.phase = if from_cache {
                    SessionPhase::StreamingFromCache
                } else {
                    SessionPhase::Streaming
                };
                state.position = 0.0;
                state.duration = None;
                Some(state.active.replace(reference.clone()))
            }
        };

        let Some(previous) = previous else {
            debug!(item_id = %item_id, "Selection superseded before playback");
            reference.release(self.inner.object_urls.as_ref());
            return Ok(SelectionOutcome::Superseded { item_id });
        };
        if let Some(previous) = previous {
            previous.release(self.inner.object_urls.as_ref());
        }

        info!(item_id = %item_id, from_cache, "Track selected");
        self.emit(PlaybackEvent::TrackChanged {
            item_id: item_id.to_string(),
            title: item.title.clone(),
            index: view_index,
            from_cache,
        });

        if from_cache {
            self.start_playback(&item_id).await;
            return Ok(SelectionOutcome::Cached { item_id });
        }

        // Registered before the first suspension point of the streaming
        // path so a concurrent request for the same item joins it.
        let pending = self
            .inner
            .coordinator
            .prefetch(&item_id, &address, Priority::High);
        self.start_playback(&item_id).await;

        let handoff = HandoffTask(task::spawn(self.clone().hand_off(pending, address)));
        Ok(SelectionOutcome::Streaming { item_id, handoff })
    }

    async fn start_playback(&self, item_id: &ItemId) {
        match self.inner.element.play().await {
            Ok(()) => {
                self.inner.state.lock().is_playing = true;
                self.emit(PlaybackEvent::Started {
                    item_id: item_id.to_string(),
                });
            }
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "Media element refused to play");
                self.inner.state.lock().is_playing = false;
                self.emit(PlaybackEvent::Error {
                    item_id: Some(item_id.to_string()),
                    message: e.to_string(),
                    recoverable: true,
                });
            }
        }
    }

    #[instrument(skip(self, pending), fields(item_id = %pending.item_id()))]
    async fn hand_off(self, pending: PendingFetch, address: RemoteAddress) -> HandoffOutcome {
        let item_id = pending.item_id().clone();

        match race_deadline(self.inner.config.handoff_deadline, Box::pin(pending.resolve())).await
        {
            Raced::Completed(copy) => return self.apply_copy(&item_id, &address, copy, false).await,
            Raced::DeadlineElapsed(_still_running) => {}
        }

        if !self.inner.config.background_continuation || self.is_disposed() {
            debug!("Handoff deadline passed, staying on the stream");
            return HandoffOutcome::Abandoned;
        }

        debug!("Handoff deadline passed, continuing at low priority");
        let continuation = self
            .inner
            .coordinator
            .prefetch(&item_id, &address, Priority::Low);
        let cancelled = self.inner.cancel.clone();
        let waited = future::select(
            Box::pin(continuation.resolve()),
            Box::pin(cancelled.cancelled_owned()),
        )
        .await;

        match waited {
            Either::Left((copy, _)) => self.apply_copy(&item_id, &address, copy, true).await,
            Either::Right(_) => {
                debug!("Session disposed while waiting for a late copy");
                HandoffOutcome::Abandoned
            }
        }
    }

    /// Swaps `copy` in if `address` is still the active stream.
    async fn apply_copy(
        &self,
        item_id: &ItemId,
        address: &RemoteAddress,
        copy: Option<LocalPlayableReference>,
        late: bool,
    ) -> HandoffOutcome {
        let Some(reference) = copy else {
            debug!(item_id = %item_id, "No local copy, streaming continues");
            return HandoffOutcome::NoCopy;
        };

        let swapped = {
            let mut state = self.inner.state.lock();
            let still_streaming = state
                .active
                .as_ref()
                .map_or(false, |active| active.is_streaming(address));

            if self.is_disposed() || !still_streaming {
                None
            } else {
                state.phase = SessionPhase::Swapping;
                let element = &self.inner.element;
                let position = element.current_time();
                let was_playing = !element.is_paused();
                let volume = element.volume();

                element.pause();
                element.set_src(reference.src());
                element.load();
                element.set_current_time(position);
                element.set_volume(volume);

                state.position = position;
                state.volume = volume;
                state.pending_restore = Some(PendingRestore {
                    position,
                    play: was_playing,
                });
                let previous = state.active.replace(reference.clone());
                Some((position, was_playing, state.selection, previous))
            }
        };

        let Some((position, was_playing, selection, previous)) = swapped else {
            debug!(item_id = %item_id, "Discarding copy for an item no longer playing");
            reference.release(self.inner.object_urls.as_ref());
            return HandoffOutcome::Discarded;
        };
        if let Some(previous) = previous {
            previous.release(self.inner.object_urls.as_ref());
        }

        if was_playing {
            if let Err(e) = self.inner.element.play().await {
                warn!(item_id = %item_id, error = %e, "Resume after swap failed");
            }
        }

        {
            let mut state = self.inner.state.lock();
            if state.selection == selection && state.phase == SessionPhase::Swapping {
                state.phase = SessionPhase::StreamingFromCache;
            }
        }

        info!(item_id = %item_id, position, late, "Swapped to local copy");
        self.emit(PlaybackEvent::SourceSwapped {
            item_id: item_id.to_string(),
            position_ms: secs_to_millis(position),
            late,
        });
        HandoffOutcome::Swapped { late }
    }

    // ------------------------------------------------------------------
    // Advance
    // ------------------------------------------------------------------

    /// Moves to the next item: random over the full list in shuffle mode,
    /// `(current + 1) mod len` otherwise. An item hidden by the filter
    /// resolves to view index 0.
    pub async fn next(&self) -> Result<Option<SelectionOutcome>> {
        self.ensure_live()?;
        let target = {
            let queue = self.inner.queue.lock();
            let state = self.inner.state.lock();
            if queue.view_len() == 0 {
                None
            } else {
                queue
                    .next_global(state.current_global, state.shuffle, self.inner.random.as_ref())
                    .map(|global| queue.resolve_in_view(global))
            }
        };
        match target {
            Some(view_index) => self.select(view_index).await.map(Some),
            None => Ok(None),
        }
    }

    /// Sequential mirror of [`next`](Self::next).
    pub async fn previous(&self) -> Result<Option<SelectionOutcome>> {
        self.ensure_live()?;
        let target = {
            let queue = self.inner.queue.lock();
            let state = self.inner.state.lock();
            if queue.view_len() == 0 {
                None
            } else {
                queue
                    .previous_global(state.current_global)
                    .map(|global| queue.resolve_in_view(global))
            }
        };
        match target {
            Some(view_index) => self.select(view_index).await.map(Some),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Transport controls
    // ------------------------------------------------------------------

    fn current_item(&self) -> Result<ItemId> {
        let state = self.inner.state.lock();
        match (&state.active, &state.current_item) {
            (Some(_), Some(id)) => Ok(id.clone()),
            _ => Err(PlaybackError::NothingSelected),
        }
    }

    pub async fn play(&self) -> Result<()> {
        self.ensure_live()?;
        let item_id = self.current_item()?;
        self.inner.element.play().await?;
        let position = {
            let mut state = self.inner.state.lock();
            state.is_playing = true;
            if let Some(restore) = state.pending_restore.as_mut() {
                restore.play = true;
            }
            state.position
        };
        self.emit(PlaybackEvent::Resumed {
            item_id: item_id.to_string(),
            position_ms: secs_to_millis(position),
        });
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.ensure_live()?;
        let item_id = self.current_item()?;
        self.inner.element.pause();
        let position = self.inner.element.current_time();
        {
            let mut state = self.inner.state.lock();
            state.is_playing = false;
            state.position = position;
            // a reload still pending must not resume what the user paused
            if let Some(restore) = state.pending_restore.as_mut() {
                restore.play = false;
            }
        }
        self.emit(PlaybackEvent::Paused {
            item_id: item_id.to_string(),
            position_ms: secs_to_millis(position),
        });
        Ok(())
    }

    pub async fn toggle_play(&self) -> Result<()> {
        let playing = self.inner.state.lock().is_playing;
        if playing {
            self.pause()
        } else {
            self.play().await
        }
    }

    /// Seeks to `seconds`, clamped to the known duration.
    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.ensure_live()?;
        let item_id = self.current_item()?;
        let position = {
            let mut state = self.inner.state.lock();
            let upper = state
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .unwrap_or(f64::MAX);
            let position = if seconds.is_finite() {
                seconds.clamp(0.0, upper)
            } else {
                0.0
            };
            self.inner.element.set_current_time(position);
            state.position = position;
            state.pending_restore = None;
            position
        };
        self.emit(PlaybackEvent::PositionChanged {
            item_id: item_id.to_string(),
            position_ms: secs_to_millis(position),
        });
        Ok(())
    }

    pub fn set_volume(&self, volume: f64) -> Result<()> {
        self.ensure_live()?;
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.inner.element.set_volume(volume);
        self.inner.state.lock().volume = volume;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Media element events
    // ------------------------------------------------------------------

    /// Feeds one host media event into the session.
    pub async fn handle_media_event(&self, event: MediaEvent) -> Result<()> {
        if self.is_disposed() {
            return Ok(());
        }
        let item_id = self.inner.state.lock().current_item.clone();

        match event {
            MediaEvent::LoadedMetadata => {
                let duration = self.inner.element.duration();
                let restore = {
                    let mut state = self.inner.state.lock();
                    state.duration = duration;
                    state.pending_restore.take()
                };
                if let (Some(id), Some(duration)) = (&item_id, duration) {
                    self.emit(PlaybackEvent::DurationChanged {
                        item_id: id.to_string(),
                        duration_ms: secs_to_millis(duration),
                    });
                }
                if let Some(restore) = restore {
                    self.restore(restore).await;
                }
            }
            MediaEvent::TimeUpdate => {
                let position = self.inner.element.current_time();
                self.inner.state.lock().position = position;
                if let Some(id) = item_id {
                    self.emit(PlaybackEvent::PositionChanged {
                        item_id: id.to_string(),
                        position_ms: secs_to_millis(position),
                    });
                }
            }
            MediaEvent::Ended => {
                self.inner.state.lock().is_playing = false;
                if let Some(id) = item_id {
                    self.emit(PlaybackEvent::Completed {
                        item_id: id.to_string(),
                    });
                }
                self.next().await?;
            }
            MediaEvent::Emptied => {
                let mut state = self.inner.state.lock();
                state.position = 0.0;
                state.duration = None;
            }
            MediaEvent::Error(message) => {
                warn!(?item_id, %message, "Media element error");
                self.emit(PlaybackEvent::Error {
                    item_id: item_id.map(|id| id.to_string()),
                    message,
                    recoverable: true,
                });
            }
        }
        Ok(())
    }

    /// Re-applies position and play state lost by a source reload.
    async fn restore(&self, restore: PendingRestore) {
        let element = &self.inner.element;
        if (element.current_time() - restore.position).abs() > RESTORE_TOLERANCE_SECS {
            element.set_current_time(restore.position);
        }
        if restore.play && element.is_paused() {
            if let Err(e) = element.play().await {
                warn!(error = %e, "Resume after reload failed");
            }
        }
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Tears the session down.
    ///
    /// Pending handoffs stop waiting, the active handle is released and the
    /// in-flight registry is cleared. Transfers already running still
    /// finish and persist their copy.
    #[instrument(skip(self))]
    pub fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        self.inner.cancel.cancel();

        let active = {
            let mut state = self.inner.state.lock();
            state.phase = SessionPhase::Idle;
            state.is_playing = false;
            state.pending_restore = None;
            state.active.take()
        };

        let element = &self.inner.element;
        element.pause();
        element.set_src("");
        element.load();
        if let Some(active) = active {
            active.release(self.inner.object_urls.as_ref());
        }

        let cleared = self.inner.coordinator.clear_all();
        info!(cleared, "Playback session disposed");
    }
}

fn secs_to_millis(seconds: f64) -> u64 {
    core_async::time::secs_f64_to_duration(seconds).as_millis() as u64
}
