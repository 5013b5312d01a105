//! Fakes shared by the core-playback integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::{InMemoryObjectUrls, MemoryCacheStorage};
use bridge_traits::cache::CacheStorage;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::media::MediaElement;
use bytes::Bytes;
use core_async::time::{sleep, Duration};
use core_playback::{
    MediaItem, PersistentCacheStore, PlaybackSessionController, PrefetchConfig,
    PrefetchCoordinator, RandomSource, RetryingFetcher, StreamEndpoint,
};
use core_runtime::events::{CoreEvent, EventBus};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use core_async::sync::broadcast::Receiver;

pub const STREAM_BASE: &str = "https://media.example/api/stream";
pub const BODY: &[u8] = b"complete audio file";

// ============================================================================
// HTTP
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Ok,
    Status(u16),
    Transport,
}

/// HTTP client that answers after a fixed delay, following a script and
/// then a fallback reply.
pub struct ScriptedHttp {
    delay: Duration,
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    not_found: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    pub fn ok_after(delay: Duration) -> Self {
        Self::scripted(delay, vec![], Reply::Ok)
    }

    pub fn scripted(delay: Duration, script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            delay,
            script: Mutex::new(script.into()),
            fallback,
            not_found: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// URLs ending in `suffix` always answer 404.
    pub fn not_found_for(mut self, suffix: &str) -> Self {
        self.not_found.push(suffix.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, url_suffix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|url| url.ends_with(url_suffix))
            .count()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.lock().push(request.url.clone());
        sleep(self.delay).await;

        if self.not_found.iter().any(|s| request.url.ends_with(s)) {
            return Ok(HttpResponse::new(404, Bytes::new()));
        }
        let reply = self.script.lock().pop_front().unwrap_or(self.fallback);
        match reply {
            Reply::Ok => Ok(HttpResponse::new(200, Bytes::from_static(BODY))
                .with_header("Content-Type", "audio/mpeg")),
            Reply::Status(status) => Ok(HttpResponse::new(status, Bytes::new())),
            Reply::Transport => Err(BridgeError::OperationFailed("connection reset".into())),
        }
    }
}

// ============================================================================
// Media element
// ============================================================================

#[derive(Debug)]
struct ElementState {
    src: String,
    paused: bool,
    time: f64,
    duration: Option<f64>,
    volume: f64,
    loads: usize,
    metadata_loaded: bool,
    refuse_play: bool,
}

/// In-memory media element. Assigning a source rewinds to 0.
///
/// With `strict_seeking`, seeks before metadata has loaded are ignored,
/// like a real element.
pub struct FakeMediaElement {
    state: Mutex<ElementState>,
    strict_seeking: bool,
}

impl FakeMediaElement {
    pub fn new() -> Self {
        Self::build(false)
    }

    pub fn strict() -> Self {
        Self::build(true)
    }

    fn build(strict_seeking: bool) -> Self {
        Self {
            state: Mutex::new(ElementState {
                src: String::new(),
                paused: true,
                time: 0.0,
                duration: None,
                volume: 1.0,
                loads: 0,
                metadata_loaded: false,
                refuse_play: false,
            }),
            strict_seeking,
        }
    }

    /// Simulates playback progress.
    pub fn advance_to(&self, seconds: f64) {
        self.state.lock().time = seconds;
    }

    /// Marks metadata as loaded with the given duration.
    pub fn finish_loading(&self, duration: f64) {
        let mut state = self.state.lock();
        state.metadata_loaded = true;
        state.duration = Some(duration);
    }

    pub fn refuse_play(&self, refuse: bool) {
        self.state.lock().refuse_play = refuse;
    }

    pub fn loads(&self) -> usize {
        self.state.lock().loads
    }
}

#[async_trait]
impl MediaElement for FakeMediaElement {
    async fn play(&self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        if state.refuse_play {
            return Err(BridgeError::OperationFailed("autoplay blocked".into()));
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&self) {
        self.state.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn current_time(&self) -> f64 {
        self.state.lock().time
    }

    fn set_current_time(&self, seconds: f64) {
        let mut state = self.state.lock();
        if !self.strict_seeking || state.metadata_loaded {
            state.time = seconds;
        }
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    fn set_volume(&self, volume: f64) {
        self.state.lock().volume = volume;
    }

    fn src(&self) -> String {
        self.state.lock().src.clone()
    }

    fn set_src(&self, src: &str) {
        let mut state = self.state.lock();
        state.src = src.to_string();
        state.time = 0.0;
        state.duration = None;
        state.metadata_loaded = false;
    }

    fn load(&self) {
        self.state.lock().loads += 1;
    }
}

// ============================================================================
// Random source
// ============================================================================

/// Always returns the same index.
pub struct FixedRandom(pub usize);

impl RandomSource for FixedRandom {
    fn next_index(&self, upper: usize) -> usize {
        self.0 % upper
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub struct Harness {
    pub session: PlaybackSessionController,
    pub coordinator: PrefetchCoordinator,
    pub store: Arc<PersistentCacheStore>,
    pub element: Arc<FakeMediaElement>,
    pub http: Arc<ScriptedHttp>,
    pub urls: Arc<InMemoryObjectUrls>,
    pub event_bus: EventBus,
}

impl Harness {
    pub fn new(http: ScriptedHttp) -> Self {
        Self::build(
            http,
            FakeMediaElement::new(),
            PrefetchConfig::default(),
            Arc::new(FixedRandom(0)),
        )
    }

    pub fn build(
        http: ScriptedHttp,
        element: FakeMediaElement,
        config: PrefetchConfig,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
        Self::build_with_storage(http, element, config, random, Some(storage))
    }

    pub fn build_with_storage(
        http: ScriptedHttp,
        element: FakeMediaElement,
        config: PrefetchConfig,
        random: Arc<dyn RandomSource>,
        storage: Option<Arc<dyn CacheStorage>>,
    ) -> Self {
        let http = Arc::new(http);
        let urls = Arc::new(InMemoryObjectUrls::new());
        let element = Arc::new(element);
        let event_bus = EventBus::new(256);

        let store = Arc::new(PersistentCacheStore::new(storage, urls.clone(), &config));
        let fetcher = RetryingFetcher::new(http.clone(), &config);
        let coordinator = PrefetchCoordinator::new(store.clone(), fetcher, event_bus.clone());
        let session = PlaybackSessionController::with_random_source(
            element.clone(),
            coordinator.clone(),
            StreamEndpoint::new(STREAM_BASE),
            config,
            event_bus.clone(),
            random,
        );

        Self {
            session,
            coordinator,
            store,
            element,
            http,
            urls,
            event_bus,
        }
    }

    pub fn address(&self, id: &str) -> String {
        format!("{}/{}", STREAM_BASE, urlencoding::encode(id))
    }
}

/// `track-0.mp3` .. `track-{n-1}.mp3`, titled `Track 0` ..
pub fn items(n: usize) -> Vec<MediaItem> {
    (0..n)
        .map(|i| MediaItem::new(format!("track-{}.mp3", i), format!("Track {}", i)))
        .collect()
}

/// Events received so far.
pub fn drain(receiver: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
