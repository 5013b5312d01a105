//! Prefetch demonstration
//!
//! Streams one item through a headless media element, swaps to the cached
//! copy once it lands, and prints the core events along the way.
//!
//! Run with:
//! ```bash
//! cargo run -p core-service --example prefetch_demo -- https://media.example/api/stream track.mp3
//!
//! # JSON logs
//! cargo run -p core-service --example prefetch_demo -- https://media.example/api/stream track.mp3 json
//! ```

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::logging::LogLevel;
use bridge_traits::media::MediaElement;
use core_playback::MediaItem;
use core_runtime::config::CoreConfig;
use core_runtime::events::EventSeverity;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::MediaCore;
use parking_lot::Mutex;
use std::env;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Media element that only tracks state and logs what it is told.
#[derive(Default)]
struct HeadlessElement {
    src: Mutex<String>,
    paused: Mutex<bool>,
    time: Mutex<f64>,
}

#[async_trait]
impl MediaElement for HeadlessElement {
    async fn play(&self) -> BridgeResult<()> {
        *self.paused.lock() = false;
        info!(src = %self.src.lock(), "element: play");
        Ok(())
    }
    fn pause(&self) {
        *self.paused.lock() = true;
    }
    fn is_paused(&self) -> bool {
        *self.paused.lock()
    }
    fn current_time(&self) -> f64 {
        *self.time.lock()
    }
    fn set_current_time(&self, seconds: f64) {
        *self.time.lock() = seconds;
    }
    fn duration(&self) -> Option<f64> {
        None
    }
    fn volume(&self) -> f64 {
        1.0
    }
    fn set_volume(&self, _volume: f64) {}
    fn src(&self) -> String {
        self.src.lock().clone()
    }
    fn set_src(&self, src: &str) {
        info!(%src, "element: source assigned");
        *self.src.lock() = src.to_string();
        *self.time.lock() = 0.0;
    }
    fn load(&self) {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: prefetch_demo <stream-base-url> <item-id> [pretty|json|compact]");
        std::process::exit(2);
    }

    let format = match args.get(3).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Debug),
    )?;

    let config = CoreConfig::builder().stream_base_url(&args[1]).build()?;
    let element = Arc::new(HeadlessElement::default());
    let core = MediaCore::new(config, element.clone())?;

    let mut events = core.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.severity() {
                EventSeverity::Debug => debug!(event = event.description(), "core event"),
                EventSeverity::Info => info!(event = event.description(), "core event"),
                EventSeverity::Warning | EventSeverity::Error => {
                    warn!(event = event.description(), payload = ?event, "core event")
                }
            }
        }
    });

    let session = core.session();
    session.set_items(vec![MediaItem::from_id(args[2].as_str())]);

    let outcome = session.select(0).await?;
    if let Some(handoff) = outcome.into_handoff() {
        let result = handoff.wait().await;
        info!(?result, "Handoff finished");
    }
    let cached = core.cached_items().await;
    info!(src = %element.src(), ?cached, "Done");

    core.shutdown();
    Ok(())
}
