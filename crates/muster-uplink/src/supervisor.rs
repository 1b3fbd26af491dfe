//! Push feed supervisor
//!
//! Owns the single push channel for a session: connect, pump frames into the
//! store, mirror link liveness into the `connectivity` field, reconnect with
//! a jittered delay, and stop cleanly on teardown. The supervisor is the
//! only writer of `connectivity`.

use futures::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use muster_core::store::FleetStore;
use muster_core::{ConsoleError, Result};

use crate::config::ConsoleConfig;
use crate::dto::FeedFrame;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Where the push link currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Not running
    Idle,
    /// Dialing the backend
    Connecting,
    /// Connected and pumping frames
    Online,
    /// Waiting out the reconnect delay
    Backoff,
}

/// Shared read view of the supervisor's link state
#[derive(Debug, Clone)]
pub struct LinkHandle {
    inner: Arc<parking_lot::RwLock<LinkState>>,
}

impl LinkHandle {
    fn new() -> Self {
        Self {
            inner: Arc::new(parking_lot::RwLock::new(LinkState::Idle)),
        }
    }

    pub fn state(&self) -> LinkState {
        *self.inner.read()
    }

    fn set(&self, state: LinkState) {
        *self.inner.write() = state;
    }
}

enum PumpExit {
    Shutdown,
    Dropped,
}

/// Apply one wire frame to the store
///
/// Frames that arrive after teardown are dropped. A frame that is not JSON
/// is discarded whole; a decodable frame applies field by field, with
/// faults contained to their own field.
pub fn ingest_frame(store: &FleetStore, live: &AtomicBool, text: &str) {
    if !live.load(Ordering::SeqCst) {
        debug!("Dropping frame after teardown");
        return;
    }
    let frame = match FeedFrame::parse(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!("Discarding malformed frame: {}", err);
            return;
        }
    };
    let (update, faults) = frame.decode();
    for fault in &faults {
        warn!("Skipping field {}: {}", fault.field, fault.reason);
    }
    store.reconcile(update);
}

/// Lifecycle owner for the push feed connection
#[derive(Debug)]
pub struct FeedSupervisor {
    url: Url,
    store: Arc<FleetStore>,
    live: Arc<AtomicBool>,
    handle: LinkHandle,
    reconnect_delay: Duration,
}

impl FeedSupervisor {
    pub fn new(
        config: &ConsoleConfig,
        store: Arc<FleetStore>,
        live: Arc<AtomicBool>,
    ) -> Result<Self> {
        let url = Url::parse(&config.feed_url)
            .map_err(|err| ConsoleError::Validation(format!("feed_url: {}", err)))?;
        Ok(Self {
            url,
            store,
            live,
            handle: LinkHandle::new(),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
        })
    }

    /// A handle for observing the link state from outside
    pub fn handle(&self) -> LinkHandle {
        self.handle.clone()
    }

    /// Drive the connection until teardown
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!("Push feed supervisor starting for {}", self.url);
        loop {
            if !self.live.load(Ordering::SeqCst) {
                break;
            }
            self.handle.set(LinkState::Connecting);
            let connected = tokio::select! {
                result = tokio_tungstenite::connect_async(self.url.as_str()) => result,
                _ = shutdown.recv() => break,
            };
            match connected {
                Ok((ws, _)) => {
                    info!("Push feed connected");
                    self.handle.set(LinkState::Online);
                    self.store.set_connected(true);
                    let exit = self.pump(ws, &mut shutdown).await;
                    self.store.set_connected(false);
                    if matches!(exit, PumpExit::Shutdown) {
                        break;
                    }
                    warn!("Push feed dropped");
                }
                Err(err) => {
                    warn!("Push feed connect failed: {}", err);
                }
            }
            self.handle.set(LinkState::Backoff);
            let delay = self.jittered_delay();
            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => break,
            }
        }
        self.handle.set(LinkState::Idle);
        self.store.set_connected(false);
        debug!("Push feed supervisor stopped");
    }

    async fn pump(&self, mut ws: WsStream, shutdown: &mut broadcast::Receiver<()>) -> PumpExit {
        loop {
            tokio::select! {
                message = ws.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        ingest_frame(&self.store, &self.live, &text);
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(err) = ws.send(Message::Pong(payload)).await {
                            warn!("Push feed pong failed: {}", err);
                            return PumpExit::Dropped;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return PumpExit::Dropped,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!("Push feed read error: {}", err);
                        return PumpExit::Dropped;
                    }
                },
                _ = shutdown.recv() => {
                    let _ = ws.close(None).await;
                    return PumpExit::Shutdown;
                }
            }
        }
    }

    fn jittered_delay(&self) -> Duration {
        let jitter_ms = rand::thread_rng().gen_range(0..=500);
        self.reconnect_delay + Duration::from_millis(jitter_ms)
    }
}
