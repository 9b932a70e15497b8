//! Test harness for player engine integration tests
//!
//! Provides scripted mock collaborators (gateway and streamer) plus a
//! TestPlayer wrapper that runs the real engine loops at millisecond scale.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use radiobot::error::{Error, Result};
use radiobot::gateway::{
    AudioStreamer, ChannelTarget, CompletionSender, ConnectionHandle, Gateway, GatewayEvent,
    StreamHandle,
};
use radiobot::library::{MediaLibrary, Track};
use radiobot::player::{PlayerEngine, PlayerSettings};
use radiobot::state::{PlayerSnapshot, SharedState};

/// Scripted gateway: connectivity and presence are controlled by the test
pub struct MockGateway {
    /// Health of the current session as reported by `is_connected`
    pub healthy: AtomicBool,
    /// Whether `connect` succeeds
    pub allow_connect: AtomicBool,
    /// Number of successful connects
    pub connects: AtomicUsize,
    /// Whether `set_presence` fails
    pub presence_fail: AtomicBool,
    presence: Mutex<Vec<String>>,
    events_tx: broadcast::Sender<GatewayEvent>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(16);
        Arc::new(Self {
            healthy: AtomicBool::new(false),
            allow_connect: AtomicBool::new(true),
            connects: AtomicUsize::new(0),
            presence_fail: AtomicBool::new(false),
            presence: Mutex::new(Vec::new()),
            events_tx,
        })
    }

    /// Simulate the platform kicking the bot: health drops and a
    /// notification is pushed
    pub fn force_disconnect(&self, reason: &str) {
        self.healthy.store(false, Ordering::SeqCst);
        let _ = self.events_tx.send(GatewayEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    pub fn presence_log(&self) -> Vec<String> {
        self.presence.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn connect(&self, _target: &ChannelTarget) -> Result<ConnectionHandle> {
        if !self.allow_connect.load(Ordering::SeqCst) {
            return Err(Error::Gateway("gateway refused the join".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.healthy.store(true, Ordering::SeqCst);
        Ok(ConnectionHandle {
            session_id: Uuid::new_v4(),
        })
    }

    async fn is_connected(&self, _handle: &ConnectionHandle) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn set_presence(&self, text: &str) -> Result<()> {
        if self.presence_fail.load(Ordering::SeqCst) {
            return Err(Error::Gateway("presence rejected".to_string()));
        }
        self.presence.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events_tx.subscribe()
    }
}

struct PendingStream {
    handle: StreamHandle,
    done: CompletionSender,
}

/// Scripted streamer: the test decides when streams complete
pub struct MockStreamer {
    /// Successful begin calls
    pub begins: AtomicUsize,
    /// Synchronously rejected begin calls
    pub rejects: AtomicUsize,
    /// Stop calls
    pub stops: AtomicUsize,
    /// Reject the next begin call (one-shot)
    pub reject_next: AtomicBool,
    /// Whether stop fires the completion immediately, like a real subsystem
    /// tearing the stream down; disable for deterministic interleavings
    pub auto_complete_on_stop: AtomicBool,
    /// Titles handed to begin, in order
    titles: Mutex<Vec<String>>,
    pending: Mutex<Vec<PendingStream>>,
}

impl MockStreamer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            begins: AtomicUsize::new(0),
            rejects: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            reject_next: AtomicBool::new(false),
            auto_complete_on_stop: AtomicBool::new(true),
            titles: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Fire the completion for the oldest in-flight stream
    pub fn complete_next(&self, error: Option<String>) -> bool {
        let pending = {
            let mut list = self.pending.lock().unwrap();
            if list.is_empty() {
                None
            } else {
                Some(list.remove(0))
            }
        };
        match pending {
            Some(p) => {
                p.done.notify(error);
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn played_titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioStreamer for MockStreamer {
    async fn begin(&self, track: &Track, done: CompletionSender) -> Result<StreamHandle> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            self.rejects.fetch_add(1, Ordering::SeqCst);
            return Err(Error::Stream("subsystem rejected the request".to_string()));
        }
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.titles.lock().unwrap().push(track.title.clone());

        let handle = StreamHandle {
            stream_id: Uuid::new_v4(),
        };
        self.pending.lock().unwrap().push(PendingStream {
            handle: handle.clone(),
            done,
        });
        Ok(handle)
    }

    async fn stop(&self, stream: &StreamHandle) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.auto_complete_on_stop.load(Ordering::SeqCst) {
            let pending = {
                let mut list = self.pending.lock().unwrap();
                list.iter()
                    .position(|p| p.handle == *stream)
                    .map(|i| list.remove(i))
            };
            if let Some(p) = pending {
                p.done.notify(None);
            }
        }
        Ok(())
    }
}

/// Millisecond-scale cadences so tests exercise the real loops quickly
pub fn fast_settings() -> PlayerSettings {
    PlayerSettings {
        connect_interval: Duration::from_millis(20),
        advance_interval: Duration::from_millis(10),
        status_interval: Duration::from_secs(3600),
    }
}

/// Running engine with mock collaborators and a throwaway media folder
pub struct TestPlayer {
    pub engine: Arc<PlayerEngine>,
    pub state: Arc<SharedState>,
    pub library: Arc<RwLock<MediaLibrary>>,
    pub gateway: Arc<MockGateway>,
    pub streamer: Arc<MockStreamer>,
    pub media_dir: TempDir,
}

impl TestPlayer {
    pub async fn start(track_names: &[&str]) -> Self {
        Self::start_with_settings(track_names, fast_settings()).await
    }

    pub async fn start_with_settings(track_names: &[&str], settings: PlayerSettings) -> Self {
        let player = Self::prepare(track_names, settings);
        player.engine.start().await.unwrap();
        player
    }

    /// Build the engine without starting its loops, so a test can script the
    /// mocks before the first tick fires
    pub fn prepare(track_names: &[&str], settings: PlayerSettings) -> Self {
        let media_dir = tempfile::tempdir().unwrap();
        for name in track_names {
            std::fs::write(media_dir.path().join(format!("{name}.mp3")), b"audio").unwrap();
        }

        let library = Arc::new(RwLock::new(MediaLibrary::scan(media_dir.path())));
        let state = Arc::new(SharedState::new());
        let gateway = MockGateway::new();
        let streamer = MockStreamer::new();

        let engine = Arc::new(PlayerEngine::new(
            Arc::clone(&state),
            Arc::clone(&library),
            gateway.clone(),
            streamer.clone(),
            ChannelTarget {
                server_id: 1,
                channel_id: 2,
            },
            settings,
        ));

        Self {
            engine,
            state,
            library,
            gateway,
            streamer,
            media_dir,
        }
    }

    /// Poll the shared snapshot until the predicate holds (2s timeout)
    pub async fn wait_for_snapshot<F>(&self, pred: F) -> bool
    where
        F: Fn(&PlayerSnapshot) -> bool,
    {
        for _ in 0..400 {
            if pred(&self.state.snapshot().await) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    /// Poll an arbitrary condition until it holds (2s timeout)
    pub async fn wait_until<F>(&self, cond: F) -> bool
    where
        F: Fn() -> bool,
    {
        for _ in 0..400 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}
