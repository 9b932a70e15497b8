//! HTTP client for the voice gateway sidecar
//!
//! The wire-level voice protocol is delegated to a separate gateway process;
//! this module drives that process over its local REST API:
//!
//! - `POST /session/join` `{server_id, channel_id}` -> `{session_id}`
//! - `GET  /session/{id}` -> `{connected}`
//! - `POST /presence` `{activity}`
//! - `POST /streams` `{path}` -> `{stream_id}`
//! - `GET  /streams/{id}` -> `{active, error}`
//! - `POST /streams/{id}/stop`
//!
//! All requests carry the bot token as a bearer credential. Disconnect
//! notifications are synthesized from a session poll; stream completion is
//! detected by polling stream status and routed through the exactly-once
//! [`CompletionSender`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::gateway::{
    AudioStreamer, ChannelTarget, CompletionSender, ConnectionHandle, Gateway, GatewayEvent,
    StreamHandle,
};
use crate::library::Track;

const SESSION_POLL_INTERVAL: Duration = Duration::from_secs(2);
const STREAM_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Consecutive poll failures tolerated before the target is declared gone
const POLL_FAILURE_LIMIT: u32 = 3;

#[derive(Debug, Serialize)]
struct JoinRequest {
    server_id: u64,
    channel_id: u64,
}

#[derive(Debug, Deserialize)]
struct JoinResponse {
    session_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SessionStatus {
    connected: bool,
}

#[derive(Debug, Serialize)]
struct PresenceRequest<'a> {
    activity: &'a str,
}

#[derive(Debug, Serialize)]
struct PlayRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct PlayResponse {
    stream_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct StreamStatus {
    active: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Voice session client for the gateway sidecar
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: String,
    events_tx: broadcast::Sender<GatewayEvent>,
    /// Session the poll task watches; cleared when the session drops
    session: Arc<RwLock<Option<Uuid>>>,
}

impl HttpGateway {
    /// Create the client and start the session poll task
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Arc<Self> {
        let (events_tx, _) = broadcast::channel(16);
        let gateway = Arc::new(Self {
            client: reqwest::Client::new(),
            base_url: trim_base_url(base_url.into()),
            token: token.into(),
            events_tx,
            session: Arc::new(RwLock::new(None)),
        });
        Self::spawn_session_watch(Arc::clone(&gateway));
        gateway
    }

    /// Watch the current session and push a Disconnected notification when
    /// the gateway reports it gone or stops answering
    fn spawn_session_watch(gateway: Arc<Self>) {
        tokio::spawn(async move {
            let mut failures = 0u32;
            loop {
                tokio::time::sleep(SESSION_POLL_INTERVAL).await;

                let watched = *gateway.session.read().await;
                let Some(session_id) = watched else {
                    failures = 0;
                    continue;
                };

                match gateway.fetch_session(session_id).await {
                    Ok(true) => failures = 0,
                    Ok(false) => {
                        gateway
                            .session_dropped(session_id, "session closed by gateway")
                            .await;
                        failures = 0;
                    }
                    Err(e) => {
                        failures += 1;
                        if failures >= POLL_FAILURE_LIMIT {
                            gateway
                                .session_dropped(session_id, &format!("gateway unreachable: {e}"))
                                .await;
                            failures = 0;
                        }
                    }
                }
            }
        });
    }

    async fn session_dropped(&self, session_id: Uuid, reason: &str) {
        {
            let mut watched = self.session.write().await;
            if *watched == Some(session_id) {
                *watched = None;
            }
        }
        let _ = self.events_tx.send(GatewayEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    async fn fetch_session(&self, session_id: Uuid) -> Result<bool> {
        let url = format!("{}/session/{}", self.base_url, session_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("session lookup failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(Error::Gateway(format!(
                "session lookup returned HTTP {}",
                response.status()
            )));
        }

        let status: SessionStatus = response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("malformed session status: {e}")))?;
        Ok(status.connected)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn connect(&self, target: &ChannelTarget) -> Result<ConnectionHandle> {
        let url = format!("{}/session/join", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&JoinRequest {
                server_id: target.server_id,
                channel_id: target.channel_id,
            })
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("join request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Gateway(format!(
                "join rejected: HTTP {}",
                response.status()
            )));
        }

        let join: JoinResponse = response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("malformed join response: {e}")))?;

        *self.session.write().await = Some(join.session_id);
        debug!("Gateway session {} established", join.session_id);
        Ok(ConnectionHandle {
            session_id: join.session_id,
        })
    }

    async fn is_connected(&self, handle: &ConnectionHandle) -> bool {
        self.fetch_session(handle.session_id).await.unwrap_or(false)
    }

    async fn set_presence(&self, text: &str) -> Result<()> {
        let url = format!("{}/presence", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&PresenceRequest { activity: text })
            .send()
            .await
            .map_err(|e| Error::Gateway(format!("presence push failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Gateway(format!(
                "presence push returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events_tx.subscribe()
    }
}

/// Streaming client for the gateway sidecar
pub struct HttpStreamer {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpStreamer {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            client: reqwest::Client::new(),
            base_url: trim_base_url(base_url.into()),
            token: token.into(),
        })
    }

    /// Poll the stream until the gateway reports it ended, then fire the
    /// completion report exactly once
    fn spawn_stream_watch(&self, stream_id: Uuid, done: CompletionSender) {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let token = self.token.clone();

        tokio::spawn(async move {
            let mut failures = 0u32;
            let url = format!("{base_url}/streams/{stream_id}");

            let error = loop {
                tokio::time::sleep(STREAM_POLL_INTERVAL).await;

                match client.get(&url).bearer_auth(&token).send().await {
                    Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                        // The gateway forgets streams once torn down
                        break None;
                    }
                    Ok(response) if response.status().is_success() => {
                        match response.json::<StreamStatus>().await {
                            Ok(status) if status.active => failures = 0,
                            Ok(status) => break status.error,
                            Err(e) => {
                                failures += 1;
                                if failures >= POLL_FAILURE_LIMIT {
                                    break Some(format!("malformed stream status: {e}"));
                                }
                            }
                        }
                    }
                    Ok(response) => {
                        failures += 1;
                        if failures >= POLL_FAILURE_LIMIT {
                            break Some(format!(
                                "stream status returned HTTP {}",
                                response.status()
                            ));
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        if failures >= POLL_FAILURE_LIMIT {
                            break Some(format!("gateway unreachable: {e}"));
                        }
                    }
                }
            };

            debug!("Stream {} ended (error: {:?})", stream_id, error);
            done.notify(error);
        });
    }
}

#[async_trait]
impl AudioStreamer for HttpStreamer {
    async fn begin(&self, track: &Track, done: CompletionSender) -> Result<StreamHandle> {
        let url = format!("{}/streams", self.base_url);
        let path = track.path.to_string_lossy();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&PlayRequest { path: &*path })
            .send()
            .await
            .map_err(|e| Error::Stream(format!("play request failed: {e}")))?;

        if !response.status().is_success() {
            // Synchronous rejection: the caller releases its claim; `done`
            // is dropped here without firing
            return Err(Error::Stream(format!(
                "stream rejected: HTTP {}",
                response.status()
            )));
        }

        let play: PlayResponse = response
            .json()
            .await
            .map_err(|e| Error::Stream(format!("malformed play response: {e}")))?;

        self.spawn_stream_watch(play.stream_id, done);
        Ok(StreamHandle {
            stream_id: play.stream_id,
        })
    }

    async fn stop(&self, stream: &StreamHandle) -> Result<()> {
        let url = format!("{}/streams/{}/stop", self.base_url, stream.stream_id);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Stream(format!("stop request failed: {e}")))?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            warn!(
                "Stop for stream {} returned HTTP {}",
                stream.stream_id,
                response.status()
            );
        }
        Ok(())
    }
}

fn trim_base_url(mut base_url: String) -> String {
    while base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}
