use crate::error::MonitorError;
use futures_util::StreamExt;
use std::time::Duration;
use synapse_core::dashboard_api::DASHBOARD_STREAM_PATH;
use synapse_core::pnl_stream::{decode_pnl_frame, PnlFrame};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    ClosedPendingReconnect,
}

impl ChannelState {
    pub fn label(self) -> &'static str {
        match self {
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "live",
            ChannelState::ClosedPendingReconnect => "reconnecting",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    State(ChannelState),
    Frame(PnlFrame),
}

/// Maps the API base URL onto the dashboard stream, keeping transport
/// security: `http` → `ws`, `https` → `wss`.
pub fn stream_url(base: &Url) -> Result<Url, MonitorError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(MonitorError::UnsupportedScheme(other.to_string())),
    };
    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|_| MonitorError::UnsupportedScheme(base.scheme().to_string()))?;
    url.set_path(DASHBOARD_STREAM_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

pub struct PushChannel {
    url: Url,
    reconnect_delay: Duration,
    tx: mpsc::Sender<PushEvent>,
}

impl PushChannel {
    pub fn new(url: Url, reconnect_delay: Duration, tx: mpsc::Sender<PushEvent>) -> Self {
        Self {
            url,
            reconnect_delay,
            tx,
        }
    }

    /// Runs the connect/reconnect loop until the event receiver is dropped.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        loop {
            if !self.emit(PushEvent::State(ChannelState::Connecting)).await {
                return;
            }
            match connect_async(self.url.as_str()).await {
                Ok((mut ws, _)) => {
                    info!(event = "push_open", url = %self.url);
                    if !self.emit(PushEvent::State(ChannelState::Open)).await {
                        return;
                    }
                    while let Some(msg) = ws.next().await {
                        let text = match msg {
                            Ok(Message::Text(text)) => text,
                            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                                Ok(text) => text,
                                Err(_) => {
                                    debug!(event = "push_binary_ignored");
                                    continue;
                                }
                            },
                            Ok(Message::Close(frame)) => {
                                info!(event = "push_close", frame = ?frame);
                                break;
                            }
                            Ok(_) => continue,
                            Err(err) => {
                                warn!(event = "push_transport_error", error = %err);
                                break;
                            }
                        };
                        if let Some(event) = handle_text(&text) {
                            if !self.emit(event).await {
                                return;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(event = "push_connect_error", url = %self.url, error = %err);
                }
            }
            if !self
                .emit(PushEvent::State(ChannelState::ClosedPendingReconnect))
                .await
            {
                return;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn emit(&self, event: PushEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// Turns one text frame into an event; malformed and partial frames are
/// dropped here and never reach the store.
pub fn handle_text(text: &str) -> Option<PushEvent> {
    match decode_pnl_frame(text) {
        Ok(Some(frame)) => Some(PushEvent::Frame(frame)),
        Ok(None) => {
            debug!(event = "push_frame_ignored", frame = text);
            None
        }
        Err(err) => {
            warn!(event = "push_decode_error", error = %err);
            None
        }
    }
}
