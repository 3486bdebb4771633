//! Direct WebSocket connection to the live API.
//!
//! Outbound messages go through an unbounded channel drained by a writer
//! task, so `send` never waits on the socket and message order is kept.
//! A reader task decodes server frames (text or binary JSON) into
//! `SessionEvent`s.

use super::messages::{ClientMessage, LiveSetup, ServerMessage, SessionEvent};
use super::transport::{LiveConnection, LiveConnector, LiveSender};
use crate::error::{AssistantError, Result};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite};
use tracing::{debug, error, info, warn};

pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    fn endpoint(&self, credential: &str) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}key={}", self.url, sep, credential)
    }
}

#[async_trait::async_trait]
impl LiveConnector for WebSocketConnector {
    async fn connect(&self, setup: LiveSetup, credential: &str) -> Result<LiveConnection> {
        info!("Connecting to live API at {} (model={})", self.url, setup.model);

        let (ws_stream, _) = connect_async(self.endpoint(credential))
            .await
            .map_err(classify_connect_error)?;

        let (mut write, mut read) = ws_stream.split();

        let setup_json = serde_json::to_string(&ClientMessage::Setup(setup))?;
        write
            .send(tungstenite::Message::Text(setup_json))
            .await
            .map_err(|e| AssistantError::Transport(format!("send setup: {}", e)))?;

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<tungstenite::Message>();
        let (event_tx, event_rx) = mpsc::channel(64);

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let closing = matches!(msg, tungstenite::Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    warn!("Live socket write failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            debug!("Live socket writer stopped");
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let event = match frame {
                    Ok(tungstenite::Message::Text(text)) => decode_frame(text.as_bytes()),
                    Ok(tungstenite::Message::Binary(bytes)) => decode_frame(&bytes),
                    Ok(tungstenite::Message::Close(frame)) => {
                        if let Some(frame) = frame {
                            let normal = frame.code == tungstenite::protocol::frame::coding::CloseCode::Normal;
                            if !normal && !frame.reason.is_empty() {
                                let _ = event_tx.send(SessionEvent::Error(frame.reason.to_string())).await;
                            }
                        }
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        error!("Live socket read failed: {}", e);
                        let _ = event_tx.send(SessionEvent::Error(e.to_string())).await;
                        break;
                    }
                };

                if let Some(event) = event {
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
            let _ = event_tx.send(SessionEvent::Close).await;
            debug!("Live socket reader stopped");
        });

        info!("Live socket connected, awaiting setup confirmation");

        Ok(LiveConnection {
            sender: Arc::new(WebSocketSender {
                out_tx,
                closed: AtomicBool::new(false),
            }),
            events: event_rx,
        })
    }

    fn name(&self) -> &str {
        "websocket"
    }
}

struct WebSocketSender {
    out_tx: mpsc::UnboundedSender<tungstenite::Message>,
    closed: AtomicBool,
}

#[async_trait::async_trait]
impl LiveSender for WebSocketSender {
    async fn send(&self, message: ClientMessage) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AssistantError::Transport("session closed".into()));
        }
        let json = serde_json::to_string(&message)?;
        self.out_tx
            .send(tungstenite::Message::Text(json))
            .map_err(|_| AssistantError::Transport("live socket writer gone".into()))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Closing live socket");
        // Writer may already be gone if the remote closed first
        let _ = self.out_tx.send(tungstenite::Message::Close(None));
        Ok(())
    }
}

fn decode_frame(bytes: &[u8]) -> Option<SessionEvent> {
    match serde_json::from_slice::<ServerMessage>(bytes) {
        Ok(message) => Some(SessionEvent::from_server(message)),
        Err(e) => {
            warn!("Failed to parse server message: {}", e);
            None
        }
    }
}

fn classify_connect_error(err: tungstenite::Error) -> AssistantError {
    match &err {
        tungstenite::Error::Http(resp) if matches!(resp.status().as_u16(), 401 | 403) => {
            AssistantError::Credential(format!("live API rejected credential ({})", resp.status()))
        }
        _ => AssistantError::from_remote(format!("connect failed: {}", err)),
    }
}
