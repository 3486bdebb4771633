use super::messages::{ClientMessage, LiveSetup, ServerMessage, SessionEvent};
use super::transport::{LiveConnection, LiveConnector, LiveSender};
use crate::error::{AssistantError, Result};
use async_nats::Client;
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Subject the client publishes on for one session
pub fn client_subject(session_id: &str) -> String {
    format!("live.client.{}", session_id)
}

/// Subject the relay publishes server messages on for one session
pub fn server_subject(session_id: &str) -> String {
    format!("live.server.{}", session_id)
}

/// Live session relayed through a NATS broker
///
/// The relay forwards `live.client.<session>` to the model (the credential
/// travels in the `Authorization` header of the setup message) and publishes
/// every server message on `live.server.<session>`.
pub struct NatsConnector {
    url: String,
}

impl NatsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait::async_trait]
impl LiveConnector for NatsConnector {
    async fn connect(&self, setup: LiveSetup, credential: &str) -> Result<LiveConnection> {
        info!("Connecting to NATS at {}", self.url);

        let client = async_nats::connect(self.url.as_str())
            .await
            .map_err(|e| AssistantError::Transport(format!("Failed to connect to NATS: {}", e)))?;

        let session_id = uuid::Uuid::new_v4().to_string();

        // Subscribe before sending setup so the confirmation is not missed
        let mut subscriber = client
            .subscribe(server_subject(&session_id))
            .await
            .map_err(|e| AssistantError::Transport(format!("Failed to subscribe: {}", e)))?;

        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Authorization", format!("Bearer {}", credential).as_str());
        let payload = serde_json::to_vec(&ClientMessage::Setup(setup))?;
        client
            .publish_with_headers(client_subject(&session_id), headers, payload.into())
            .await
            .map_err(|e| AssistantError::Transport(format!("Failed to publish setup: {}", e)))?;

        info!("Published setup for relay session {}", session_id);

        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<ServerMessage>(&msg.payload) {
                    Ok(message) => {
                        if event_tx.send(SessionEvent::from_server(message)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse relayed server message: {}", e);
                    }
                }
            }
            let _ = event_tx.send(SessionEvent::Close).await;
            debug!("Relay subscription ended");
        });

        Ok(LiveConnection {
            sender: Arc::new(NatsSender {
                client,
                subject: client_subject(&session_id),
                closed: AtomicBool::new(false),
            }),
            events: event_rx,
        })
    }

    fn name(&self) -> &str {
        "nats"
    }
}

struct NatsSender {
    client: Client,
    subject: String,
    closed: AtomicBool,
}

#[async_trait::async_trait]
impl LiveSender for NatsSender {
    async fn send(&self, message: ClientMessage) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AssistantError::Transport("session closed".into()));
        }
        let payload = serde_json::to_vec(&message)?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| AssistantError::Transport(format!("Failed to publish: {}", e)))
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Closing relay session on {}", self.subject);
        // An empty payload tells the relay to hang up the model session
        self.client
            .publish(self.subject.clone(), Vec::<u8>::new().into())
            .await
            .map_err(|e| AssistantError::Transport(format!("Failed to publish close: {}", e)))?;
        self.client
            .flush()
            .await
            .map_err(|e| AssistantError::Transport(format!("Failed to flush: {}", e)))
    }
}
