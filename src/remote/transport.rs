use super::messages::{ClientMessage, LiveSetup, SessionEvent};
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound half of an open live session
#[async_trait::async_trait]
pub trait LiveSender: Send + Sync {
    /// Send one message; messages are delivered in call order
    async fn send(&self, message: ClientMessage) -> Result<()>;

    /// Close the session. Further sends fail.
    async fn close(&self) -> Result<()>;
}

/// A connected session: the sender plus the inbound event stream
///
/// The first event is `Open` once the remote confirms the setup.
pub struct LiveConnection {
    pub sender: Arc<dyn LiveSender>,
    pub events: mpsc::Receiver<SessionEvent>,
}

/// Opens live sessions with the remote conversational model
///
/// Implementations:
/// - `WebSocketConnector`: direct connection to the live API
/// - `NatsConnector`: the same messages relayed through NATS subjects
#[async_trait::async_trait]
pub trait LiveConnector: Send + Sync {
    /// Connect and send `setup` as the first message
    async fn connect(&self, setup: LiveSetup, credential: &str) -> Result<LiveConnection>;

    /// Get connector name for logging
    fn name(&self) -> &str;
}
