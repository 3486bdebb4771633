pub mod messages;
pub mod nats;
pub mod transport;
pub mod websocket;

pub use messages::{ClientMessage, FunctionCall, FunctionDeclaration, LiveSetup, ServerMessage, SessionEvent};
pub use nats::NatsConnector;
pub use transport::{LiveConnection, LiveConnector, LiveSender};
pub use websocket::WebSocketConnector;
