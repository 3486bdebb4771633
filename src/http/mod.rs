//! HTTP API server for external control of the assistant
//!
//! This module provides a REST API over one `SessionController`:
//! - POST /assistant/start - Open a voice session
//! - POST /assistant/stop - Close the session (optionally saving history)
//! - POST /assistant/message - Send a typed message
//! - POST /assistant/location - Update the last known device location
//! - POST /assistant/credential/reselect - Re-select the API credential
//! - GET /assistant/status - Query session flags
//! - GET /assistant/conversation - Get the conversation so far
//! - GET /assistant/navigation - Last page the assistant navigated to
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
