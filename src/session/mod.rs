//! Assistant session management
//!
//! This module provides the `SessionController` that manages:
//! - Microphone capture and streaming to the remote model
//! - Gapless playback of the assistant's audio
//! - Transcript reconciliation into conversation turns
//! - Tool call dispatch
//! - Lifecycle, failure reporting and history persistence

mod config;
mod controller;
mod credentials;
mod state;

pub use config::SessionConfig;
pub use controller::{SessionController, SessionDeps};
pub use credentials::{CredentialProvider, EnvCredential};
pub use state::{SessionPhase, SessionStatus};
