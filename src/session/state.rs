use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase: `Idle -> Connecting -> Open -> Closing -> Idle`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
}

/// Snapshot of the controller's observable flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,

    pub is_connecting: bool,

    pub is_connected: bool,

    /// At least one assistant buffer is scheduled or playing
    pub is_speaking: bool,

    /// An assistant transcript is streaming
    pub is_receiving_text: bool,

    /// False after the remote rejected the credential, until reselection
    pub has_credential: bool,

    /// Finalized and partial turns in the conversation
    pub turn_count: usize,

    /// Identifier of the open session, if any
    pub session_id: Option<String>,

    /// When the current session was opened
    pub started_at: Option<DateTime<Utc>>,
}
