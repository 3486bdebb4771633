//! Error types for the assistant session manager.

/// Errors surfaced by the session manager and its collaborators.
///
/// Every variant that reaches the controller is reported to the user as a
/// `system` turn; none of them propagate past the public API as a panic.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Microphone access was denied or unavailable.
    #[error("microphone permission denied: {0}")]
    Permission(String),

    /// Missing or rejected remote credential.
    #[error("credential error: {0}")]
    Credential(String),

    /// Remote session transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A tool handler failed to produce a result.
    #[error("tool error: {0}")]
    Tool(String),

    /// Audio device or clock error.
    #[error("audio error: {0}")]
    Audio(String),

    /// History persistence error.
    #[error("history error: {0}")]
    History(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Message fragments the live API uses when a key or project is unusable.
const CREDENTIAL_MARKERS: &[&str] = &[
    "requested entity was not found",
    "entity not found",
    "api key not valid",
    "api_key_invalid",
    "permission_denied",
    "unauthenticated",
];

/// HTTP statuses that reject a credential, matched only as whole tokens.
const CREDENTIAL_STATUSES: &[&str] = &["401", "403"];

impl AssistantError {
    /// Build a transport error, promoting it to a credential error when the
    /// remote message belongs to the entity/credential-not-found class.
    pub fn from_remote(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_credential_message(&message) {
            Self::Credential(message)
        } else {
            Self::Transport(message)
        }
    }

    /// Whether this error should trigger the credential reselection flow.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Credential(_))
    }
}

/// Classify a raw remote error message.
pub fn is_credential_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    CREDENTIAL_MARKERS.iter().any(|m| lower.contains(m))
        || lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| CREDENTIAL_STATUSES.contains(&token))
}
