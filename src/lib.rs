pub mod audio;
pub mod config;
pub mod conversation;
pub mod error;
pub mod history;
pub mod http;
pub mod remote;
pub mod session;
pub mod tools;

pub use audio::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, HeadlessAudio, OutputClock};
pub use config::Config;
pub use conversation::{ConversationTurn, Speaker, TranscriptReconciler};
pub use error::{AssistantError, Result};
pub use history::{HistoryStore, JsonHistoryStore};
pub use http::{create_router, AppState};
pub use remote::{LiveConnector, NatsConnector, WebSocketConnector};
pub use session::{
    CredentialProvider, EnvCredential, SessionConfig, SessionController, SessionDeps, SessionPhase, SessionStatus,
};
pub use tools::{RecordingNavigator, SharedLocation, ToolDispatcher};
