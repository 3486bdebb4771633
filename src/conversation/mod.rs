//! Conversation model and transcript reconciliation

mod reconciler;
mod suggestions;
mod turn;

pub use reconciler::TranscriptReconciler;
pub use suggestions::extract_suggestions;
pub use turn::{ConversationTurn, GroundingChunk, GroundingSource, Speaker};
