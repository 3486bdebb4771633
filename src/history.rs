//! Conversation history persistence

use crate::conversation::ConversationTurn;
use crate::error::{AssistantError, Result};
use std::path::PathBuf;
use tracing::info;

/// Per-user store of finalized conversations
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save(&self, user_id: &str, turns: &[ConversationTurn]) -> Result<()>;

    /// Saved turns, or an empty list for a user with no history
    async fn load(&self, user_id: &str) -> Result<Vec<ConversationTurn>>;
}

/// One JSON file per user: `<dir>/conversation_history_<user>.json`
pub struct JsonHistoryStore {
    dir: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("conversation_history_{}.json", safe))
    }
}

#[async_trait::async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn save(&self, user_id: &str, turns: &[ConversationTurn]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(user_id);
        let json = serde_json::to_vec_pretty(turns)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| AssistantError::History(format!("write {}: {}", path.display(), e)))?;

        info!("Saved {} turns for {} to {}", turns.len(), user_id, path.display());
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<Vec<ConversationTurn>> {
        let path = self.path_for(user_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AssistantError::History(format!("read {}: {}", path.display(), e))),
        }
    }
}
