use crate::error::{AssistantError, Result};
use tracing::warn;

/// Supplies the remote credential and asks the host for a new one
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Currently selected credential, if any
    async fn current(&self) -> Option<String>;

    /// Ask the host to select a fresh credential
    async fn prompt_reselect(&self) -> Result<()>;
}

/// Credential read from configuration or the process environment
pub struct EnvCredential {
    configured: Option<String>,
}

impl EnvCredential {
    pub fn new(configured: Option<String>) -> Self {
        Self { configured }
    }
}

#[async_trait::async_trait]
impl CredentialProvider for EnvCredential {
    async fn current(&self) -> Option<String> {
        self.configured
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    async fn prompt_reselect(&self) -> Result<()> {
        // Headless: the key is re-read from the environment on the next start
        warn!("Credential rejected; set GEMINI_API_KEY and start again");
        if self.current().await.is_none() {
            return Err(AssistantError::Credential("no API key configured".into()));
        }
        Ok(())
    }
}
