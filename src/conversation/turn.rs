use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
    /// Status and error notices from the session manager itself
    System,
    /// Local tool activity ("Consulting ...")
    Tool,
}

/// One unit of dialogue
///
/// Serialized in the same shape the history store has always used
/// (`type`, `text`, `isPartial`, `grounding`, `suggestions`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    #[serde(rename = "type")]
    pub speaker: Speaker,

    pub text: String,

    /// True while the turn is still streaming
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_partial: bool,

    /// Citations, only on finalized assistant turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<Vec<GroundingChunk>>,

    /// Follow-up prompts, only on finalized assistant turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl ConversationTurn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            is_partial: false,
            grounding: None,
            suggestions: None,
        }
    }

    pub fn partial(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            is_partial: true,
            ..Self::new(speaker, text)
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Speaker::System, text)
    }
}

/// A web or maps citation attached to an assistant answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<GroundingSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps: Option<GroundingSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}
