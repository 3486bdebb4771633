use crate::config::Config;
use serde::{Deserialize, Serialize};

const PERSONA: &str = "You are a helpful and conversational AI assistant for the \"My Alex\" app. \
You can answer questions, provide information, and help users navigate the app's features. \
You have access to Google Search, Google Maps, and Google Places to provide accurate and \
up-to-date information. Be friendly, clear, and concise in your responses.";

const TOOL_GUIDE: &str = "Use getCurrentLocation when the user asks about things near them. \
Use navigateToPage when the user asks to open a part of the app. \
When it helps, end your answer with follow-up ideas in the form \
[Suggestions: \"first idea\", \"second idea\"].";

/// Configuration for one assistant controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Remote model identifier
    pub model: String,

    /// Prebuilt voice the assistant speaks with
    pub voice: String,

    /// Persona and tool guidance sent at session setup
    pub system_instruction: String,

    /// Microphone capture rate (Hz)
    pub input_sample_rate: u32,

    /// Rate of the assistant's PCM audio (Hz)
    pub output_sample_rate: u32,

    /// Samples per captured frame
    pub frame_size: usize,

    /// Signed-in user; `start()` does nothing without one
    pub user_id: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "models/gemini-2.5-flash-native-audio-preview-09-2025".to_string(),
            voice: "Zephyr".to_string(),
            system_instruction: format!("{} {}", PERSONA, TOOL_GUIDE),
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            frame_size: 4096,
            user_id: None,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            model: config.assistant.model.clone(),
            voice: config.assistant.voice.clone(),
            input_sample_rate: config.audio.input_sample_rate,
            output_sample_rate: config.audio.output_sample_rate,
            frame_size: config.audio.frame_size,
            user_id: config.assistant.user_id.clone(),
            ..Self::default()
        }
    }
}
