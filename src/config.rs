use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    /// Signed-in user; sessions refuse to start without one
    pub user_id: Option<String>,
    /// Falls back to GEMINI_API_KEY / API_KEY when unset
    pub api_key: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            voice: default_voice(),
            user_id: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_input_rate")]
    pub input_sample_rate: u32,
    #[serde(default = "default_output_rate")]
    pub output_sample_rate: u32,
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    /// WAV file replayed as the microphone in headless mode
    pub input_wav: Option<String>,
    #[serde(default = "default_recordings_path")]
    pub recordings_path: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: default_input_rate(),
            output_sample_rate: default_output_rate(),
            frame_size: default_frame_size(),
            input_wav: None,
            recordings_path: default_recordings_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Websocket,
    Nats,
}

#[derive(Debug, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default = "default_live_url")]
    pub url: String,
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            url: default_live_url(),
            nats_url: default_nats_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

fn default_model() -> String {
    "models/gemini-2.5-flash-native-audio-preview-09-2025".to_string()
}

fn default_voice() -> String {
    "Zephyr".to_string()
}

fn default_input_rate() -> u32 {
    16000
}

fn default_output_rate() -> u32 {
    24000
}

fn default_frame_size() -> usize {
    4096
}

fn default_recordings_path() -> String {
    "recordings".to_string()
}

fn default_live_url() -> String {
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent".to_string()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_history_path() -> String {
    "history".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ALEX").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the audio pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let audio = &self.audio;
        if audio.frame_size == 0 {
            bail!("audio.frame_size must be greater than zero");
        }
        if audio.input_sample_rate == 0 || audio.output_sample_rate == 0 {
            bail!("audio sample rates must be greater than zero");
        }
        Ok(())
    }
}
