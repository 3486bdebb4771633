//! The assistant session lifecycle.
//!
//! One controller owns at most one live session at a time. Every lifecycle
//! call bumps an epoch counter; tasks and in-flight `start()` calls compare
//! the epoch they were born with before touching state, so a `stop()` that
//! races a `start()` (or a remote close) short-circuits instead of tearing
//! down twice.

use super::config::SessionConfig;
use super::credentials::CredentialProvider;
use super::state::{SessionPhase, SessionStatus};
use crate::audio::{codec, AudioBackend, AudioBackendConfig, AudioBackendFactory, CaptureManager, PlaybackScheduler};
use crate::conversation::{ConversationTurn, TranscriptReconciler};
use crate::error::{AssistantError, Result};
use crate::history::HistoryStore;
use crate::remote::messages::{
    Content, GenerationConfig, PrebuiltVoiceConfig, SpeechConfig, ToolDeclarations, TranscriptionConfig,
    VoiceConfig,
};
use crate::remote::{ClientMessage, LiveConnection, LiveConnector, LiveSender, LiveSetup, ServerMessage, SessionEvent};
use crate::tools::ToolDispatcher;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, error, info, warn};

const CONNECTING_TEXT: &str = "Connecting...";
const CONNECT_FAILED_TEXT: &str = "Failed to connect. Please check permissions and API key.";
const PERMISSION_DENIED_TEXT: &str =
    "Microphone access was denied. Please allow microphone access and try again.";
const RESELECT_TEXT: &str = "Your API key could not be used. Please select a valid API key to continue.";

/// Collaborators a controller is built from
pub struct SessionDeps {
    pub devices: Arc<dyn AudioBackendFactory>,
    pub connector: Arc<dyn LiveConnector>,
    pub tools: ToolDispatcher,
    pub history: Arc<dyn HistoryStore>,
    pub credentials: Arc<dyn CredentialProvider>,
}

/// Resources owned by one open session
struct SessionResources {
    microphone: Box<dyn AudioBackend>,
    playback: PlaybackScheduler,
    sender: Option<Arc<dyn LiveSender>>,
    capture: Option<CaptureManager>,
    pump_stop: Option<oneshot::Sender<()>>,
}

impl SessionResources {
    /// Tear everything down. Failures are logged; every step is attempted.
    async fn release(mut self) {
        if let Some(stop) = self.pump_stop.take() {
            let _ = stop.send(());
        }
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(sender) = self.sender.take() {
            if let Err(e) = sender.close().await {
                warn!("Failed to close remote session: {}", e);
            }
        }
        if let Err(e) = self.microphone.stop().await {
            warn!("Failed to stop microphone: {}", e);
        }
        if let Err(e) = self.playback.close() {
            warn!("Failed to close output clock: {}", e);
        }
    }
}

struct SessionState {
    phase: SessionPhase,
    epoch: u64,
    user_id: Option<String>,
    has_credential: bool,
    receiving_text: bool,
    reconciler: TranscriptReconciler,
    resources: Option<SessionResources>,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
}

impl SessionState {
    fn is_current(&self, epoch: u64, phase: SessionPhase) -> bool {
        self.epoch == epoch && self.phase == phase
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: self.phase,
            is_connecting: self.phase == SessionPhase::Connecting,
            is_connected: self.phase == SessionPhase::Open,
            is_speaking: self
                .resources
                .as_ref()
                .map(|r| r.playback.is_speaking())
                .unwrap_or(false),
            is_receiving_text: self.receiving_text,
            has_credential: self.has_credential,
            turn_count: self.reconciler.len(),
            session_id: self.session_id.clone(),
            started_at: self.started_at,
        }
    }
}

struct Shared {
    config: SessionConfig,
    devices: Arc<dyn AudioBackendFactory>,
    connector: Arc<dyn LiveConnector>,
    tools: ToolDispatcher,
    history: Arc<dyn HistoryStore>,
    credentials: Arc<dyn CredentialProvider>,
    state: Mutex<SessionState>,
    status_tx: watch::Sender<SessionStatus>,
}

/// Real-time voice/text assistant session manager
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(config: SessionConfig, deps: SessionDeps) -> Self {
        let state = SessionState {
            phase: SessionPhase::Idle,
            epoch: 0,
            user_id: config.user_id.clone(),
            has_credential: true,
            receiving_text: false,
            reconciler: TranscriptReconciler::new(),
            resources: None,
            session_id: None,
            started_at: None,
        };
        let (status_tx, _) = watch::channel(state.status());

        Self {
            shared: Arc::new(Shared {
                config,
                devices: deps.devices,
                connector: deps.connector,
                tools: deps.tools,
                history: deps.history,
                credentials: deps.credentials,
                state: Mutex::new(state),
                status_tx,
            }),
        }
    }

    /// Open a session: microphone, output clock, then the remote connection
    ///
    /// Does nothing unless idle with a signed-in user. Failures are recorded
    /// as a system turn, the phase returns to idle, and the error is returned.
    pub async fn start(&self) -> Result<()> {
        let epoch = {
            let mut state = self.shared.state.lock().await;
            if state.phase != SessionPhase::Idle {
                debug!("Start ignored: session is {:?}", state.phase);
                return Ok(());
            }
            let Some(user_id) = state.user_id.clone() else {
                debug!("Start ignored: no user signed in");
                return Ok(());
            };

            info!("Starting assistant session for {}", user_id);
            state.phase = SessionPhase::Connecting;
            state.epoch += 1;
            if state.reconciler.is_empty() {
                state.reconciler.push_system(CONNECTING_TEXT);
            }
            self.publish(&state);
            state.epoch
        };

        match self.open(epoch).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fail_start(epoch, &e).await;
                Err(e)
            }
        }
    }

    async fn open(&self, epoch: u64) -> Result<()> {
        let shared = &self.shared;
        let config = &shared.config;

        let credential = shared
            .credentials
            .current()
            .await
            .ok_or_else(|| AssistantError::Credential("API key not found".into()))?;

        let mut microphone = shared.devices.microphone(AudioBackendConfig {
            target_sample_rate: config.input_sample_rate,
            target_channels: 1,
            frame_size: config.frame_size,
        })?;
        microphone.acquire().await?;
        info!("Microphone acquired: {}", microphone.name());

        let (ended_tx, ended_rx) = mpsc::unbounded_channel();
        let playback = match shared.devices.output(config.output_sample_rate, ended_tx) {
            Ok(clock) => PlaybackScheduler::new(clock),
            Err(e) => {
                if let Err(stop_err) = microphone.stop().await {
                    warn!("Failed to release microphone: {}", stop_err);
                }
                return Err(e);
            }
        };

        let mut resources = SessionResources {
            microphone,
            playback,
            sender: None,
            capture: None,
            pump_stop: None,
        };

        let LiveConnection { sender, events } = match self.connect(&credential).await {
            Ok(connection) => connection,
            Err(e) => {
                resources.release().await;
                return Err(e);
            }
        };
        resources.sender = Some(Arc::clone(&sender));

        let frames = match resources.microphone.start().await {
            Ok(frames) => frames,
            Err(e) => {
                resources.release().await;
                return Err(e);
            }
        };

        let mut state = shared.state.lock().await;
        if !state.is_current(epoch, SessionPhase::Connecting) {
            drop(state);
            info!("Session was stopped while connecting; releasing resources");
            resources.release().await;
            return Ok(());
        }

        resources.capture = Some(CaptureManager::attach(frames, sender, config.input_sample_rate));
        let (pump_stop, stopped) = oneshot::channel();
        resources.pump_stop = Some(pump_stop);

        let session_id = uuid::Uuid::new_v4().to_string();
        info!("Assistant session {} open via {}", session_id, shared.connector.name());

        state.phase = SessionPhase::Open;
        state.has_credential = true;
        state.reconciler.clear_system();
        state.resources = Some(resources);
        state.session_id = Some(session_id);
        state.started_at = Some(Utc::now());
        self.publish(&state);
        drop(state);

        tokio::spawn(self.clone().pump(epoch, events, ended_rx, stopped));
        Ok(())
    }

    /// Connect and wait for the session-ready gate
    async fn connect(&self, credential: &str) -> Result<LiveConnection> {
        let mut connection = self
            .shared
            .connector
            .connect(self.build_setup(), credential)
            .await?;

        match connection.events.recv().await {
            Some(SessionEvent::Open) => Ok(connection),
            Some(SessionEvent::Error(message)) => {
                let _ = connection.sender.close().await;
                Err(AssistantError::from_remote(message))
            }
            Some(SessionEvent::Message(_)) => {
                let _ = connection.sender.close().await;
                Err(AssistantError::Transport("message received before setup completed".into()))
            }
            Some(SessionEvent::Close) | None => {
                Err(AssistantError::Transport("connection closed before setup completed".into()))
            }
        }
    }

    async fn fail_start(&self, epoch: u64, err: &AssistantError) {
        let mut state = self.shared.state.lock().await;
        if !state.is_current(epoch, SessionPhase::Connecting) {
            debug!("Start failure after stop ignored: {}", err);
            return;
        }
        error!("Failed to start session: {}", err);

        let text = match err {
            AssistantError::Permission(_) => PERMISSION_DENIED_TEXT,
            AssistantError::Credential(_) => RESELECT_TEXT,
            _ => CONNECT_FAILED_TEXT,
        };
        if err.is_credential() {
            state.has_credential = false;
        }
        state.reconciler.clear_system();
        state.reconciler.push_system(text);
        state.phase = SessionPhase::Idle;
        self.publish(&state);
        drop(state);

        if err.is_credential() {
            if let Err(e) = self.shared.credentials.prompt_reselect().await {
                warn!("Credential reselection failed: {}", e);
            }
        }
    }

    /// Close the session and release every device
    ///
    /// No-op when idle. `save_history` marks an exit: the finalized
    /// conversation is persisted for the user, then cleared.
    pub async fn stop(&self, save_history: bool) {
        self.teardown(None, save_history).await;
    }

    async fn teardown(&self, expected_epoch: Option<u64>, save_history: bool) {
        let (resources, to_save) = {
            let mut state = self.shared.state.lock().await;
            if matches!(state.phase, SessionPhase::Idle | SessionPhase::Closing) {
                debug!("Stop ignored: session is {:?}", state.phase);
                return;
            }
            if expected_epoch.is_some_and(|epoch| epoch != state.epoch) {
                return;
            }

            info!("Stopping assistant session (save_history={})", save_history);
            if state.phase == SessionPhase::Connecting {
                state.reconciler.clear_system();
            }
            state.phase = SessionPhase::Closing;
            state.epoch += 1;
            state.receiving_text = false;

            let to_save = if save_history {
                let turns = state.reconciler.history();
                state
                    .user_id
                    .clone()
                    .filter(|_| !turns.is_empty())
                    .map(|user| (user, turns))
            } else {
                None
            };
            let resources = state.resources.take();
            self.publish(&state);
            (resources, to_save)
        };

        if let Some((user_id, turns)) = to_save {
            if let Err(e) = self.shared.history.save(&user_id, &turns).await {
                error!("Failed to save conversation history: {}", e);
            }
        }

        if let Some(resources) = resources {
            resources.release().await;
        }

        let mut state = self.shared.state.lock().await;
        state.phase = SessionPhase::Idle;
        state.session_id = None;
        state.started_at = None;
        if save_history {
            state.reconciler.clear();
        }
        self.publish(&state);
        info!("Assistant session stopped");
    }

    /// Send a typed message
    ///
    /// Returns `Ok(false)` without side effects when the text is blank or no
    /// session is open.
    pub async fn send_text_message(&self, text: &str) -> Result<bool> {
        if text.trim().is_empty() {
            return Ok(false);
        }

        let sender = {
            let mut state = self.shared.state.lock().await;
            if state.phase != SessionPhase::Open {
                debug!("Text message dropped: session is {:?}", state.phase);
                return Ok(false);
            }
            let Some(sender) = state.resources.as_ref().and_then(|r| r.sender.clone()) else {
                return Ok(false);
            };
            state.reconciler.push_user_text(text);
            self.publish(&state);
            sender
        };

        sender.send(ClientMessage::text(text)).await?;
        Ok(true)
    }

    async fn pump(
        self,
        epoch: u64,
        mut events: mpsc::Receiver<SessionEvent>,
        mut ended: mpsc::UnboundedReceiver<u64>,
        mut stopped: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = &mut stopped => break,
                event = events.recv() => {
                    match event {
                        Some(SessionEvent::Message(message)) => {
                            if !self.on_message(epoch, message).await {
                                break;
                            }
                        }
                        Some(SessionEvent::Error(message)) => {
                            self.on_remote_error(epoch, message).await;
                            break;
                        }
                        Some(SessionEvent::Close) | None => {
                            self.on_remote_close(epoch).await;
                            break;
                        }
                        Some(SessionEvent::Open) => debug!("Duplicate open event ignored"),
                    }
                }
                Some(id) = ended.recv() => {
                    if !self.on_buffer_ended(epoch, id).await {
                        break;
                    }
                }
            }
        }
        debug!("Event pump for epoch {} finished", epoch);
    }

    /// Route one server message. Returns false once the session is gone.
    async fn on_message(&self, epoch: u64, message: ServerMessage) -> bool {
        let (sender, outbound) = {
            let mut guard = self.shared.state.lock().await;
            if !guard.is_current(epoch, SessionPhase::Open) {
                return false;
            }
            let state = &mut *guard;
            let Some(resources) = state.resources.as_mut() else {
                return false;
            };

            for chunk in message.audio_chunks() {
                match codec::decode(chunk) {
                    Ok(bytes) => {
                        let buffer = codec::decode_pcm_to_buffer(&bytes, resources.playback.sample_rate(), 1);
                        if let Err(e) = resources.playback.enqueue(&buffer) {
                            warn!("Failed to schedule assistant audio: {}", e);
                        }
                    }
                    Err(e) => warn!("Dropping undecodable audio chunk: {}", e),
                }
            }

            if message.interrupted() {
                info!("Assistant interrupted by user");
                resources.playback.interrupt();
            }

            let reconciler = &mut state.reconciler;
            let grounding = message.grounding();
            if !grounding.is_empty() {
                reconciler.add_grounding(grounding);
            }
            if let Some(fragment) = message.input_fragment() {
                reconciler.push_input_fragment(fragment);
            }
            if let Some(fragment) = message.output_fragment() {
                if reconciler.push_output_fragment(fragment) {
                    state.receiving_text = true;
                }
            }

            let mut outbound = Vec::new();
            for call in message.function_calls() {
                let outcome = self.shared.tools.dispatch(call);
                reconciler.push_tool(outcome.activity);
                outbound.push(ClientMessage::tool_result(outcome.id, outcome.name, outcome.result));
            }

            if message.turn_complete() {
                state.receiving_text = false;
                reconciler.complete_turn();
            }

            let sender = resources.sender.clone();
            self.publish(state);
            (sender, outbound)
        };

        if let Some(sender) = sender {
            for response in outbound {
                if let Err(e) = sender.send(response).await {
                    error!("Failed to send tool response: {}", e);
                }
            }
        }
        true
    }

    async fn on_buffer_ended(&self, epoch: u64, id: u64) -> bool {
        let mut state = self.shared.state.lock().await;
        if !state.is_current(epoch, SessionPhase::Open) {
            return false;
        }
        if let Some(resources) = state.resources.as_mut() {
            resources.playback.on_ended(id);
        }
        self.publish(&state);
        true
    }

    async fn on_remote_error(&self, epoch: u64, message: String) {
        let err = AssistantError::from_remote(message.clone());
        {
            let mut state = self.shared.state.lock().await;
            if !state.is_current(epoch, SessionPhase::Open) {
                return;
            }
            error!("Session error: {}", err);
            if err.is_credential() {
                state.has_credential = false;
                state.reconciler.push_system(RESELECT_TEXT);
            } else {
                state
                    .reconciler
                    .push_system(format!("Connection error: {}. Please try again.", message));
            }
            self.publish(&state);
        }

        self.teardown(Some(epoch), false).await;
        if err.is_credential() {
            if let Err(e) = self.shared.credentials.prompt_reselect().await {
                warn!("Credential reselection failed: {}", e);
            }
        }
    }

    async fn on_remote_close(&self, epoch: u64) {
        info!("Remote session closed");
        self.teardown(Some(epoch), false).await;
    }

    fn build_setup(&self) -> LiveSetup {
        let config = &self.shared.config;
        LiveSetup {
            model: config.model.clone(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: config.voice.clone(),
                        },
                    },
                },
            },
            system_instruction: Content::from_text(config.system_instruction.clone()),
            tools: vec![ToolDeclarations {
                function_declarations: self.shared.tools.declarations(),
            }],
            input_audio_transcription: TranscriptionConfig::default(),
            output_audio_transcription: TranscriptionConfig::default(),
        }
    }

    fn publish(&self, state: &SessionState) {
        self.shared.status_tx.send_replace(state.status());
    }

    pub async fn status(&self) -> SessionStatus {
        self.shared.state.lock().await.status()
    }

    /// Finalized turns followed by the streaming one, if any
    pub async fn conversation(&self) -> Vec<ConversationTurn> {
        self.shared.state.lock().await.reconciler.turns()
    }

    /// Status updates, published after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub async fn user_id(&self) -> Option<String> {
        self.shared.state.lock().await.user_id.clone()
    }

    /// Sign a user in or out. Signing out stops any open session first.
    pub async fn set_user(&self, user_id: Option<String>) {
        if user_id.is_none() {
            self.stop(false).await;
        }
        let mut state = self.shared.state.lock().await;
        state.user_id = user_id;
    }

    /// Load the user's saved conversation while idle
    ///
    /// Returns the number of turns restored.
    pub async fn restore_history(&self) -> Result<usize> {
        let Some(user_id) = self.user_id().await else {
            return Ok(0);
        };
        let turns = self.shared.history.load(&user_id).await?;

        let mut state = self.shared.state.lock().await;
        if state.phase != SessionPhase::Idle {
            debug!("History restore skipped: session is {:?}", state.phase);
            return Ok(0);
        }
        let count = turns.len();
        state.reconciler.restore(turns);
        self.publish(&state);
        info!("Restored {} turns for {}", count, user_id);
        Ok(count)
    }

    /// Ask the host for a new credential and mark it usable
    pub async fn reselect_credential(&self) -> Result<()> {
        self.shared.credentials.prompt_reselect().await?;
        let mut state = self.shared.state.lock().await;
        state.has_credential = true;
        self.publish(&state);
        Ok(())
    }
}
