// In-memory collaborators for driving a SessionController in tests
#![allow(dead_code)]

use alex_voice::audio::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioBuffer, AudioFrame, OutputClock};
use alex_voice::conversation::ConversationTurn;
use alex_voice::error::{AssistantError, Result};
use alex_voice::history::HistoryStore;
use alex_voice::remote::messages::ServerMessage;
use alex_voice::remote::{ClientMessage, LiveConnection, LiveConnector, LiveSender, LiveSetup, SessionEvent};
use alex_voice::session::{CredentialProvider, SessionConfig, SessionController, SessionDeps};
use alex_voice::tools::{RecordingNavigator, SharedLocation, ToolDispatcher};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Microphone
// ============================================================================

#[derive(Default)]
pub struct MicTrace {
    pub frames: Mutex<Option<mpsc::Sender<AudioFrame>>>,
    pub acquired: AtomicUsize,
    pub stops: AtomicUsize,
}

impl MicTrace {
    pub async fn push(&self, samples: Vec<f32>) {
        let tx = self.frames.lock().unwrap().clone().expect("microphone not started");
        tx.send(AudioFrame {
            samples,
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 0,
        })
        .await
        .unwrap();
    }
}

pub struct MockMicrophone {
    deny: bool,
    trace: Arc<MicTrace>,
    capturing: AtomicBool,
}

#[async_trait::async_trait]
impl AudioBackend for MockMicrophone {
    async fn acquire(&mut self) -> Result<()> {
        if self.deny {
            return Err(AssistantError::Permission("NotAllowedError".into()));
        }
        self.trace.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(8);
        *self.trace.frames.lock().unwrap() = Some(tx);
        self.capturing.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        self.trace.frames.lock().unwrap().take();
        self.trace.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "mock microphone"
    }
}

// ============================================================================
// Output clock
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Started {
    pub id: u64,
    pub start_at: f64,
    pub duration: f64,
}

pub struct ClockTrace {
    pub now: Mutex<f64>,
    pub started: Mutex<Vec<Started>>,
    pub stopped: Mutex<Vec<u64>>,
    pub closed: AtomicBool,
    pub ended: Mutex<Option<mpsc::UnboundedSender<u64>>>,
}

impl Default for ClockTrace {
    fn default() -> Self {
        Self {
            now: Mutex::new(0.0),
            started: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            ended: Mutex::new(None),
        }
    }
}

impl ClockTrace {
    pub fn set_now(&self, now: f64) {
        *self.now.lock().unwrap() = now;
    }

    pub fn started(&self) -> Vec<Started> {
        self.started.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> Vec<u64> {
        self.stopped.lock().unwrap().clone()
    }

    /// Report a buffer as finished playing
    pub fn finish(&self, id: u64) {
        if let Some(tx) = self.ended.lock().unwrap().as_ref() {
            let _ = tx.send(id);
        }
    }
}

pub struct ManualClock {
    pub trace: Arc<ClockTrace>,
    pub sample_rate: u32,
}

impl ManualClock {
    pub fn new(sample_rate: u32) -> (Self, Arc<ClockTrace>) {
        let trace = Arc::new(ClockTrace::default());
        (
            Self {
                trace: trace.clone(),
                sample_rate,
            },
            trace,
        )
    }
}

impl OutputClock for ManualClock {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        *self.trace.now.lock().unwrap()
    }

    fn start_buffer(&mut self, id: u64, buffer: &AudioBuffer, start_at: f64) -> Result<()> {
        self.trace.started.lock().unwrap().push(Started {
            id,
            start_at,
            duration: buffer.duration(),
        });
        Ok(())
    }

    fn stop_buffer(&mut self, id: u64) {
        self.trace.stopped.lock().unwrap().push(id);
    }

    fn close(&mut self) -> Result<()> {
        self.trace.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.trace.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Device factory
// ============================================================================

#[derive(Default)]
pub struct MockDevices {
    pub deny_microphone: AtomicBool,
    pub mic: Arc<MicTrace>,
    pub clock: Arc<ClockTrace>,
    pub mic_configs: Mutex<Vec<AudioBackendConfig>>,
    pub output_rates: Mutex<Vec<u32>>,
}

impl AudioBackendFactory for MockDevices {
    fn microphone(&self, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        self.mic_configs.lock().unwrap().push(config);
        Ok(Box::new(MockMicrophone {
            deny: self.deny_microphone.load(Ordering::SeqCst),
            trace: self.mic.clone(),
            capturing: AtomicBool::new(false),
        }))
    }

    fn output(
        &self,
        sample_rate: u32,
        ended: mpsc::UnboundedSender<u64>,
    ) -> Result<Box<dyn OutputClock>> {
        self.output_rates.lock().unwrap().push(sample_rate);
        self.clock.closed.store(false, Ordering::SeqCst);
        *self.clock.ended.lock().unwrap() = Some(ended);
        Ok(Box::new(ManualClock {
            trace: self.clock.clone(),
            sample_rate,
        }))
    }
}

// ============================================================================
// Remote session
// ============================================================================

#[derive(Default)]
pub struct MockSender {
    pub sent: Mutex<Vec<ClientMessage>>,
    pub closes: AtomicUsize,
}

#[async_trait::async_trait]
impl LiveSender for MockSender {
    async fn send(&self, message: ClientMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// What the connector does once connected
#[derive(Debug, Clone, PartialEq)]
pub enum OpenBehaviour {
    /// Confirm the setup immediately
    Open,
    /// Report this error instead of opening
    Fail(String),
    /// Wait for the test to push the first event
    Hold,
}

pub struct MockConnector {
    pub behaviour: Mutex<OpenBehaviour>,
    pub setups: Mutex<Vec<(LiveSetup, String)>>,
    pub events: Mutex<Option<mpsc::Sender<SessionEvent>>>,
    pub sender: Mutex<Option<Arc<MockSender>>>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self {
            behaviour: Mutex::new(OpenBehaviour::Open),
            setups: Mutex::new(Vec::new()),
            events: Mutex::new(None),
            sender: Mutex::new(None),
        }
    }
}

impl MockConnector {
    pub fn connects(&self) -> usize {
        self.setups.lock().unwrap().len()
    }

    pub fn sender(&self) -> Arc<MockSender> {
        self.sender.lock().unwrap().clone().expect("not connected")
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.sender().sent.lock().unwrap().clone()
    }

    pub async fn emit(&self, event: SessionEvent) {
        let tx = self.events.lock().unwrap().clone().expect("not connected");
        tx.send(event).await.unwrap();
    }

    pub async fn emit_json(&self, json: serde_json::Value) {
        let message: ServerMessage = serde_json::from_value(json).unwrap();
        self.emit(SessionEvent::Message(message)).await;
    }
}

#[async_trait::async_trait]
impl LiveConnector for MockConnector {
    async fn connect(&self, setup: LiveSetup, credential: &str) -> Result<LiveConnection> {
        self.setups.lock().unwrap().push((setup, credential.to_string()));

        let (tx, rx) = mpsc::channel(64);
        let sender = Arc::new(MockSender::default());
        *self.events.lock().unwrap() = Some(tx.clone());
        *self.sender.lock().unwrap() = Some(sender.clone());

        let behaviour = self.behaviour.lock().unwrap().clone();
        match behaviour {
            OpenBehaviour::Open => tx.send(SessionEvent::Open).await.unwrap(),
            OpenBehaviour::Fail(message) => tx.send(SessionEvent::Error(message)).await.unwrap(),
            OpenBehaviour::Hold => {}
        }

        Ok(LiveConnection { sender, events: rx })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Credentials and history
// ============================================================================

pub struct MockCredentials {
    pub key: Mutex<Option<String>>,
    pub reselects: AtomicUsize,
    /// When set, `prompt_reselect` waits for `release_prompt`
    pub hold_prompt: AtomicBool,
    pub prompt_released: tokio::sync::Notify,
}

impl MockCredentials {
    pub fn with_key(key: Option<&str>) -> Self {
        Self {
            key: Mutex::new(key.map(str::to_string)),
            reselects: AtomicUsize::new(0),
            hold_prompt: AtomicBool::new(false),
            prompt_released: tokio::sync::Notify::new(),
        }
    }

    pub fn reselects(&self) -> usize {
        self.reselects.load(Ordering::SeqCst)
    }

    pub fn release_prompt(&self) {
        self.prompt_released.notify_one();
    }
}

#[async_trait::async_trait]
impl CredentialProvider for MockCredentials {
    async fn current(&self) -> Option<String> {
        self.key.lock().unwrap().clone()
    }

    async fn prompt_reselect(&self) -> Result<()> {
        self.reselects.fetch_add(1, Ordering::SeqCst);
        if self.hold_prompt.load(Ordering::SeqCst) {
            self.prompt_released.notified().await;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    pub saved: Mutex<HashMap<String, Vec<ConversationTurn>>>,
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistory {
    async fn save(&self, user_id: &str, turns: &[ConversationTurn]) -> Result<()> {
        self.saved
            .lock()
            .unwrap()
            .insert(user_id.to_string(), turns.to_vec());
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .saved
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub controller: SessionController,
    pub devices: Arc<MockDevices>,
    pub connector: Arc<MockConnector>,
    pub credentials: Arc<MockCredentials>,
    pub history: Arc<MemoryHistory>,
    pub location: SharedLocation,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(Some("user-1"), Some("test-key"))
    }

    pub fn build(user: Option<&str>, key: Option<&str>) -> Self {
        let devices = Arc::new(MockDevices::default());
        let connector = Arc::new(MockConnector::default());
        let credentials = Arc::new(MockCredentials::with_key(key));
        let history = Arc::new(MemoryHistory::default());
        let location = SharedLocation::default();
        let navigator = Arc::new(RecordingNavigator::default());

        let config = SessionConfig {
            user_id: user.map(str::to_string),
            ..SessionConfig::default()
        };

        let controller = SessionController::new(
            config,
            SessionDeps {
                devices: devices.clone(),
                connector: connector.clone(),
                tools: ToolDispatcher::with_builtins(Arc::new(location.clone()), navigator.clone()),
                history: history.clone(),
                credentials: credentials.clone(),
            },
        );

        Self {
            controller,
            devices,
            connector,
            credentials,
            history,
            location,
            navigator,
        }
    }

    /// Start and assert the session opened
    pub async fn open(&self) {
        self.controller.start().await.expect("start failed");
        assert!(self.controller.status().await.is_connected);
    }
}

/// Base64 PCM16 payload of `samples` zero samples
pub fn pcm_chunk(samples: usize) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(vec![0u8; samples * 2])
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
