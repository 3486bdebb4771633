//! File-backed audio devices for headless hosts.
//!
//! - `WavMicrophone` replays a WAV file as microphone input at real-time
//!   cadence, then keeps delivering silence until stopped.
//! - `WavOutputClock` is a timer-driven output clock that records every
//!   scheduled assistant buffer to a WAV file.

use super::backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioBuffer, AudioFrame, OutputClock,
};
use crate::error::{AssistantError, Result};
use hound::WavReader;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .map_err(|e| AssistantError::Audio(format!("open {}: {}", path.display(), e)))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AssistantError::Audio(format!("read samples: {}", e)))?;

        let duration_seconds = samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Mono float samples, averaging channels
    pub fn to_mono_f32(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| {
                let sum: f32 = frame.iter().map(|&s| s as f32 / 32768.0).sum();
                sum / channels as f32
            })
            .collect()
    }
}

/// Microphone that replays a WAV file, or silence when no file is given
pub struct WavMicrophone {
    source: Option<PathBuf>,
    config: AudioBackendConfig,
    samples: Option<Vec<f32>>,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WavMicrophone {
    pub fn new(source: Option<PathBuf>, config: AudioBackendConfig) -> Self {
        Self {
            source,
            config,
            samples: None,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for WavMicrophone {
    async fn acquire(&mut self) -> Result<()> {
        let samples = match &self.source {
            Some(path) => {
                let file = AudioFile::open(path)
                    .map_err(|e| AssistantError::Permission(format!("input unavailable: {}", e)))?;
                if file.sample_rate != self.config.target_sample_rate {
                    return Err(AssistantError::Audio(format!(
                        "input file is {}Hz, expected {}Hz",
                        file.sample_rate, self.config.target_sample_rate
                    )));
                }
                file.to_mono_f32()
            }
            None => Vec::new(),
        };
        self.samples = Some(samples);
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            return Err(AssistantError::Audio("Already capturing".into()));
        }
        let samples = self
            .samples
            .take()
            .ok_or_else(|| AssistantError::Audio("microphone not acquired".into()))?;

        // One frame in flight; frames that cannot be queued are dropped
        let (tx, rx) = mpsc::channel(1);
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        let frame_size = self.config.frame_size.max(1);
        let sample_rate = self.config.target_sample_rate;
        let frame_duration = self.config.frame_duration();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_duration);
            let mut offset = 0usize;
            let mut timestamp_ms = 0u64;

            while capturing.load(Ordering::SeqCst) {
                ticker.tick().await;

                let mut chunk = vec![0.0f32; frame_size];
                if offset < samples.len() {
                    let end = (offset + frame_size).min(samples.len());
                    chunk[..end - offset].copy_from_slice(&samples[offset..end]);
                    offset = end;
                }

                let frame = AudioFrame {
                    samples: chunk,
                    sample_rate,
                    channels: 1,
                    timestamp_ms,
                };
                timestamp_ms += frame_duration.as_millis() as u64;

                match tx.try_send(frame) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!("Dropping microphone frame at {}ms", timestamp_ms);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        });

        self.task = Some(task);
        info!("WAV microphone started ({}Hz, {} samples/frame)", sample_rate, frame_size);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.samples = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "WAV microphone"
    }
}

/// Output clock driven by tokio timers, recording to a WAV file
pub struct WavOutputClock {
    sample_rate: u32,
    epoch: Instant,
    writer: Mutex<Option<hound::WavWriter<BufWriter<File>>>>,
    ended: mpsc::UnboundedSender<u64>,
    timers: HashMap<u64, JoinHandle<()>>,
    closed: bool,
    path: PathBuf,
}

impl WavOutputClock {
    pub fn create(
        path: impl Into<PathBuf>,
        sample_rate: u32,
        ended: mpsc::UnboundedSender<u64>,
    ) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| AssistantError::Audio(format!("create {}: {}", path.display(), e)))?;

        info!("Recording assistant audio to {}", path.display());

        Ok(Self {
            sample_rate,
            epoch: Instant::now(),
            writer: Mutex::new(Some(writer)),
            ended,
            timers: HashMap::new(),
            closed: false,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, buffer: &AudioBuffer) -> Result<()> {
        let mut guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(writer) = guard.as_mut() {
            let channels = buffer.channels.max(1) as usize;
            for frame in buffer.samples.chunks_exact(channels) {
                let mono = frame.iter().sum::<f32>() / channels as f32;
                let sample = (mono * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                writer
                    .write_sample(sample)
                    .map_err(|e| AssistantError::Audio(format!("write sample: {}", e)))?;
            }
        }
        Ok(())
    }
}

impl OutputClock for WavOutputClock {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn start_buffer(&mut self, id: u64, buffer: &AudioBuffer, start_at: f64) -> Result<()> {
        if self.closed {
            return Err(AssistantError::Audio("output clock closed".into()));
        }
        self.record(buffer)?;

        let ends_in = (start_at + buffer.duration() - self.current_time()).max(0.0);
        let ended = self.ended.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(ends_in)).await;
            let _ = ended.send(id);
        });

        self.timers.retain(|_, t| !t.is_finished());
        self.timers.insert(id, timer);
        Ok(())
    }

    fn stop_buffer(&mut self, id: u64) {
        if let Some(timer) = self.timers.remove(&id) {
            timer.abort();
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }

        let writer = self.writer.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(writer) = writer {
            writer
                .finalize()
                .map_err(|e| AssistantError::Audio(format!("finalize WAV: {}", e)))?;
        }
        info!("Assistant audio saved to {}", self.path.display());
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for WavOutputClock {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to finalize WAV writer on drop: {}", e);
        }
    }
}

/// Device factory for headless hosts
pub struct HeadlessAudio {
    input_wav: Option<PathBuf>,
    recordings_dir: PathBuf,
}

impl HeadlessAudio {
    pub fn new(input_wav: Option<PathBuf>, recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_wav,
            recordings_dir: recordings_dir.into(),
        }
    }
}

impl AudioBackendFactory for HeadlessAudio {
    fn microphone(&self, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        Ok(Box::new(WavMicrophone::new(self.input_wav.clone(), config)))
    }

    fn output(
        &self,
        sample_rate: u32,
        ended: mpsc::UnboundedSender<u64>,
    ) -> Result<Box<dyn OutputClock>> {
        let path = self
            .recordings_dir
            .join(format!("assistant-{}.wav", uuid::Uuid::new_v4()));
        Ok(Box::new(WavOutputClock::create(path, sample_rate, ended)?))
    }
}
