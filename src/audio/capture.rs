use super::backend::AudioFrame;
use super::codec;
use crate::remote::{ClientMessage, LiveSender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Forwards microphone frames to the live session
///
/// Each frame is converted to PCM16, base64 encoded and sent as realtime
/// input in capture order. Delivery is best effort: a failed send is logged
/// and the next frame goes out on schedule.
pub struct CaptureManager {
    is_capturing: Arc<AtomicBool>,
    frames_sent: Arc<AtomicUsize>,
    task: Option<JoinHandle<()>>,
}

impl CaptureManager {
    /// Start forwarding frames from `frames` until stopped or the stream ends
    pub fn attach(
        mut frames: mpsc::Receiver<AudioFrame>,
        sender: Arc<dyn LiveSender>,
        sample_rate: u32,
    ) -> Self {
        let is_capturing = Arc::new(AtomicBool::new(true));
        let frames_sent = Arc::new(AtomicUsize::new(0));

        let capturing = Arc::clone(&is_capturing);
        let sent = Arc::clone(&frames_sent);
        let mime_type = codec::pcm_mime_type(sample_rate);

        let task = tokio::spawn(async move {
            info!("Capture task started ({})", mime_type);

            while let Some(frame) = frames.recv().await {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }

                let pcm_bytes = codec::float_to_pcm16(&frame.samples);
                let message = ClientMessage::audio(codec::encode(&pcm_bytes), mime_type.clone());

                match sender.send(message).await {
                    Ok(()) => {
                        sent.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        warn!("Failed to send audio frame at {}ms: {}", frame.timestamp_ms, e);
                    }
                }
            }

            capturing.store(false, Ordering::SeqCst);
            info!("Capture task stopped");
        });

        Self {
            is_capturing,
            frames_sent,
            task: Some(task),
        }
    }

    /// Stop forwarding immediately
    pub fn stop(&mut self) {
        self.is_capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    pub fn frames_sent(&self) -> usize {
        self.frames_sent.load(Ordering::SeqCst)
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        self.stop();
    }
}
