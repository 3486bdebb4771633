use crate::error::Result;
use tokio::sync::mpsc;

/// One block of captured microphone samples (f32, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw float samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Decoded output audio ready to be scheduled on an output clock
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Float samples in [-1.0, 1.0], interleaved
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playback duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Configuration for the capture side of a session
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Rate of the input clock frames are delivered at
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Samples per delivered frame
    pub frame_size: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // Live API expects 16kHz input
            target_channels: 1,        // Mono
            frame_size: 4096,
        }
    }
}

impl AudioBackendConfig {
    /// Wall-clock length of one frame at the configured rate
    pub fn frame_duration(&self) -> std::time::Duration {
        let rate = self.target_sample_rate.max(1) as u64;
        let micros = self.frame_size.max(1) as u64 * 1_000_000 / rate;
        // tokio intervals panic on a zero period
        std::time::Duration::from_micros(micros.max(1))
    }
}

/// Microphone capture backend
///
/// One instance is built per session and owned by the controller until
/// `stop()`. Implementations:
/// - `WavMicrophone`: replays a WAV file at real-time cadence (headless mode)
/// - test fakes in `tests/common`
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Acquire microphone access
    ///
    /// Fails with `AssistantError::Permission` when access is denied.
    async fn acquire(&mut self) -> Result<()>;

    /// Attach to the input clock and start delivering fixed-size frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the stream and its input clock
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Output audio clock with buffer scheduling
///
/// Time is measured in seconds on the clock's own running timeline,
/// never wall-clock. When a started buffer finishes playing naturally the
/// clock reports its id on the completion channel it was opened with.
pub trait OutputClock: Send + Sync {
    fn sample_rate(&self) -> u32;

    /// Current position of the clock's timeline in seconds
    fn current_time(&self) -> f64;

    /// Schedule `buffer` to start at `start_at` on the clock's timeline
    fn start_buffer(&mut self, id: u64, buffer: &AudioBuffer, start_at: f64) -> Result<()>;

    /// Halt a scheduled or playing buffer immediately
    fn stop_buffer(&mut self, id: u64);

    /// Stop the clock and release the output device
    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Builds fresh audio devices for each session
pub trait AudioBackendFactory: Send + Sync {
    /// Create the microphone backend (not yet acquired)
    fn microphone(&self, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>>;

    /// Open an output clock at `sample_rate`, reporting finished buffers on `ended`
    fn output(
        &self,
        sample_rate: u32,
        ended: mpsc::UnboundedSender<u64>,
    ) -> Result<Box<dyn OutputClock>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn frame_duration_matches_rate() {
        let config = AudioBackendConfig {
            target_sample_rate: 16000,
            target_channels: 1,
            frame_size: 160,
        };
        assert_eq!(config.frame_duration(), Duration::from_millis(10));
    }

    #[test]
    fn frame_duration_is_never_zero() {
        let config = AudioBackendConfig {
            target_sample_rate: 16000,
            target_channels: 1,
            frame_size: 0,
        };
        assert!(config.frame_duration() > Duration::ZERO);

        let config = AudioBackendConfig {
            target_sample_rate: 0,
            target_channels: 1,
            frame_size: 0,
        };
        assert!(config.frame_duration() > Duration::ZERO);
    }
}
