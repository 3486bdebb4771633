pub mod backend;
pub mod capture;
pub mod codec;
pub mod file;
pub mod playback;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioBuffer, AudioFrame, OutputClock};
pub use capture::CaptureManager;
pub use file::{AudioFile, HeadlessAudio, WavMicrophone, WavOutputClock};
pub use playback::{PlaybackScheduler, ScheduledBuffer};
