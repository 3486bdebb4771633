//! Conversions between PCM sample buffers and the base64 wire encoding.
//!
//! All functions are pure. `decode(encode(x)) == x` for every byte slice.

use super::backend::AudioBuffer;
use crate::error::{AssistantError, Result};
use base64::Engine;

/// Encode raw bytes for the wire
pub fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a wire string back to raw bytes
pub fn decode(wire: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(wire)
        .map_err(|e| AssistantError::Audio(format!("invalid base64 audio: {}", e)))
}

/// Convert float samples to 16-bit signed PCM, little-endian bytes
///
/// Samples are scaled by 32768 and clamped to the i16 range.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .map(|&s| (s * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

/// Decode little-endian 16-bit PCM into a playable buffer
///
/// A trailing odd byte is ignored.
pub fn decode_pcm_to_buffer(bytes: &[u8], sample_rate: u32, channels: u16) -> AudioBuffer {
    let samples = bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect();

    AudioBuffer {
        samples,
        sample_rate,
        channels,
    }
}

/// MIME type advertised for captured audio
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={}", sample_rate)
}
