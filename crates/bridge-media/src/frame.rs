//! The Audio Frame and the per-call `(R, F)` it is measured against.

use bytes::Bytes;

use crate::error::{MediaError, Result};

/// The per-call sample rate / frame-size pair, fixed at handshake time.
///
/// `F = 2 * (R / 50)`: one 20ms window of 16-bit signed little-endian
/// linear PCM, one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleConfig {
    sample_rate: u32,
    frame_bytes: usize,
}

impl SampleConfig {
    /// 8kHz, 320-byte (160-sample) frames — the canonical pair.
    pub const NARROWBAND: SampleConfig = SampleConfig { sample_rate: 8000, frame_bytes: 320 };
    /// 16kHz, 640-byte (320-sample) frames — the permitted wideband extension.
    pub const WIDEBAND: SampleConfig = SampleConfig { sample_rate: 16000, frame_bytes: 640 };

    /// Build a `SampleConfig`, accepting only the two pairs this bridge
    /// supports. Anything else is almost certainly a handshake typo, not
    /// a new sample rate to silently honor.
    pub fn new(sample_rate: u32, frame_bytes: usize) -> Result<Self> {
        let candidate = SampleConfig { sample_rate, frame_bytes };
        if candidate == Self::NARROWBAND || candidate == Self::WIDEBAND {
            Ok(candidate)
        } else {
            Err(MediaError::UnsupportedSampleConfig { sample_rate, frame_bytes })
        }
    }

    /// Derive the config from a sample rate alone, using `F = 2 * R / 50`.
    pub fn from_sample_rate(sample_rate: u32) -> Result<Self> {
        let samples_per_frame = sample_rate / 50;
        Self::new(sample_rate, samples_per_frame as usize * 2)
    }

    /// The negotiated sample rate `R`, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The frame byte length `F`.
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Samples per 20ms frame (`F / 2`).
    pub fn samples_per_frame(&self) -> usize {
        self.frame_bytes / 2
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self::NARROWBAND
    }
}

/// An immutable, exactly-`F`-byte window of 16-bit signed little-endian
/// linear PCM audio, one channel, 20ms of audio at the call's sample rate.
///
/// Construction is the single enforcement point for the system-wide
/// invariant that every enqueued/wire frame is exactly `F` bytes (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Bytes,
}

impl AudioFrame {
    /// Build a frame, rejecting anything that isn't exactly `config.frame_bytes()`.
    pub fn new(data: impl Into<Bytes>, config: SampleConfig) -> Result<Self> {
        let data = data.into();
        if data.len() != config.frame_bytes() {
            return Err(MediaError::WrongFrameSize {
                expected: config.frame_bytes(),
                actual: data.len(),
            });
        }
        Ok(Self { data })
    }

    /// Build an all-zero comfort-silence / padding frame of the given length.
    pub fn silence(config: SampleConfig) -> Self {
        Self { data: vec![0u8; config.frame_bytes()].into() }
    }

    /// The raw PCM16LE bytes, exactly `F` long.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Frame length in bytes (always `F` for a validly constructed frame).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Frames are never empty — a frame is at minimum `F` bytes and `F > 0`.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_is_8k_320() {
        let cfg = SampleConfig::NARROWBAND;
        assert_eq!(cfg.sample_rate(), 8000);
        assert_eq!(cfg.frame_bytes(), 320);
        assert_eq!(cfg.samples_per_frame(), 160);
    }

    #[test]
    fn wideband_pair_is_16k_640() {
        let cfg = SampleConfig::WIDEBAND;
        assert_eq!(cfg.sample_rate(), 16000);
        assert_eq!(cfg.frame_bytes(), 640);
    }

    #[test]
    fn from_sample_rate_derives_frame_bytes() {
        assert_eq!(SampleConfig::from_sample_rate(8000).unwrap(), SampleConfig::NARROWBAND);
        assert_eq!(SampleConfig::from_sample_rate(16000).unwrap(), SampleConfig::WIDEBAND);
    }

    #[test]
    fn unsupported_rate_is_rejected() {
        assert!(SampleConfig::from_sample_rate(44100).is_err());
        assert!(SampleConfig::new(8000, 321).is_err());
    }

    #[test]
    fn frame_rejects_wrong_length() {
        let cfg = SampleConfig::NARROWBAND;
        assert!(AudioFrame::new(vec![0u8; 319], cfg).is_err());
        assert!(AudioFrame::new(vec![0u8; 320], cfg).is_ok());
    }

    #[test]
    fn silence_frame_is_all_zero_and_exact_length() {
        let cfg = SampleConfig::NARROWBAND;
        let frame = AudioFrame::silence(cfg);
        assert_eq!(frame.len(), 320);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }
}
