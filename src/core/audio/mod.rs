//! Audio frames and transcoding between the telephony and realtime legs.
//!
//! The telephony provider streams G.711 μ-law, 8 kHz, mono. The realtime
//! endpoint consumes and produces PCM 16-bit signed little-endian, 24 kHz,
//! mono. This module converts between the two.
//!
//! # Stateless vs streaming
//!
//! [`decode_inbound`] and [`encode_outbound`] convert one frame in isolation
//! and keep no state between calls. Resampling each 20 ms frame on its own
//! zero-pads the filter at both edges, which produces small discontinuities
//! at frame boundaries. A live call therefore uses [`InboundTranscoder`] and
//! [`OutboundTranscoder`], which carry the resampler history across frames.
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use sage_bridge::core::audio::{AudioFrame, decode_inbound};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frame = AudioFrame::mulaw(Bytes::from(vec![0xFFu8; 160]));
//! let linear = decode_inbound(&frame)?;
//! assert_eq!(linear.sample_count(), 480);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

pub mod g711;
mod resample;
mod transcoder;

pub use resample::StreamResampler;
pub use transcoder::{
    InboundTranscoder, OutboundTranscoder, decode_inbound, encode_outbound, f32_to_pcm16,
    pcm16_to_f32,
};

/// Sample rate of the telephony media stream (Hz)
pub const TELEPHONY_SAMPLE_RATE: u32 = 8_000;

/// Sample rate of the realtime endpoint audio (Hz)
pub const REALTIME_SAMPLE_RATE: u32 = 24_000;

/// Errors raised while converting audio.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Byte length does not divide into whole samples
    #[error("Malformed audio: {len} bytes is not a multiple of the {width}-byte sample width")]
    MalformedAudio { len: usize, width: usize },

    /// Frame is not in the format the conversion expects
    #[error("Unsupported audio format: expected {expected}, got {actual}")]
    UnsupportedFormat {
        expected: AudioFormat,
        actual: AudioFormat,
    },

    /// Format with no channels or a zero sample rate
    #[error("Invalid audio format: {0}")]
    InvalidFormat(AudioFormat),

    /// Resampler construction or processing failed
    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Sample encoding of an audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEncoding {
    /// G.711 μ-law, one byte per sample
    Mulaw,
    /// Signed 16-bit little-endian PCM
    Pcm16,
}

impl AudioEncoding {
    /// Bytes per sample for this encoding.
    pub const fn sample_width(self) -> usize {
        match self {
            AudioEncoding::Mulaw => 1,
            AudioEncoding::Pcm16 => 2,
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioEncoding::Mulaw => write!(f, "mulaw"),
            AudioEncoding::Pcm16 => write!(f, "pcm16"),
        }
    }
}

/// Format descriptor carried by every [`AudioFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    /// μ-law, 8 kHz, mono
    pub const TELEPHONY: AudioFormat = AudioFormat {
        encoding: AudioEncoding::Mulaw,
        sample_rate: TELEPHONY_SAMPLE_RATE,
        channels: 1,
    };

    /// PCM16, 24 kHz, mono
    pub const REALTIME: AudioFormat = AudioFormat {
        encoding: AudioEncoding::Pcm16,
        sample_rate: REALTIME_SAMPLE_RATE,
        channels: 1,
    };

    /// Bytes per sample frame across all channels.
    pub const fn frame_width(&self) -> usize {
        self.encoding.sample_width() * self.channels as usize
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}Hz {}ch",
            self.encoding, self.sample_rate, self.channels
        )
    }
}

/// Immutable audio buffer tagged with its format.
///
/// Conversions never mutate a frame; they return a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Bytes,
    format: AudioFormat,
}

impl AudioFrame {
    /// Frame in an arbitrary format.
    ///
    /// # Errors
    /// [`AudioError::InvalidFormat`] if the format has zero channels or a zero
    /// sample rate.
    pub fn new(data: Bytes, format: AudioFormat) -> AudioResult<Self> {
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(AudioError::InvalidFormat(format));
        }
        Ok(Self { data, format })
    }

    /// Telephony frame (μ-law, 8 kHz, mono).
    pub fn mulaw(data: Bytes) -> Self {
        Self {
            data,
            format: AudioFormat::TELEPHONY,
        }
    }

    /// Realtime frame (PCM16, 24 kHz, mono).
    pub fn pcm16(data: Bytes) -> Self {
        Self {
            data,
            format: AudioFormat::REALTIME,
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of samples per channel, ignoring any trailing partial sample.
    pub fn sample_count(&self) -> usize {
        self.data.len() / self.format.frame_width()
    }

    /// Duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        (self.sample_count() as u64 * 1000) / self.format.sample_rate as u64
    }

    pub(crate) fn ensure_format(&self, expected: AudioFormat) -> AudioResult<()> {
        if self.format != expected {
            return Err(AudioError::UnsupportedFormat {
                expected,
                actual: self.format,
            });
        }
        Ok(())
    }

    pub(crate) fn ensure_aligned(&self) -> AudioResult<()> {
        let width = self.format.frame_width();
        if self.data.len() % width != 0 {
            return Err(AudioError::MalformedAudio {
                len: self.data.len(),
                width,
            });
        }
        Ok(())
    }
}
