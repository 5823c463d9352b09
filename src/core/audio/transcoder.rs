use bytes::{BufMut, Bytes, BytesMut};

use super::g711::{self, PCM16_SCALE};
use super::resample::StreamResampler;
use super::{AudioFormat, AudioFrame, AudioResult, REALTIME_SAMPLE_RATE, TELEPHONY_SAMPLE_RATE};

/// Convert little-endian PCM16 bytes to normalized samples.
///
/// A trailing odd byte is ignored; callers validate alignment first.
pub fn pcm16_to_f32(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(2)
        .map(|pair| (i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE).clamp(-1.0, 1.0))
        .collect()
}

/// Convert normalized samples to little-endian PCM16 bytes.
pub fn f32_to_pcm16(samples: &[f32]) -> Bytes {
    let mut out = BytesMut::with_capacity(samples.len() * 2);
    for &sample in samples {
        out.put_i16_le(g711::quantize(sample));
    }
    out.freeze()
}

/// Decode a telephony frame (μ-law 8 kHz) into a realtime frame (PCM16 24 kHz).
///
/// Stateless: every call starts from a fresh resampler, so consecutive frames
/// are filtered independently.
///
/// # Errors
/// - [`AudioError::UnsupportedFormat`](super::AudioError::UnsupportedFormat) if the frame is not telephony audio
/// - [`AudioError::MalformedAudio`](super::AudioError::MalformedAudio) if the length is not whole samples
pub fn decode_inbound(frame: &AudioFrame) -> AudioResult<AudioFrame> {
    frame.ensure_format(AudioFormat::TELEPHONY)?;
    frame.ensure_aligned()?;

    let samples = g711::decode_to_f32(frame.data());
    let mut resampler = StreamResampler::new(TELEPHONY_SAMPLE_RATE, REALTIME_SAMPLE_RATE)?;
    let mut upsampled = resampler.push(&samples)?;
    upsampled.extend(resampler.finish()?);

    Ok(AudioFrame::pcm16(f32_to_pcm16(&upsampled)))
}

/// Encode a realtime frame (PCM16 24 kHz) into a telephony frame (μ-law 8 kHz).
///
/// Stateless counterpart of [`OutboundTranscoder`].
pub fn encode_outbound(frame: &AudioFrame) -> AudioResult<AudioFrame> {
    frame.ensure_format(AudioFormat::REALTIME)?;
    frame.ensure_aligned()?;

    let samples = pcm16_to_f32(frame.data());
    let mut resampler = StreamResampler::new(REALTIME_SAMPLE_RATE, TELEPHONY_SAMPLE_RATE)?;
    let mut downsampled = resampler.push(&samples)?;
    downsampled.extend(resampler.finish()?);

    Ok(AudioFrame::mulaw(Bytes::from(g711::encode_from_f32(
        &downsampled,
    ))))
}

/// Per-call decoder for the caller's audio.
///
/// Keeps resampler history between frames. Output trails input by part of
/// a 20 ms chunk; [`flush`](Self::flush) releases the remainder at the end
/// of the stream.
pub struct InboundTranscoder {
    resampler: StreamResampler,
}

impl InboundTranscoder {
    pub fn new() -> AudioResult<Self> {
        Ok(Self {
            resampler: StreamResampler::new(TELEPHONY_SAMPLE_RATE, REALTIME_SAMPLE_RATE)?,
        })
    }

    pub fn transcode(&mut self, frame: &AudioFrame) -> AudioResult<AudioFrame> {
        frame.ensure_format(AudioFormat::TELEPHONY)?;
        frame.ensure_aligned()?;

        let samples = g711::decode_to_f32(frame.data());
        let upsampled = self.resampler.push(&samples)?;
        Ok(AudioFrame::pcm16(f32_to_pcm16(&upsampled)))
    }

    pub fn flush(&mut self) -> AudioResult<AudioFrame> {
        let tail = self.resampler.finish()?;
        Ok(AudioFrame::pcm16(f32_to_pcm16(&tail)))
    }
}

/// Per-call encoder for the agent's audio.
pub struct OutboundTranscoder {
    resampler: StreamResampler,
}

impl OutboundTranscoder {
    pub fn new() -> AudioResult<Self> {
        Ok(Self {
            resampler: StreamResampler::new(REALTIME_SAMPLE_RATE, TELEPHONY_SAMPLE_RATE)?,
        })
    }

    pub fn transcode(&mut self, frame: &AudioFrame) -> AudioResult<AudioFrame> {
        frame.ensure_format(AudioFormat::REALTIME)?;
        frame.ensure_aligned()?;

        let samples = pcm16_to_f32(frame.data());
        let downsampled = self.resampler.push(&samples)?;
        Ok(AudioFrame::mulaw(Bytes::from(g711::encode_from_f32(
            &downsampled,
        ))))
    }

    pub fn flush(&mut self) -> AudioResult<AudioFrame> {
        let tail = self.resampler.finish()?;
        Ok(AudioFrame::mulaw(Bytes::from(g711::encode_from_f32(&tail))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::AudioError;

    fn mulaw_sine(freq: f32, len: usize) -> (Vec<f32>, AudioFrame) {
        let samples: Vec<f32> = (0..len)
            .map(|n| {
                0.5 * (2.0 * std::f32::consts::PI * freq * n as f32 / TELEPHONY_SAMPLE_RATE as f32)
                    .sin()
            })
            .collect();
        let encoded = g711::encode_from_f32(&samples);
        (samples, AudioFrame::mulaw(Bytes::from(encoded)))
    }

    /// Mean absolute error over the middle half, at the best lag within ±4 samples.
    fn aligned_error(reference: &[f32], candidate: &[f32]) -> f32 {
        let len = reference.len().min(candidate.len());
        let start = len / 4;
        let end = len - len / 4;
        (-4i32..=4)
            .map(|lag| {
                let total: f32 = (start..end)
                    .map(|i| {
                        let j = (i as i32 + lag).clamp(0, len as i32 - 1) as usize;
                        (reference[i] - candidate[j]).abs()
                    })
                    .sum();
                total / (end - start) as f32
            })
            .fold(f32::INFINITY, f32::min)
    }

    #[test]
    fn test_round_trip_preserves_signal() {
        let (original, frame) = mulaw_sine(440.0, 8_000);

        let linear = decode_inbound(&frame).unwrap();
        assert_eq!(linear.format(), AudioFormat::REALTIME);
        assert_eq!(linear.sample_count(), 24_000);

        let back = encode_outbound(&linear).unwrap();
        assert_eq!(back.format(), AudioFormat::TELEPHONY);
        assert_eq!(back.sample_count(), 8_000);

        let recovered = g711::decode_to_f32(back.data());
        let error = aligned_error(&original, &recovered);
        assert!(error < 0.03, "mean abs error {error}");
    }

    #[test]
    fn test_decode_rejects_wrong_format() {
        let frame = AudioFrame::pcm16(Bytes::from(vec![0u8; 320]));
        assert!(matches!(
            decode_inbound(&frame),
            Err(AudioError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_odd_length() {
        let frame = AudioFrame::pcm16(Bytes::from(vec![0u8; 961]));
        match encode_outbound(&frame) {
            Err(AudioError::MalformedAudio { len, width }) => {
                assert_eq!(len, 961);
                assert_eq!(width, 2);
            }
            other => panic!("expected MalformedAudio, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_frames() {
        let decoded = decode_inbound(&AudioFrame::mulaw(Bytes::new())).unwrap();
        assert!(decoded.is_empty());
        let encoded = encode_outbound(&AudioFrame::pcm16(Bytes::new())).unwrap();
        assert!(encoded.is_empty());
    }

    #[test]
    fn test_decode_does_not_mutate_input() {
        let (_, frame) = mulaw_sine(300.0, 160);
        let before = frame.clone();
        let _ = decode_inbound(&frame).unwrap();
        assert_eq!(frame, before);
    }

    #[test]
    fn test_streaming_matches_whole_signal() {
        let (_, frame) = mulaw_sine(440.0, 1_600);
        let whole = decode_inbound(&frame).unwrap();

        let mut transcoder = InboundTranscoder::new().unwrap();
        let mut streamed = BytesMut::new();
        for chunk in frame.data().chunks(160) {
            let part = transcoder
                .transcode(&AudioFrame::mulaw(Bytes::copy_from_slice(chunk)))
                .unwrap();
            streamed.extend_from_slice(part.data());
        }
        streamed.extend_from_slice(transcoder.flush().unwrap().data());

        let whole = pcm16_to_f32(whole.data());
        let streamed = pcm16_to_f32(&streamed);
        assert_eq!(whole.len(), streamed.len());
        let max_diff = whole
            .iter()
            .zip(&streamed)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_diff < 1e-3, "max diff {max_diff}");
    }

    #[test]
    fn test_per_frame_stateless_decode_has_boundary_artifacts() {
        let (_, frame) = mulaw_sine(440.0, 1_600);
        let whole = pcm16_to_f32(decode_inbound(&frame).unwrap().data());

        let mut per_frame = Vec::with_capacity(whole.len());
        for chunk in frame.data().chunks(160) {
            let part = decode_inbound(&AudioFrame::mulaw(Bytes::copy_from_slice(chunk))).unwrap();
            per_frame.extend(pcm16_to_f32(part.data()));
        }

        assert_eq!(whole.len(), per_frame.len());
        let max_diff = whole
            .iter()
            .zip(&per_frame)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_diff > 0.05, "expected boundary artifacts, max diff {max_diff}");
    }

    #[test]
    fn test_outbound_streaming_length() {
        let mut transcoder = OutboundTranscoder::new().unwrap();
        let mut total = 0;
        // Realtime deltas arrive in irregular sizes
        for size in [4800usize, 1234 * 2, 960, 2] {
            let frame = AudioFrame::pcm16(Bytes::from(vec![0u8; size]));
            total += transcoder.transcode(&frame).unwrap().sample_count();
        }
        total += transcoder.flush().unwrap().sample_count();
        let input_samples = (4800 + 1234 * 2 + 960 + 2) / 2;
        assert_eq!(total, (input_samples as f64 / 3.0).round() as usize);
    }
}
