//! Band-limited sample rate conversion on top of `rubato`.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::{AudioError, AudioResult};

/// Length of the windowed sinc filter (taps).
const SINC_LEN: usize = 128;

/// Oversampling factor of the interpolation table.
const OVERSAMPLING_FACTOR: usize = 128;

/// Cutoff relative to the lower Nyquist frequency.
const F_CUTOFF: f32 = 0.95;

/// Chunks are sized to 20 ms of input, the telephony packetization interval.
const CHUNK_MS: u32 = 20;

/// Streaming mono resampler with a fixed ratio.
///
/// Input is buffered until a whole chunk is available, so the filter sees a
/// continuous signal across calls to [`push`](Self::push). Output starts at
/// the first input sample; nothing is trimmed from the head.
/// [`finish`](Self::finish) drains the tail so the total output length is
/// `round(input_len * ratio)`.
pub struct StreamResampler {
    inner: SincFixedIn<f32>,
    ratio: f64,
    pending: Vec<f32>,
    consumed: u64,
    emitted: u64,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32) -> AudioResult<Self> {
        if from_rate == 0 || to_rate == 0 {
            return Err(AudioError::Resample(format!(
                "invalid sample rates {from_rate} -> {to_rate}"
            )));
        }

        let ratio = to_rate as f64 / from_rate as f64;
        let chunk_size = (from_rate * CHUNK_MS / 1000).max(1) as usize;
        let params = SincInterpolationParameters {
            sinc_len: SINC_LEN,
            f_cutoff: F_CUTOFF,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: OVERSAMPLING_FACTOR,
            window: WindowFunction::BlackmanHarris2,
        };

        let inner = SincFixedIn::<f32>::new(ratio, 1.0, params, chunk_size, 1)
            .map_err(|e| AudioError::Resample(e.to_string()))?;

        Ok(Self {
            inner,
            ratio,
            pending: Vec::with_capacity(chunk_size * 2),
            consumed: 0,
            emitted: 0,
        })
    }

    /// Feed samples and return whatever output is ready.
    pub fn push(&mut self, input: &[f32]) -> AudioResult<Vec<f32>> {
        self.pending.extend_from_slice(input);
        self.consumed += input.len() as u64;

        let mut output = Vec::with_capacity((input.len() as f64 * self.ratio).ceil() as usize);
        loop {
            let needed = self.inner.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            let processed = self
                .inner
                .process(&[chunk.as_slice()], None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            self.emit(&processed, &mut output);
        }
        Ok(output)
    }

    /// Flush buffered input and the filter tail.
    ///
    /// The resampler is reset afterwards and can be reused.
    pub fn finish(&mut self) -> AudioResult<Vec<f32>> {
        let mut output = Vec::new();

        if !self.pending.is_empty() {
            let chunk = std::mem::take(&mut self.pending);
            let processed = self
                .inner
                .process_partial(Some(&[chunk.as_slice()]), None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            self.emit(&processed, &mut output);
        }

        while self.emitted < self.expected_output() {
            let processed = self
                .inner
                .process_partial(None::<&[&[f32]]>, None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            if processed.first().is_none_or(|channel| channel.is_empty()) {
                break;
            }
            self.emit(&processed, &mut output);
        }

        self.reset();
        Ok(output)
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.pending.clear();
        self.consumed = 0;
        self.emitted = 0;
    }

    fn expected_output(&self) -> u64 {
        (self.consumed as f64 * self.ratio).round() as u64
    }

    fn emit(&mut self, processed: &[Vec<f32>], output: &mut Vec<f32>) {
        let Some(samples) = processed.first() else {
            return;
        };

        let room = self.expected_output().saturating_sub(self.emitted) as usize;
        let take = samples.len().min(room);
        output.extend_from_slice(&samples[..take]);
        self.emitted += take as u64;
    }
}
