//! G.711 μ-law companding (ITU-T G.711).
//!
//! Encoding follows the ITU reference algorithm bit for bit, so frames
//! produced here are indistinguishable from those of a carrier gateway.

use std::sync::LazyLock;

/// Linear scale used when converting between i16 and normalized f32.
pub const PCM16_SCALE: f32 = 32767.0;

const ULAW_BIAS: i16 = 33;
const ULAW_CLIP: i16 = 0x1FFF;

/// μ-law byte to normalized sample in `[-1.0, 1.0]`.
static ULAW_DECODE_TABLE: LazyLock<[f32; 256]> = LazyLock::new(|| {
    let mut table = [0.0f32; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = ulaw_expand(code as u8) as f32 / PCM16_SCALE;
    }
    table
});

/// Compress a 16-bit linear sample to μ-law.
pub fn ulaw_compress(sample: i16) -> u8 {
    // 16-bit input is reduced to the 14-bit magnitude the standard operates on
    let magnitude = if sample < 0 {
        (((!sample) as u16) >> 2) as i16 + ULAW_BIAS
    } else {
        (sample >> 2) + ULAW_BIAS
    };
    let magnitude = magnitude.min(ULAW_CLIP);

    let mut segment: i16 = 1;
    let mut shifted = magnitude >> 6;
    while shifted != 0 {
        segment += 1;
        shifted >>= 1;
    }

    let high_nibble = 0x0008 - segment;
    let low_nibble = 0x000F - ((magnitude >> segment) & 0x000F);
    let mut code = (high_nibble << 4) | low_nibble;
    if sample >= 0 {
        code |= 0x0080;
    }
    code as u8
}

/// Expand a μ-law byte to a 16-bit linear sample.
pub fn ulaw_expand(code: u8) -> i16 {
    let sign: i16 = if code < 0x80 { -1 } else { 1 };
    let inverted = (!code) as i16;
    let exponent = (inverted >> 4) & 0x0007;
    let mantissa = inverted & 0x000F;
    let step = 4 << (exponent + 1);

    sign * ((0x0080 << exponent) + step * mantissa + step / 2 - 4 * ULAW_BIAS)
}

/// Decode μ-law bytes to normalized samples through the lookup table.
pub fn decode_to_f32(encoded: &[u8]) -> Vec<f32> {
    let table = &*ULAW_DECODE_TABLE;
    encoded.iter().map(|&code| table[code as usize]).collect()
}

/// Encode normalized samples to μ-law, clamping to `[-1.0, 1.0]`.
pub fn encode_from_f32(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .map(|&s| ulaw_compress(quantize(s)))
        .collect()
}

/// Normalized sample to i16 with clamping and rounding.
pub(crate) fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * PCM16_SCALE).round() as i16
}
