//! Decoded sample data and WAV decoding.

use std::io::Cursor;

use crate::AssetError;

/// A decoded audio asset, shared read-only between voices.
///
/// Stored downmixed to mono; sampler voices pitch-shift by stepping
/// through `data` at a fractional rate.
#[derive(Clone, Debug)]
pub struct DecodedSample {
    data: Vec<f32>,
    sample_rate: u32,
}

impl DecodedSample {
    pub fn new(data: Vec<f32>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    pub fn frames(&self) -> usize {
        self.data.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate as f64
    }

    /// Linearly interpolated sample value at a fractional frame position.
    ///
    /// Positions past the end read as silence.
    pub fn value_at(&self, pos: f64) -> f32 {
        if pos < 0.0 {
            return 0.0;
        }
        let idx = pos as usize;
        if idx + 1 >= self.data.len() {
            return if idx < self.data.len() { self.data[idx] } else { 0.0 };
        }
        let frac = (pos - idx as f64) as f32;
        self.data[idx] * (1.0 - frac) + self.data[idx + 1] * frac
    }
}

/// Decode WAV bytes into a mono [`DecodedSample`].
///
/// Multi-channel files are downmixed by averaging. Integer formats are
/// normalized to [-1, 1].
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedSample, AssetError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mut data = Vec::with_capacity(interleaved.len() / channels);
    for frame in interleaved.chunks_exact(channels) {
        data.push(frame.iter().sum::<f32>() / channels as f32);
    }

    Ok(DecodedSample::new(data, spec.sample_rate))
}
