//! WAV encoding of rendered frames.

use std::io::{Cursor, Write};

use bg_engine::Frame;

fn spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encode frames as 16-bit stereo PCM to any seekable writer.
pub fn write_wav<W>(writer: W, frames: &[Frame], sample_rate: u32) -> Result<(), hound::Error>
where
    W: Write + std::io::Seek,
{
    let mut wav = hound::WavWriter::new(writer, spec(sample_rate))?;
    for frame in frames {
        wav.write_sample(to_i16(frame.left))?;
        wav.write_sample(to_i16(frame.right))?;
    }
    wav.finalize()
}

/// Encode frames as an in-memory WAV file.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, frames, sample_rate).expect("in-memory wav write cannot fail");
    cursor.into_inner()
}
