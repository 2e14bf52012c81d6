//! One-shot voices: oscillator synths and pitched sample playback.
//!
//! A voice is a source node scheduled at an absolute start frame with a
//! fixed gain envelope. It renders silence outside its window and is
//! removed from the graph once its stop frame has passed.

use std::sync::Arc;

use bg_assets::DecodedSample;
use bg_ir::StereoBuffer;

use crate::envelope::Envelope;
use crate::graph::{AudioNode, RenderCtx};

/// Oscillator shape for synth voices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Square,
    Sawtooth,
}

/// Tail after the note length during which the synth envelope decays.
pub const SYNTH_RELEASE_SECS: f64 = 0.1;
/// Tail after the note length during which a sample keeps playing.
pub const SAMPLER_RELEASE_SECS: f64 = 0.5;

/// A monophonic oscillator voice with an attack/decay envelope.
pub struct SynthVoice {
    freq: f32,
    waveform: Waveform,
    phase: f32,
    start_frame: u64,
    stop_frame: u64,
    envelope: Envelope,
}

impl SynthVoice {
    pub fn new(
        freq: f32,
        waveform: Waveform,
        start_frame: u64,
        duration_secs: f64,
        sample_rate: u32,
    ) -> Self {
        let sr = sample_rate as f64;
        let attack_end = start_frame + (0.01 * sr) as u64;
        let decay_end = start_frame + (duration_secs * sr) as u64;
        let stop_frame = start_frame + ((duration_secs + SYNTH_RELEASE_SECS) * sr) as u64;
        let envelope = Envelope::new()
            .set_value_at(0.001, start_frame)
            .linear_ramp_to(0.1, attack_end.max(start_frame + 1))
            .exponential_ramp_to(0.001, decay_end.max(attack_end + 1));
        Self {
            freq,
            waveform,
            phase: 0.0,
            start_frame,
            stop_frame,
            envelope,
        }
    }

    pub fn stop_frame(&self) -> u64 {
        self.stop_frame
    }

    fn sample(&self) -> f32 {
        match self.waveform {
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
        }
    }
}

impl AudioNode for SynthVoice {
    fn process(&mut self, _input: &StereoBuffer, output: &mut StereoBuffer, ctx: &RenderCtx) {
        let phase_inc = self.freq / ctx.sample_rate as f32;
        let (left, right) = output.channels_mut();
        for i in 0..ctx.frames {
            let frame = ctx.start_frame + i as u64;
            let value = if frame >= self.start_frame && frame < self.stop_frame {
                let v = self.sample() * self.envelope.value_at(frame);
                self.phase += phase_inc;
                if self.phase >= 1.0 {
                    self.phase -= 1.0;
                }
                v
            } else {
                0.0
            };
            left[i] = value;
            right[i] = value;
        }
    }
}

/// Plays a decoded sample at a pitch-shifted rate.
pub struct SamplerVoice {
    sample: Arc<DecodedSample>,
    /// Playback position in source frames, advanced by `step` per
    /// output frame.
    pos: f64,
    step: f64,
    start_frame: u64,
    stop_frame: u64,
    envelope: Envelope,
}

impl SamplerVoice {
    /// `rate` is the pitch ratio (target frequency over the sample's
    /// root frequency); resampling to the output rate is folded in.
    pub fn new(
        sample: Arc<DecodedSample>,
        rate: f64,
        start_frame: u64,
        duration_secs: f64,
        sample_rate: u32,
    ) -> Self {
        let sr = sample_rate as f64;
        let decay_end = start_frame + (duration_secs * sr) as u64;
        let stop_frame = start_frame + ((duration_secs + SAMPLER_RELEASE_SECS) * sr) as u64;
        let envelope = Envelope::new()
            .set_value_at(0.5, start_frame)
            .exponential_ramp_to(0.01, decay_end.max(start_frame + 1));
        let step = rate * sample.sample_rate() as f64 / sr;
        Self {
            sample,
            pos: 0.0,
            step,
            start_frame,
            stop_frame,
            envelope,
        }
    }

    pub fn stop_frame(&self) -> u64 {
        self.stop_frame
    }
}

impl AudioNode for SamplerVoice {
    fn process(&mut self, _input: &StereoBuffer, output: &mut StereoBuffer, ctx: &RenderCtx) {
        let (left, right) = output.channels_mut();
        for i in 0..ctx.frames {
            let frame = ctx.start_frame + i as u64;
            let value = if frame >= self.start_frame && frame < self.stop_frame {
                let v = self.sample.value_at(self.pos) * self.envelope.value_at(frame);
                self.pos += self.step;
                v
            } else {
                0.0
            };
            left[i] = value;
            right[i] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(node: &mut dyn AudioNode, start_frame: u64, frames: usize, sr: u32) -> StereoBuffer {
        let input = StereoBuffer::new(frames);
        let mut output = StereoBuffer::new(frames);
        let ctx = RenderCtx {
            sample_rate: sr,
            start_frame,
            frames,
        };
        node.process(&input, &mut output, &ctx);
        output
    }

    #[test]
    fn synth_is_silent_before_start() {
        let mut v = SynthVoice::new(440.0, Waveform::Square, 1000, 0.25, 44100);
        let out = render(&mut v, 0, 512, 44100);
        assert_eq!(out.peak(), 0.0);
    }

    #[test]
    fn synth_sounds_inside_window() {
        let mut v = SynthVoice::new(440.0, Waveform::Square, 0, 0.25, 44100);
        // Skip the first block so the attack has landed
        render(&mut v, 0, 512, 44100);
        let out = render(&mut v, 512, 512, 44100);
        assert!(out.peak() > 0.01);
    }

    #[test]
    fn synth_stop_frame_covers_release_tail() {
        let v = SynthVoice::new(440.0, Waveform::Square, 0, 0.25, 44100);
        let expected = ((0.25 + SYNTH_RELEASE_SECS) * 44100.0) as u64;
        assert_eq!(v.stop_frame(), expected);
    }

    #[test]
    fn synth_is_silent_after_stop() {
        let mut v = SynthVoice::new(440.0, Waveform::Square, 0, 0.01, 1000);
        let stop = v.stop_frame();
        let out = render(&mut v, stop, 64, 1000);
        assert_eq!(out.peak(), 0.0);
    }

    #[test]
    fn sawtooth_spans_full_range() {
        let mut v = SynthVoice::new(100.0, Waveform::Sawtooth, 0, 1.0, 1000);
        let out = render(&mut v, 100, 512, 1000);
        let min = out.left().iter().cloned().fold(f32::INFINITY, f32::min);
        let max = out.left().iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(min < 0.0 && max > 0.0);
    }

    #[test]
    fn sampler_plays_at_unit_rate() {
        // A short ramp sample at the output rate plays back unchanged
        // apart from the envelope.
        let data: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let sample = Arc::new(DecodedSample::new(data, 1000));
        let mut v = SamplerVoice::new(sample, 1.0, 0, 0.05, 1000);
        let out = render(&mut v, 0, 10, 1000);
        // Envelope starts at 0.5, so sample value 0.04 at frame 4
        // appears scaled by roughly half.
        assert!(out.left()[4] > 0.0);
        assert!(out.left()[4] < 0.04);
    }

    #[test]
    fn sampler_runs_out_of_sample_data() {
        let sample = Arc::new(DecodedSample::new(vec![1.0; 10], 1000));
        let mut v = SamplerVoice::new(sample, 1.0, 0, 0.5, 1000);
        let out = render(&mut v, 0, 64, 1000);
        // Past the end of the sample data the voice outputs silence.
        assert!(out.left()[5].abs() > 0.0);
        assert_eq!(out.left()[20], 0.0);
    }

    #[test]
    fn sampler_rate_doubles_position_step() {
        let data: Vec<f32> = (0..200).map(|i| i as f32).collect();
        let sample = Arc::new(DecodedSample::new(data, 1000));
        let mut fast = SamplerVoice::new(sample.clone(), 2.0, 0, 1.0, 1000);
        let mut slow = SamplerVoice::new(sample, 1.0, 0, 1.0, 1000);
        let out_fast = render(&mut fast, 0, 50, 1000);
        let out_slow = render(&mut slow, 0, 50, 1000);
        // Same output frame reads twice as far into the source.
        let ratio = out_fast.left()[40] / out_slow.left()[40];
        assert!((ratio - 2.0).abs() < 0.1);
    }
}
