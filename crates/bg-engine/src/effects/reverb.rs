//! Comb-filter reverb effect.

use bg_ir::StereoBuffer;

use crate::effect::{EffectInfo, EffectStage, ParamSpec};
use crate::graph::RenderCtx;
use crate::ramp::Ramp;

const DEFAULT_WET: f32 = 1.5;

/// Schroeder-style comb delays in seconds, mutually inharmonic so the
/// tails smear instead of ringing at one pitch.
const COMB_DELAYS: [f32; 4] = [0.0297, 0.0371, 0.0411, 0.0437];
const COMB_FEEDBACK: [f32; 4] = [0.805, 0.827, 0.783, 0.764];

const INFO: EffectInfo = EffectInfo {
    name: "Reverb",
    params: &[ParamSpec { name: "wet", min: 0.0, max: 2.0, default: DEFAULT_WET }],
};

struct Comb {
    line: Vec<f32>,
    pos: usize,
    feedback: f32,
}

impl Comb {
    fn new(delay_secs: f32, feedback: f32, sample_rate: u32) -> Self {
        let len = ((delay_secs * sample_rate as f32) as usize).max(1);
        Self { line: vec![0.0; len], pos: 0, feedback }
    }

    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let out = self.line[self.pos];
        self.line[self.pos] = input + out * self.feedback;
        self.pos = (self.pos + 1) % self.line.len();
        out
    }
}

/// Parallel feedback combs mixed over the dry signal.
pub struct Reverb {
    combs_l: Vec<Comb>,
    combs_r: Vec<Comb>,
    wet: Ramp,
}

impl Reverb {
    pub fn new(sample_rate: u32) -> Self {
        let build = || {
            COMB_DELAYS
                .iter()
                .zip(COMB_FEEDBACK.iter())
                .map(|(&d, &f)| Comb::new(d, f, sample_rate))
                .collect()
        };
        Self {
            combs_l: build(),
            combs_r: build(),
            wet: Ramp::new(DEFAULT_WET, sample_rate),
        }
    }
}

impl EffectStage for Reverb {
    fn info(&self) -> EffectInfo {
        INFO
    }

    fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer, ctx: &RenderCtx) {
        let scale = 1.0 / COMB_DELAYS.len() as f32;
        let (out_l, out_r) = output.channels_mut();
        for i in 0..ctx.frames {
            let wet = self.wet.next() * scale;
            let (in_l, in_r) = (input.left()[i], input.right()[i]);

            let mut tail_l = 0.0;
            for comb in &mut self.combs_l {
                tail_l += comb.tick(in_l);
            }
            let mut tail_r = 0.0;
            for comb in &mut self.combs_r {
                tail_r += comb.tick(in_r);
            }

            out_l[i] = in_l + tail_l * wet;
            out_r[i] = in_r + tail_r * wet;
        }
    }

    fn set_param(&mut self, name: &str, value: f32, ramp_secs: f32) -> bool {
        if name == "wet" {
            self.wet.set_target(value, ramp_secs);
            true
        } else {
            false
        }
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        (name == "wet").then(|| self.wet.target())
    }
}
