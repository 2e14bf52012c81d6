//! Feedback delay effect.

use bg_ir::StereoBuffer;

use crate::effect::{EffectInfo, EffectStage, ParamSpec};
use crate::graph::RenderCtx;
use crate::ramp::Ramp;

const DELAY_SECS: f32 = 0.3;
const DEFAULT_FEEDBACK: f32 = 0.4;
const DEFAULT_WET: f32 = 0.8;

const INFO: EffectInfo = EffectInfo {
    name: "Delay",
    params: &[
        ParamSpec { name: "wet", min: 0.0, max: 1.0, default: DEFAULT_WET },
        ParamSpec { name: "feedback", min: 0.0, max: 0.95, default: DEFAULT_FEEDBACK },
    ],
};

/// A fixed-time echo with a feedback loop, mixed over the dry signal.
pub struct Delay {
    line_l: Vec<f32>,
    line_r: Vec<f32>,
    pos: usize,
    wet: Ramp,
    feedback: Ramp,
}

impl Delay {
    pub fn new(sample_rate: u32) -> Self {
        let len = ((DELAY_SECS * sample_rate as f32) as usize).max(1);
        Self {
            line_l: vec![0.0; len],
            line_r: vec![0.0; len],
            pos: 0,
            wet: Ramp::new(DEFAULT_WET, sample_rate),
            feedback: Ramp::new(DEFAULT_FEEDBACK, sample_rate),
        }
    }
}

impl EffectStage for Delay {
    fn info(&self) -> EffectInfo {
        INFO
    }

    fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer, ctx: &RenderCtx) {
        let (out_l, out_r) = output.channels_mut();
        for i in 0..ctx.frames {
            let wet = self.wet.next();
            let feedback = self.feedback.next();
            let (in_l, in_r) = (input.left()[i], input.right()[i]);

            let echo_l = self.line_l[self.pos];
            let echo_r = self.line_r[self.pos];
            self.line_l[self.pos] = in_l + echo_l * feedback;
            self.line_r[self.pos] = in_r + echo_r * feedback;
            self.pos = (self.pos + 1) % self.line_l.len();

            out_l[i] = in_l + echo_l * wet;
            out_r[i] = in_r + echo_r * wet;
        }
    }

    fn set_param(&mut self, name: &str, value: f32, ramp_secs: f32) -> bool {
        match name {
            "wet" => self.wet.set_target(value, ramp_secs),
            "feedback" => self.feedback.set_target(value, ramp_secs),
            _ => return false,
        }
        true
    }

    fn get_param(&self, name: &str) -> Option<f32> {
        match name {
            "wet" => Some(self.wet.target()),
            "feedback" => Some(self.feedback.target()),
            _ => None,
        }
    }
}
