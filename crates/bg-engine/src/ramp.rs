//! Smoothed parameter values for click-free control changes.

/// Smoothing time applied to volume and effect parameter changes.
pub const PARAM_SMOOTH_SECS: f32 = 0.05;

/// A parameter value that moves to its target over a short ramp.
///
/// Call [`Ramp::next`] once per sample; abrupt target changes become
/// linear glides so gain changes never click.
#[derive(Clone, Copy, Debug)]
pub struct Ramp {
    current: f32,
    target: f32,
    step: f32,
    samples_remaining: u32,
    sample_rate: f32,
}

impl Ramp {
    pub fn new(initial: f32, sample_rate: u32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            samples_remaining: 0,
            sample_rate: sample_rate as f32,
        }
    }

    /// Glide to `target` over `smooth_secs`.
    pub fn set_target(&mut self, target: f32, smooth_secs: f32) {
        if (target - self.target).abs() < f32::EPSILON && self.samples_remaining == 0 {
            return;
        }
        self.target = target;
        self.samples_remaining = (smooth_secs * self.sample_rate).max(1.0) as u32;
        self.step = (self.target - self.current) / self.samples_remaining as f32;
    }

    /// Jump straight to `value` with no ramp.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.samples_remaining = 0;
    }

    /// Advance one sample and return the current value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.step;
            self.samples_remaining -= 1;
            // Snap to target when done to avoid floating point drift
            if self.samples_remaining == 0 {
                self.current = self.target;
            }
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.samples_remaining == 0
    }
}
