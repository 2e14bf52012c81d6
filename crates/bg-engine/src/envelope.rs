//! Breakpoint gain envelopes for voices.
//!
//! A voice's amplitude over its lifetime is a small list of breakpoints
//! with a curve into each one. Evaluation is stateless against absolute
//! frame time, so voices can be queried at any block offset.

/// How the value approaches a breakpoint from the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Curve {
    /// Jump to the value at the breakpoint's frame.
    Set,
    /// Linear interpolation from the previous breakpoint.
    Linear,
    /// Exponential interpolation; falls back to linear when the
    /// previous value is not strictly positive.
    Exponential,
}

#[derive(Clone, Copy, Debug)]
pub struct Breakpoint {
    pub frame: u64,
    pub value: f32,
    pub curve: Curve,
}

/// A piecewise gain curve over absolute frame time.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    points: Vec<Breakpoint>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `value` starting at `frame`.
    pub fn set_value_at(mut self, value: f32, frame: u64) -> Self {
        self.push(Breakpoint { frame, value, curve: Curve::Set });
        self
    }

    /// Ramp linearly to `value`, arriving at `frame`.
    pub fn linear_ramp_to(mut self, value: f32, frame: u64) -> Self {
        self.push(Breakpoint { frame, value, curve: Curve::Linear });
        self
    }

    /// Ramp exponentially to `value`, arriving at `frame`.
    pub fn exponential_ramp_to(mut self, value: f32, frame: u64) -> Self {
        self.push(Breakpoint { frame, value, curve: Curve::Exponential });
        self
    }

    fn push(&mut self, point: Breakpoint) {
        debug_assert!(
            self.points.last().map_or(true, |p| p.frame <= point.frame),
            "breakpoints must be appended in frame order"
        );
        self.points.push(point);
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Frame of the final breakpoint, if any.
    pub fn end_frame(&self) -> Option<u64> {
        self.points.last().map(|p| p.frame)
    }

    /// Evaluate the envelope at an absolute frame.
    pub fn value_at(&self, frame: u64) -> f32 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        if frame <= first.frame {
            return first.value;
        }
        for pair in self.points.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if frame < next.frame {
                return interpolate(prev, next, frame);
            }
        }
        self.points[self.points.len() - 1].value
    }
}

fn interpolate(prev: Breakpoint, next: Breakpoint, frame: u64) -> f32 {
    let span = (next.frame - prev.frame) as f32;
    let t = (frame - prev.frame) as f32 / span;
    match next.curve {
        Curve::Set => prev.value,
        Curve::Linear => prev.value + (next.value - prev.value) * t,
        Curve::Exponential => {
            if prev.value <= 0.0 || next.value <= 0.0 {
                prev.value + (next.value - prev.value) * t
            } else {
                prev.value * (next.value / prev.value).powf(t)
            }
        }
    }
}
