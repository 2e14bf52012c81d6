//! Stereo f32 render buffer.

/// Default block size for graph rendering.
pub const BLOCK_SIZE: usize = 512;

/// A stereo f32 buffer in planar layout.
///
/// Every node in the signal graph renders into one of these; inputs are
/// gathered by summing the buffers of upstream nodes.
#[derive(Clone, Debug)]
pub struct StereoBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl StereoBuffer {
    /// Create a silent buffer holding `frames` samples per channel.
    pub fn new(frames: usize) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    /// Number of frames per channel.
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    /// Fill both channels with zero.
    pub fn silence(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    pub fn left_mut(&mut self) -> &mut [f32] {
        &mut self.left
    }

    pub fn right_mut(&mut self) -> &mut [f32] {
        &mut self.right
    }

    /// Mutable access to both channels at once.
    pub fn channels_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        (&mut self.left, &mut self.right)
    }

    /// Sum `source` into this buffer (over the overlapping frame range).
    pub fn mix_from(&mut self, source: &StereoBuffer) {
        let n = self.frames().min(source.frames());
        for i in 0..n {
            self.left[i] += source.left[i];
            self.right[i] += source.right[i];
        }
    }

    /// Sum `source` into this buffer with a gain factor.
    pub fn mix_from_scaled(&mut self, source: &StereoBuffer, gain: f32) {
        let n = self.frames().min(source.frames());
        for i in 0..n {
            self.left[i] += source.left[i] * gain;
            self.right[i] += source.right[i] * gain;
        }
    }

    /// Scale all samples by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        for s in &mut self.left {
            *s *= gain;
        }
        for s in &mut self.right {
            *s *= gain;
        }
    }

    /// Copy `source` into this buffer, replacing previous contents.
    pub fn copy_from(&mut self, source: &StereoBuffer) {
        let n = self.frames().min(source.frames());
        self.left[..n].copy_from_slice(&source.left[..n]);
        self.right[..n].copy_from_slice(&source.right[..n]);
    }

    /// Peak absolute sample value across both channels.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(self.right.iter())
            .fold(0.0f32, |m, s| m.max(s.abs()))
    }
}
