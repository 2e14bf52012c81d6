//! Audio output trait and error types.

use bg_engine::Frame;
use thiserror::Error;

/// Errors from audio device setup and playback.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("no audio device available")]
    NoDevice,
}

/// An audio output sink fed rendered frames by the engine thread.
pub trait AudioOutput {
    fn sample_rate(&self) -> u32;

    /// Write frames to the output, blocking until there is room.
    fn write(&mut self, frames: &[Frame]);

    fn start(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;
}
