//! Core data model for the beatgrid engine.
//!
//! This crate defines the project state the sequencer engine consumes:
//! tracks, notes on the step grid, effect descriptors, and the snapshot
//! store the editor publishes through. It also hosts the two leaf
//! utilities everything else builds on: note-name pitch resolution and
//! the stereo render buffer.

mod audio_buffer;
pub mod pitch;
mod project;
mod store;

pub use audio_buffer::{StereoBuffer, BLOCK_SIZE};
pub use project::{
    EffectDesc, EffectId, Note, NoteName, Param, Project, Track, TrackId, TrackKind,
    DEFAULT_VOLUME, DEFAULT_WET,
};
pub use store::ProjectStore;
