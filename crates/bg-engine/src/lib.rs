//! Real-time scheduling and signal-graph engine.
//!
//! The engine runs on one control thread that interleaves three jobs
//! per block: apply queued [`Command`]s, schedule step-grid notes
//! inside a lookahead window, and render the signal graph. Because the
//! three never overlap, graph topology can be rebuilt freely between
//! renders without locks. Rendered blocks are handed to an output
//! backend (or collected, for offline rendering) by the caller.

mod channel;
mod command;
mod effect;
mod engine;
mod envelope;
mod frame;
mod graph;
mod mixer;
mod ramp;
mod scheduler;
mod voice;

pub mod effects;

pub use channel::{ChannelRack, TrackChannel};
pub use command::{Command, EngineEvent};
pub use effect::{
    BuiltEffect, EffectFactory, EffectInfo, EffectRegistry, EffectStage, ParamSpec, StageNode,
};
pub use engine::{Engine, EngineError};
pub use envelope::{Breakpoint, Curve, Envelope};
pub use frame::Frame;
pub use graph::{AudioGraph, AudioNode, GainNode, NodeKey, RenderCtx, MASTER_GAIN};
pub use mixer::{effective_gain, recompute_track_gains};
pub use ramp::{Ramp, PARAM_SMOOTH_SECS};
pub use scheduler::{DueStep, StepScheduler, LOOKAHEAD_SECS, MIN_TEMPO};
pub use voice::{SamplerVoice, SynthVoice, Waveform, SAMPLER_RELEASE_SECS, SYNTH_RELEASE_SECS};
