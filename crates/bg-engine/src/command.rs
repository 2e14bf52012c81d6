//! Control-surface commands and engine events.

use bg_ir::{EffectId, TrackId};

/// Commands from the editor to the engine.
///
/// State edits (notes, tempo, volume values) land in the shared
/// project store; commands only tell the engine which derived state to
/// refresh, or drive transport.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Start playback from step zero.
    Play,
    /// Stop playback; live voices ring out.
    Stop,
    /// An effect was added to a track; instantiate and wire it.
    EffectAdded {
        track: TrackId,
        effect: EffectId,
        kind: String,
    },
    /// An effect was removed; tear it down and relink the chain.
    EffectRemoved { track: TrackId, effect: EffectId },
    /// An effect parameter changed.
    ParamChanged {
        track: TrackId,
        effect: EffectId,
        param: String,
        value: f32,
    },
    /// A track's notes changed. Acknowledged but otherwise a no-op:
    /// notes are read fresh from the store at schedule time.
    NotesChanged { track: TrackId },
    /// A track's volume changed.
    VolumeChanged { track: TrackId },
    /// Any mute or solo flag changed; re-derive every track gain.
    MuteSoloChanged,
    /// A track was deleted; tear down its channel.
    TrackDeleted { track: TrackId },
    /// Drop all playback state: transport, voices, channels.
    Reset,
}

/// Notifications from the engine back to the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// The playhead committed this step for playback.
    StepChanged(u32),
}
