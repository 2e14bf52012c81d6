//! Project data model: tracks, notes, effect descriptors.
//!
//! The engine never owns this data — it reads immutable snapshots
//! published by the [`crate::ProjectStore`] and renders what it sees.

use arrayvec::ArrayString;

/// Track identifier, assigned by the editor.
pub type TrackId = u64;

/// Effect instance identifier, unique within a project.
pub type EffectId = u64;

/// A note name like `C4` or `F#3` (resolved by [`crate::pitch`]).
pub type NoteName = ArrayString<8>;

/// Default track volume for freshly created tracks.
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Default wet level for freshly added effects.
pub const DEFAULT_WET: f32 = 0.8;

/// How a track produces sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackKind {
    /// Oscillator voices (waveform chosen from the track name).
    Synth,
    /// Pitched playback of a loaded sample.
    Sampler,
}

/// One note on the step grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    /// Pitch as a note name (`C4`, `Bb2`, ...).
    pub note: NoteName,
    /// Grid position, 0-based.
    pub step: u32,
    /// Length in steps. Zero is treated as one step.
    pub duration: u32,
}

impl Note {
    pub fn new(note: &str, step: u32, duration: u32) -> Self {
        let mut name = NoteName::new();
        let _ = name.try_push_str(note);
        Self { note: name, step, duration }
    }

    /// Duration in steps with the zero-length guard applied.
    pub fn duration_steps(&self) -> u32 {
        self.duration.max(1)
    }
}

/// A named parameter on an effect descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: ArrayString<16>,
    pub value: f32,
}

impl Param {
    pub fn new(name: &str, value: f32) -> Self {
        let mut param_name = ArrayString::new();
        let _ = param_name.try_push_str(name);
        Self { name: param_name, value }
    }
}

/// An effect instance on a track, in chain order.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectDesc {
    pub id: EffectId,
    /// Effect type identifier, resolved through the engine's registry.
    pub kind: String,
    pub params: Vec<Param>,
}

impl EffectDesc {
    /// New effect descriptor with the default wet parameter.
    pub fn new(id: EffectId, kind: &str) -> Self {
        Self {
            id,
            kind: kind.to_string(),
            params: vec![Param::new("wet", DEFAULT_WET)],
        }
    }

    pub fn param(&self, name: &str) -> Option<f32> {
        self.params
            .iter()
            .find(|p| p.name.as_str() == name)
            .map(|p| p.value)
    }
}

/// One sequencer track.
#[derive(Clone, Debug)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub kind: TrackKind,
    /// Sample asset URL (sampler tracks only).
    pub sample_url: Option<String>,
    /// Pitch the sample was recorded at; playback rate is derived from it.
    pub root_note: NoteName,
    pub volume: f32,
    pub muted: bool,
    pub solo: bool,
    /// Effect chain in signal order.
    pub effects: Vec<EffectDesc>,
    pub notes: Vec<Note>,
}

impl Track {
    /// A synth track with editor defaults.
    pub fn synth(id: TrackId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind: TrackKind::Synth,
            sample_url: None,
            root_note: NoteName::from("C4").unwrap(),
            volume: DEFAULT_VOLUME,
            muted: false,
            solo: false,
            effects: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// A sampler track playing the asset at `url`, recorded at `root_note`.
    pub fn sampler(id: TrackId, name: &str, url: &str, root_note: &str) -> Self {
        let mut track = Self::synth(id, name);
        track.kind = TrackKind::Sampler;
        track.sample_url = Some(url.to_string());
        let mut root = NoteName::new();
        let _ = root.try_push_str(root_note);
        track.root_note = root;
        track
    }

    /// All notes that trigger on `step`.
    pub fn notes_at(&self, step: u32) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(move |n| n.step == step)
    }
}

/// Snapshot of the whole editable state the engine consumes.
#[derive(Clone, Debug)]
pub struct Project {
    /// Beats per minute.
    pub tempo: f32,
    /// Length of the step grid.
    pub total_steps: u32,
    pub tracks: Vec<Track>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            total_steps: 16,
            tracks: Vec::new(),
        }
    }
}

impl Project {
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// True if any track has solo enabled (global solo state).
    pub fn any_solo(&self) -> bool {
        self.tracks.iter().any(|t| t.solo)
    }
}
