//! Lock-free snapshot store for project state.
//!
//! The editor mutates through the methods here; the engine thread calls
//! [`ProjectStore::snapshot`] at every scheduler advance and sees an
//! immutable, consistent view. Mutations clone the current project and
//! swap the new version in, so readers are never blocked.
//!
//! Single-writer: concurrent mutators can lose updates to each other,
//! which matches the one-editor-per-process design.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::project::{EffectDesc, Note, Project, Track, TrackId};
use crate::EffectId;

/// Shared handle to the current project snapshot.
pub struct ProjectStore {
    inner: ArcSwap<Project>,
}

impl ProjectStore {
    pub fn new(project: Project) -> Arc<Self> {
        Arc::new(Self {
            inner: ArcSwap::from_pointee(project),
        })
    }

    /// The current immutable snapshot.
    pub fn snapshot(&self) -> Arc<Project> {
        self.inner.load_full()
    }

    /// Replace the whole project (project load).
    pub fn replace(&self, project: Project) {
        self.inner.store(Arc::new(project));
    }

    fn update(&self, f: impl FnOnce(&mut Project)) {
        let mut project = (**self.inner.load()).clone();
        f(&mut project);
        self.inner.store(Arc::new(project));
    }

    pub fn set_tempo(&self, bpm: f32) {
        self.update(|p| p.tempo = bpm);
    }

    pub fn set_total_steps(&self, steps: u32) {
        self.update(|p| p.total_steps = steps);
    }

    pub fn add_track(&self, track: Track) {
        self.update(|p| p.tracks.push(track));
    }

    pub fn delete_track(&self, id: TrackId) {
        self.update(|p| p.tracks.retain(|t| t.id != id));
    }

    /// Add a note, replacing any existing note on the same step.
    pub fn add_note(&self, track: TrackId, note: Note) {
        self.update(|p| {
            if let Some(t) = p.track_mut(track) {
                t.notes.retain(|n| n.step != note.step);
                t.notes.push(note);
            }
        });
    }

    pub fn delete_note(&self, track: TrackId, step: u32) {
        self.update(|p| {
            if let Some(t) = p.track_mut(track) {
                t.notes.retain(|n| n.step != step);
            }
        });
    }

    /// Append an effect to the end of a track's chain.
    pub fn add_effect(&self, track: TrackId, effect: EffectDesc) {
        self.update(|p| {
            if let Some(t) = p.track_mut(track) {
                t.effects.push(effect);
            }
        });
    }

    pub fn remove_effect(&self, track: TrackId, effect: EffectId) {
        self.update(|p| {
            if let Some(t) = p.track_mut(track) {
                t.effects.retain(|e| e.id != effect);
            }
        });
    }

    pub fn set_effect_param(&self, track: TrackId, effect: EffectId, name: &str, value: f32) {
        self.update(|p| {
            let Some(t) = p.track_mut(track) else { return };
            let Some(e) = t.effects.iter_mut().find(|e| e.id == effect) else {
                return;
            };
            match e.params.iter_mut().find(|p| p.name.as_str() == name) {
                Some(param) => param.value = value,
                None => e.params.push(crate::Param::new(name, value)),
            }
        });
    }

    pub fn set_track_volume(&self, track: TrackId, volume: f32) {
        self.update(|p| {
            if let Some(t) = p.track_mut(track) {
                t.volume = volume;
            }
        });
    }

    pub fn toggle_mute(&self, track: TrackId) {
        self.update(|p| {
            if let Some(t) = p.track_mut(track) {
                t.muted = !t.muted;
            }
        });
    }

    pub fn toggle_solo(&self, track: TrackId) {
        self.update(|p| {
            if let Some(t) = p.track_mut(track) {
                t.solo = !t.solo;
            }
        });
    }
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self {
            inner: ArcSwap::from_pointee(Project::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_immutable_view() {
        let store = ProjectStore::new(Project::default());
        let before = store.snapshot();
        store.set_tempo(90.0);
        assert_eq!(before.tempo, 120.0);
        assert_eq!(store.snapshot().tempo, 90.0);
    }

    #[test]
    fn add_note_replaces_same_step() {
        let store = ProjectStore::new(Project::default());
        store.add_track(Track::synth(1, "s"));
        store.add_note(1, Note::new("C4", 3, 1));
        store.add_note(1, Note::new("E4", 3, 2));

        let snap = store.snapshot();
        let notes: Vec<_> = snap.track(1).unwrap().notes_at(3).collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note.as_str(), "E4");
        assert_eq!(notes[0].duration, 2);
    }

    #[test]
    fn delete_track_removes_it() {
        let store = ProjectStore::new(Project::default());
        store.add_track(Track::synth(1, "a"));
        store.add_track(Track::synth(2, "b"));
        store.delete_track(1);
        let snap = store.snapshot();
        assert!(snap.track(1).is_none());
        assert!(snap.track(2).is_some());
    }

    #[test]
    fn effect_chain_keeps_order() {
        let store = ProjectStore::new(Project::default());
        store.add_track(Track::synth(1, "s"));
        store.add_effect(1, EffectDesc::new(10, "Delay"));
        store.add_effect(1, EffectDesc::new(11, "Reverb"));
        store.remove_effect(1, 10);

        let snap = store.snapshot();
        let effects = &snap.track(1).unwrap().effects;
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].id, 11);
    }

    #[test]
    fn set_effect_param_updates_or_inserts() {
        let store = ProjectStore::new(Project::default());
        store.add_track(Track::synth(1, "s"));
        store.add_effect(1, EffectDesc::new(10, "Delay"));
        store.set_effect_param(1, 10, "wet", 0.3);
        store.set_effect_param(1, 10, "feedback", 0.5);

        let snap = store.snapshot();
        let e = &snap.track(1).unwrap().effects[0];
        assert_eq!(e.param("wet"), Some(0.3));
        assert_eq!(e.param("feedback"), Some(0.5));
    }

    #[test]
    fn mute_solo_toggles() {
        let store = ProjectStore::new(Project::default());
        store.add_track(Track::synth(1, "s"));
        store.toggle_mute(1);
        store.toggle_solo(1);
        let snap = store.snapshot();
        assert!(snap.track(1).unwrap().muted);
        assert!(snap.track(1).unwrap().solo);
        store.toggle_mute(1);
        assert!(!store.snapshot().track(1).unwrap().muted);
    }
}
