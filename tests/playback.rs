//! End-to-end playback scenarios through the offline renderer.

use std::sync::Arc;

use bg_assets::{MemorySource, SampleCache, DEFAULT_CAPACITY};
use bg_ir::{EffectDesc, Note, Project, Track};
use bg_master::{render_project, Frame};

const SR: u32 = 44100;

fn empty_cache() -> SampleCache {
    SampleCache::new(Arc::new(MemorySource::new()), DEFAULT_CAPACITY)
}

fn kick_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SR,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        // 50ms decaying burst
        for i in 0..(SR / 20) {
            let v = (1.0 - i as f32 / (SR / 20) as f32) * 0.8;
            writer.write_sample((v * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn peak(frames: &[Frame]) -> f32 {
    frames
        .iter()
        .map(|f| f.left.abs().max(f.right.abs()))
        .fold(0.0, f32::max)
}

fn span(frames: &[Frame], from_secs: f64, to_secs: f64) -> &[Frame] {
    let a = (from_secs * SR as f64) as usize;
    let b = ((to_secs * SR as f64) as usize).min(frames.len());
    &frames[a..b]
}

#[test]
fn pattern_loops_at_the_grid_length() {
    // One note at step 0, two steps long. At 120 BPM the grid is 2 s,
    // the note sounds for 0.25 s plus a 0.1 s release.
    let mut project = Project::default();
    let mut track = Track::synth(1, "Lead");
    track.notes.push(Note::new("C4", 0, 2));
    project.tracks.push(track);

    let frames = render_project(&project, &empty_cache(), SR, (SR as f64 * 2.5) as usize);

    assert!(peak(span(&frames, 0.02, 0.3)) > 0.0, "first pass should sound");
    assert_eq!(peak(span(&frames, 0.5, 1.9)), 0.0, "gap between loops is silent");
    assert!(peak(span(&frames, 2.02, 2.3)) > 0.0, "loop should re-trigger at 2 s");
}

#[test]
fn note_duration_scales_with_tempo() {
    // At 240 BPM a two-step note lasts 0.125 s (plus release), half of
    // what it does at 120 BPM.
    let mut project = Project::default();
    project.tempo = 240.0;
    let mut track = Track::synth(1, "Lead");
    track.notes.push(Note::new("C4", 0, 2));
    project.tracks.push(track);

    let frames = render_project(&project, &empty_cache(), SR, (SR as f64 * 0.9) as usize);
    assert!(peak(span(&frames, 0.02, 0.12)) > 0.0);
    // Past note end + release tail, before the next loop at 1 s
    assert_eq!(peak(span(&frames, 0.3, 0.8)), 0.0);
}

#[test]
fn solo_silences_every_other_track() {
    let mut project = Project::default();
    let mut lead = Track::synth(1, "Lead");
    lead.notes.push(Note::new("C4", 0, 2));
    project.tracks.push(lead);
    let mut pad = Track::synth(2, "Pad");
    pad.solo = true; // soloed but has no notes
    project.tracks.push(pad);

    let frames = render_project(&project, &empty_cache(), SR, SR as usize / 2);
    assert_eq!(peak(&frames), 0.0);
}

#[test]
fn sampler_track_plays_a_cached_sample() {
    let source = MemorySource::new().with("drums/kick.wav", kick_wav());
    let cache = SampleCache::new(Arc::new(source), DEFAULT_CAPACITY);

    let mut project = Project::default();
    let mut kick = Track::sampler(1, "Kick", "drums/kick.wav", "C4");
    kick.notes.push(Note::new("C4", 0, 1));
    project.tracks.push(kick);

    let frames = render_project(&project, &cache, SR, SR as usize / 4);
    assert!(peak(&frames) > 0.0);
}

#[test]
fn delay_descriptor_wet_level_is_applied() {
    // With wet forced to zero the delay contributes nothing, so the
    // echo window after the dry tail stays silent.
    let mut project = Project::default();
    let mut track = Track::synth(1, "Lead");
    track.notes.push(Note::new("C4", 0, 1));
    let mut delay = EffectDesc::new(50, "Delay");
    delay.params[0].value = 0.0; // wet
    track.effects.push(delay);
    project.tracks.push(track);

    let frames = render_project(&project, &empty_cache(), SR, SR as usize);
    // Dry note: 0.125 s + 0.1 s release; first echo would land 0.3 s
    // after onset.
    assert!(peak(span(&frames, 0.02, 0.2)) > 0.0);
    let echo = peak(span(&frames, 0.3, 0.7));
    assert!(echo < 1e-3, "echo should be gone with wet at zero, got {echo}");
}

#[test]
fn delay_produces_an_audible_echo_by_default() {
    let mut project = Project::default();
    let mut track = Track::synth(1, "Lead");
    track.notes.push(Note::new("C4", 0, 1));
    track.effects.push(EffectDesc::new(50, "Delay"));
    project.tracks.push(track);

    let frames = render_project(&project, &empty_cache(), SR, SR as usize);
    assert!(peak(span(&frames, 0.3, 0.7)) > 0.0);
}
