//! beatgrid CLI — headless playback and WAV export of a demo beat.
//!
//! Usage:
//!   bg-cli                          play the demo through the speakers
//!   bg-cli --seconds 8              play for 8 seconds
//!   bg-cli --wav out.wav            render the demo to a WAV file
//!   bg-cli --samples dir/           resolve sampler tracks against dir/

use std::io::Write;
use std::sync::Arc;
use std::{env, fs};

use bg_ir::{EffectDesc, Note, Project, ProjectStore, Track};
use bg_master::Studio;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let flag = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };
    let wav_path = flag("--wav");
    let seconds: u32 = flag("--seconds")
        .and_then(|s| s.parse().ok())
        .unwrap_or(8);
    let samples_dir = flag("--samples");

    let project = demo_project(samples_dir.is_some());
    println!("Tempo:  {} BPM", project.tempo);
    println!("Steps:  {}", project.total_steps);
    println!("Tracks: {}", project.tracks.len());
    for track in &project.tracks {
        println!(
            "  {} ({} note(s), {} effect(s))",
            track.name,
            track.notes.len(),
            track.effects.len()
        );
    }
    println!();

    let source: Arc<dyn bg_assets::SampleSource> = match samples_dir {
        Some(dir) => Arc::new(bg_assets::DirSource::new(dir)),
        None => Arc::new(bg_assets::MemorySource::new()),
    };
    let cache = bg_assets::SampleCache::new(source, bg_assets::DEFAULT_CAPACITY);

    match wav_path {
        Some(path) => render(&project, &cache, &path, seconds),
        None => play(project, cache, seconds),
    }
}

fn play(project: Project, cache: bg_assets::SampleCache, seconds: u32) {
    let store = ProjectStore::new(Project::default());
    let studio = Studio::launch(store, cache);
    studio.load_project(project);
    studio.play();
    println!("Playing for {seconds}s...");

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(seconds as u64);
    while std::time::Instant::now() < deadline {
        if studio.is_finished() {
            eprintln!("engine stopped (no audio device?)");
            std::process::exit(1);
        }
        if let Some(step) = studio.try_step() {
            print!("\rStep: {step:02}");
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    studio.stop();
    println!("\rDone.    ");
}

fn render(project: &Project, cache: &bg_assets::SampleCache, path: &str, seconds: u32) {
    let sample_rate: u32 = 44100;
    println!("Rendering {seconds}s to {path} at {sample_rate} Hz...");

    let wav = bg_master::render_to_wav(project, cache, sample_rate, seconds);
    fs::write(path, &wav).unwrap_or_else(|e| {
        eprintln!("Failed to write {path}: {e}");
        std::process::exit(1);
    });

    println!("Wrote {} bytes.", wav.len());
}

/// A two-bar demo: square lead with delay, sawtooth bassline, and an
/// optional sampled kick when a samples directory is given.
fn demo_project(with_sampler: bool) -> Project {
    let mut project = Project::default();

    let mut lead = Track::synth(1, "Lead");
    for (step, note) in [(0, "C5"), (3, "Eb5"), (6, "G5"), (10, "Bb5"), (12, "G5")] {
        lead.notes.push(Note::new(note, step, 2));
    }
    lead.effects.push(EffectDesc::new(100, "Delay"));
    project.tracks.push(lead);

    let mut bass = Track::synth(2, "Bass");
    for step in [0, 4, 8, 12] {
        bass.notes.push(Note::new("C3", step, 3));
    }
    bass.volume = 0.9;
    project.tracks.push(bass);

    if with_sampler {
        let mut kick = Track::sampler(3, "Kick", "drums/kick.wav", "C4");
        for step in [0, 4, 8, 12] {
            kick.notes.push(Note::new("C4", step, 1));
        }
        project.tracks.push(kick);
    }

    project
}
