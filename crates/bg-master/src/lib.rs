//! Headless controller for beatgrid.
//!
//! Owns the engine thread and exposes a unified API for live playback
//! and offline rendering that a GUI or CLI can share. The engine
//! thread creates its own audio device (CPAL streams are not `Send`),
//! drains commands, schedules and renders one block at a time, and
//! pushes frames to the device ring buffer.

mod wav;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use bg_assets::SampleCache;
use bg_audio::{AudioOutput, CpalOutput};
use bg_engine::effects::default_registry;
use bg_engine::Engine;
use bg_ir::{Project, ProjectStore, StereoBuffer, BLOCK_SIZE};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use log::{error, warn};

// Re-export common types so callers don't need the lower crates directly.
pub use bg_engine::{Command, EngineEvent, Frame};
pub use wav::{frames_to_wav, write_wav};

/// Live playback controller: shared project store, command queue, and
/// the engine thread feeding the audio device.
pub struct Studio {
    store: Arc<ProjectStore>,
    commands: Sender<Command>,
    events: Receiver<EngineEvent>,
    stop_signal: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Studio {
    /// Spawn the engine thread over `store`, playing through the
    /// default audio device.
    pub fn launch(store: Arc<ProjectStore>, cache: SampleCache) -> Self {
        let (cmd_tx, cmd_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let thread_store = store.clone();
        let stop = stop_signal.clone();
        let done = finished.clone();
        let thread = std::thread::Builder::new()
            .name("bg-engine".into())
            .spawn(move || engine_thread(thread_store, cache, cmd_rx, event_tx, stop, done))
            .expect("spawn engine thread");

        Self {
            store,
            commands: cmd_tx,
            events: event_rx,
            stop_signal,
            finished,
            thread: Some(thread),
        }
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    /// Queue a command for the engine thread.
    pub fn send(&self, command: Command) {
        let _ = self.commands.send(command);
    }

    pub fn play(&self) {
        self.send(Command::Play);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// True once the engine thread has exited (device failure or
    /// shutdown).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    pub fn events(&self) -> &Receiver<EngineEvent> {
        &self.events
    }

    /// The most recent playhead step, if any event is pending.
    pub fn try_step(&self) -> Option<u32> {
        let mut latest = None;
        loop {
            match self.events.try_recv() {
                Ok(EngineEvent::StepChanged(step)) => latest = Some(step),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    /// Swap in a new project and rebuild the engine's derived state:
    /// channels and effects are re-instantiated from the descriptors,
    /// then track gains are re-derived.
    pub fn load_project(&self, project: Project) {
        self.send(Command::Reset);
        self.store.replace(project);
        let snapshot = self.store.snapshot();
        for track in &snapshot.tracks {
            for effect in &track.effects {
                self.send(Command::EffectAdded {
                    track: track.id,
                    effect: effect.id,
                    kind: effect.kind.clone(),
                });
            }
        }
        self.send(Command::MuteSoloChanged);
    }

    /// Stop the engine thread and wait for it to exit.
    pub fn shutdown(&mut self) {
        self.stop_signal.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn engine_thread(
    store: Arc<ProjectStore>,
    cache: SampleCache,
    commands: Receiver<Command>,
    events: Sender<EngineEvent>,
    stop_signal: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
) {
    let (mut output, consumer) = match CpalOutput::new() {
        Ok(pair) => pair,
        Err(e) => {
            error!("audio device unavailable: {e}");
            finished.store(true, Ordering::Relaxed);
            return;
        }
    };

    let sample_rate = output.sample_rate();
    let mut engine = Engine::new(store, cache, default_registry(), events, sample_rate);

    if let Err(e) = output.build_stream(consumer) {
        error!("failed to start audio stream: {e}");
        finished.store(true, Ordering::Relaxed);
        return;
    }
    let _ = output.start();

    let mut frames = vec![Frame::silence(); BLOCK_SIZE];
    while !stop_signal.load(Ordering::Relaxed) {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if let Err(e) = engine.handle_command(command) {
                        warn!("command failed: {e}");
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    stop_signal.store(true, Ordering::Relaxed);
                    break;
                }
            }
        }

        let block = engine.advance_block();
        collect_frames(block, &mut frames);
        // Backpressure: blocks here until the device drains the buffer
        output.write(&frames);
    }

    let _ = output.stop();
    finished.store(true, Ordering::Relaxed);
}

fn collect_frames(block: &StereoBuffer, frames: &mut [Frame]) {
    for (i, frame) in frames.iter_mut().enumerate() {
        *frame = Frame {
            left: block.left()[i],
            right: block.right()[i],
        };
    }
}

/// Render a project offline: preload its samples, rebuild its effect
/// chains, then run the engine clock as fast as the CPU allows.
pub fn render_project(
    project: &Project,
    cache: &SampleCache,
    sample_rate: u32,
    max_frames: usize,
) -> Vec<Frame> {
    for track in &project.tracks {
        if let Some(url) = track.sample_url.as_deref() {
            if let Err(e) = cache.load_blocking(url) {
                warn!("could not preload {url}: {e}");
            }
        }
    }

    let store = ProjectStore::new(project.clone());
    let (event_tx, _event_rx) = unbounded();
    let mut engine = Engine::new(
        store,
        cache.clone(),
        default_registry(),
        event_tx,
        sample_rate,
    );

    for track in &project.tracks {
        for effect in &track.effects {
            let command = Command::EffectAdded {
                track: track.id,
                effect: effect.id,
                kind: effect.kind.clone(),
            };
            if let Err(e) = engine.handle_command(command) {
                warn!("skipping effect: {e}");
            }
        }
    }
    let _ = engine.handle_command(Command::MuteSoloChanged);
    let _ = engine.handle_command(Command::Play);

    let mut frames = Vec::with_capacity(max_frames);
    while frames.len() < max_frames {
        let block = engine.advance_block();
        let take = (max_frames - frames.len()).min(BLOCK_SIZE);
        for i in 0..take {
            frames.push(Frame {
                left: block.left()[i],
                right: block.right()[i],
            });
        }
    }
    frames
}

/// Render a project straight to in-memory WAV bytes.
pub fn render_to_wav(
    project: &Project,
    cache: &SampleCache,
    sample_rate: u32,
    max_seconds: u32,
) -> Vec<u8> {
    let max_frames = (sample_rate * max_seconds) as usize;
    let frames = render_project(project, cache, sample_rate, max_frames);
    frames_to_wav(&frames, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bg_assets::{MemorySource, DEFAULT_CAPACITY};
    use bg_ir::{EffectDesc, Note, Track};

    fn cache() -> SampleCache {
        SampleCache::new(Arc::new(MemorySource::new()), DEFAULT_CAPACITY)
    }

    fn lead_project() -> Project {
        let mut project = Project::default();
        let mut track = Track::synth(1, "Lead");
        track.notes.push(Note::new("C4", 0, 2));
        project.tracks.push(track);
        project
    }

    #[test]
    fn offline_render_produces_audio() {
        let frames = render_project(&lead_project(), &cache(), 44100, 4410);
        assert_eq!(frames.len(), 4410);
        let peak = frames
            .iter()
            .map(|f| f.left.abs().max(f.right.abs()))
            .fold(0.0f32, f32::max);
        assert!(peak > 0.0);
    }

    #[test]
    fn muted_track_renders_silence() {
        let mut project = lead_project();
        project.track_mut(1).unwrap().muted = true;
        let frames = render_project(&project, &cache(), 44100, 4410);
        let peak = frames
            .iter()
            .map(|f| f.left.abs().max(f.right.abs()))
            .fold(0.0f32, f32::max);
        assert_eq!(peak, 0.0);
    }

    #[test]
    fn render_honors_effect_chain() {
        let mut project = lead_project();
        project
            .track_mut(1)
            .unwrap()
            .effects
            .push(EffectDesc::new(7, "Delay"));
        // A delayed copy of the note shows up after the dry tail ends.
        let frames = render_project(&project, &cache(), 44100, 44100);
        let dry_end = ((0.25 + 0.1) * 44100.0) as usize;
        let echo_region = &frames[dry_end + 2000..dry_end + 12000];
        let peak = echo_region
            .iter()
            .map(|f| f.left.abs())
            .fold(0.0f32, f32::max);
        assert!(peak > 0.0, "expected delay tail after the dry note");
    }

    #[test]
    fn render_to_wav_yields_riff_bytes() {
        let bytes = render_to_wav(&lead_project(), &cache(), 22050, 1);
        assert_eq!(&bytes[0..4], b"RIFF");
    }
}
