//! Lookahead step scheduling against the audio clock.
//!
//! Each engine tick drains every step whose ideal time falls inside a
//! fixed lookahead window ahead of "now". Voices are then scheduled at
//! their exact ideal times, so timing stays sample-accurate even though
//! ticks happen at block granularity. Step times accumulate from the
//! previous step's time, never from wall clock, so jitter in tick
//! timing cannot drift the grid.

use log::warn;

/// How far ahead of the audio clock steps are committed.
pub const LOOKAHEAD_SECS: f64 = 0.1;

/// Tempo floor; zero or negative tempos would stall or reverse the grid.
pub const MIN_TEMPO: f32 = 1.0;

/// A step due for scheduling, with its ideal onset time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DueStep {
    pub step: u32,
    /// Ideal onset in seconds on the audio clock.
    pub time: f64,
}

/// Advances the step grid ahead of playback.
pub struct StepScheduler {
    current_step: u32,
    next_step_time: f64,
    running: bool,
}

impl StepScheduler {
    pub fn new() -> Self {
        Self {
            current_step: 0,
            next_step_time: 0.0,
            running: false,
        }
    }

    /// Begin playback from step zero at audio-clock time `now`.
    pub fn start(&mut self, now: f64) {
        self.current_step = 0;
        self.next_step_time = now;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Collect every step due within the lookahead window past `now`.
    ///
    /// Steps advance by a sixteenth note: `(60 / tempo) / 4` seconds,
    /// wrapping at `total_steps`.
    pub fn tick(&mut self, now: f64, tempo: f32, total_steps: u32) -> Vec<DueStep> {
        let mut due = Vec::new();
        if !self.running {
            return due;
        }

        let tempo = if tempo < MIN_TEMPO {
            warn!("tempo {tempo} below minimum, clamping to {MIN_TEMPO}");
            MIN_TEMPO
        } else {
            tempo
        };
        let total_steps = if total_steps == 0 {
            warn!("total steps is zero, clamping to 1");
            1
        } else {
            total_steps
        };
        let step_secs = (60.0 / tempo as f64) / 4.0;
        let horizon = now + LOOKAHEAD_SECS;

        while self.next_step_time < horizon {
            due.push(DueStep {
                step: self.current_step,
                time: self.next_step_time,
            });
            self.next_step_time += step_secs;
            self.current_step = (self.current_step + 1) % total_steps;
        }
        due
    }
}

impl Default for StepScheduler {
    fn default() -> Self {
        Self::new()
    }
}
