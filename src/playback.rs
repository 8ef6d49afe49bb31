//! Playback scheduler
//!
//! Replays a [`Recording`] against its own simulated frame counter. The
//! counter advances once per tick while playing, so a recording replayed at
//! [`PlaybackSpeed::Normal`] reproduces the spacing it was captured with at
//! one-tick resolution.

use crate::key::{KeyIdentity, KeyTransition, TransitionKind};
use crate::output::KeySynthesizer;
use crate::recording::Recording;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timing policy for playback
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackSpeed {
    /// Replay with the recorded frame spacing (1:1)
    #[default]
    Normal,
    /// Like normal, but skip the idle lead-in before the first event
    TrimStartup,
    /// One event per tick, recorded timing ignored
    Fast,
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackSpeed::Normal => write!(f, "normal"),
            PlaybackSpeed::TrimStartup => write!(f, "trim_startup"),
            PlaybackSpeed::Fast => write!(f, "fast"),
        }
    }
}

impl FromStr for PlaybackSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "normal" | "1:1" => Ok(PlaybackSpeed::Normal),
            "trim_startup" | "trim" => Ok(PlaybackSpeed::TrimStartup),
            "fast" => Ok(PlaybackSpeed::Fast),
            other => Err(format!(
                "unknown playback speed '{}' (expected normal, trim_startup or fast)",
                other
            )),
        }
    }
}

/// What a scheduler step did to the playback run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Events remain; keep playing next tick
    Pending,
    /// Reached the end with looping on; cursor rewound to the start
    Rewound,
    /// Reached the end; playback is over
    Finished,
}

/// Playback cursor over a recording
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    next_index: usize,
    simulated_frame: u32,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind to the first event and reset the simulated clock
    pub fn restart(&mut self) {
        self.next_index = 0;
        self.simulated_frame = 0;
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn simulated_frame(&self) -> u32 {
        self.simulated_frame
    }

    /// Advance the simulated clock by one tick
    pub fn advance_frame(&mut self) {
        self.simulated_frame = self.simulated_frame.saturating_add(1);
    }

    /// Emit every event that is due on this tick
    pub fn step(
        &mut self,
        recording: &Recording,
        speed: PlaybackSpeed,
        looping: bool,
        synth: &mut dyn KeySynthesizer,
    ) -> StepOutcome {
        while let Some(event) = recording.get(self.next_index) {
            if self.next_index == 0 && speed == PlaybackSpeed::TrimStartup {
                self.simulated_frame = event.frame;
            }

            if speed == PlaybackSpeed::Fast {
                synth.synthesize(event.transition.key, event.transition.kind);
                self.next_index += 1;
                return StepOutcome::Pending;
            }

            if event.frame > self.simulated_frame {
                return StepOutcome::Pending;
            }
            synth.synthesize(event.transition.key, event.transition.kind);
            self.next_index += 1;
        }

        if looping {
            tracing::trace!("Playback reached the end, looping");
            self.restart();
            StepOutcome::Rewound
        } else {
            StepOutcome::Finished
        }
    }

    /// Keys pressed by already-emitted events and not released since
    ///
    /// Returned in the order they were first pressed.
    pub fn held_keys(&self, recording: &Recording) -> Vec<KeyIdentity> {
        let emitted = &recording.events()[..self.next_index.min(recording.len())];
        let mut held: Vec<KeyIdentity> = Vec::new();
        for event in emitted {
            let key = event.transition.key;
            match event.transition.kind {
                TransitionKind::Press => {
                    if !held.contains(&key) {
                        held.push(key);
                    }
                }
                TransitionKind::Release => held.retain(|k| *k != key),
            }
        }
        held
    }

    /// Synthesize a release for every key playback left held down
    ///
    /// Returns the number of releases sent.
    pub fn release_held_keys(
        &self,
        recording: &Recording,
        synth: &mut dyn KeySynthesizer,
    ) -> usize {
        let held = self.held_keys(recording);
        for key in &held {
            tracing::debug!("Releasing {} left down by interrupted playback", key);
            let release = KeyTransition::release(*key);
            synth.synthesize(release.key, release.kind);
        }
        held.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordedEvent;

    const A: KeyIdentity = KeyIdentity::plain(0x1E);
    const B: KeyIdentity = KeyIdentity::plain(0x30);

    fn recording(events: &[(KeyTransition, u32)]) -> Recording {
        Recording::from_events(
            events
                .iter()
                .map(|&(t, frame)| RecordedEvent::new(t, frame))
                .collect(),
        )
        .unwrap()
    }

    /// Run one playing tick the way the engine does: step, then advance
    fn tick(
        scheduler: &mut Scheduler,
        rec: &Recording,
        speed: PlaybackSpeed,
        looping: bool,
        out: &mut Vec<KeyTransition>,
    ) -> StepOutcome {
        let outcome = scheduler.step(rec, speed, looping, out);
        scheduler.advance_frame();
        outcome
    }

    #[test]
    fn test_normal_waits_for_due_frame() {
        let rec = recording(&[
            (KeyTransition::press(A), 2),
            (KeyTransition::release(A), 2),
            (KeyTransition::press(B), 4),
        ]);
        let mut scheduler = Scheduler::new();
        let mut out = Vec::new();

        // frames 0 and 1: nothing due
        tick(&mut scheduler, &rec, PlaybackSpeed::Normal, false, &mut out);
        tick(&mut scheduler, &rec, PlaybackSpeed::Normal, false, &mut out);
        assert!(out.is_empty());

        // frame 2: both same-frame events
        tick(&mut scheduler, &rec, PlaybackSpeed::Normal, false, &mut out);
        assert_eq!(out, vec![KeyTransition::press(A), KeyTransition::release(A)]);

        let outcome = tick(&mut scheduler, &rec, PlaybackSpeed::Normal, false, &mut out);
        assert_eq!(outcome, StepOutcome::Pending);
        assert_eq!(out.len(), 2);

        // frame 4: last event, and the run ends on the same tick
        let outcome = tick(&mut scheduler, &rec, PlaybackSpeed::Normal, false, &mut out);
        assert_eq!(outcome, StepOutcome::Finished);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_trim_startup_skips_lead_in() {
        let rec = recording(&[
            (KeyTransition::press(A), 500),
            (KeyTransition::release(A), 501),
        ]);
        let mut scheduler = Scheduler::new();
        let mut out = Vec::new();

        tick(&mut scheduler, &rec, PlaybackSpeed::TrimStartup, false, &mut out);
        assert_eq!(out, vec![KeyTransition::press(A)]);
        tick(&mut scheduler, &rec, PlaybackSpeed::TrimStartup, false, &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_fast_emits_one_per_tick() {
        let rec = recording(&[
            (KeyTransition::press(A), 10),
            (KeyTransition::release(A), 900),
            (KeyTransition::press(B), 5000),
        ]);
        let mut scheduler = Scheduler::new();
        let mut out = Vec::new();
        for expected in 1..=3 {
            let outcome = tick(&mut scheduler, &rec, PlaybackSpeed::Fast, false, &mut out);
            assert_eq!(outcome, StepOutcome::Pending);
            assert_eq!(out.len(), expected);
        }
        let outcome = tick(&mut scheduler, &rec, PlaybackSpeed::Fast, false, &mut out);
        assert_eq!(outcome, StepOutcome::Finished);
    }

    #[test]
    fn test_empty_recording_finishes_immediately() {
        let rec = Recording::new();
        let mut scheduler = Scheduler::new();
        let mut out = Vec::new();
        assert_eq!(
            scheduler.step(&rec, PlaybackSpeed::Normal, false, &mut out),
            StepOutcome::Finished
        );
        assert_eq!(
            scheduler.step(&rec, PlaybackSpeed::Normal, true, &mut out),
            StepOutcome::Rewound
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_loop_rewinds_cursor_and_clock() {
        let rec = recording(&[(KeyTransition::press(A), 0), (KeyTransition::release(A), 1)]);
        let mut scheduler = Scheduler::new();
        let mut out = Vec::new();
        tick(&mut scheduler, &rec, PlaybackSpeed::Normal, true, &mut out);
        let outcome = scheduler.step(&rec, PlaybackSpeed::Normal, true, &mut out);
        assert_eq!(outcome, StepOutcome::Rewound);
        assert_eq!(scheduler.next_index(), 0);
        assert_eq!(scheduler.simulated_frame(), 0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_held_keys_tracks_unmatched_presses() {
        let rec = recording(&[
            (KeyTransition::press(A), 0),
            (KeyTransition::press(B), 0),
            (KeyTransition::release(A), 1),
            (KeyTransition::release(B), 2),
        ]);
        let mut scheduler = Scheduler::new();
        let mut out = Vec::new();
        tick(&mut scheduler, &rec, PlaybackSpeed::Normal, false, &mut out);
        assert_eq!(scheduler.held_keys(&rec), vec![A, B]);

        tick(&mut scheduler, &rec, PlaybackSpeed::Normal, false, &mut out);
        assert_eq!(scheduler.held_keys(&rec), vec![B]);

        let mut released = Vec::new();
        assert_eq!(scheduler.release_held_keys(&rec, &mut released), 1);
        assert_eq!(released, vec![KeyTransition::release(B)]);
    }

    #[test]
    fn test_speed_parsing() {
        assert_eq!("normal".parse::<PlaybackSpeed>(), Ok(PlaybackSpeed::Normal));
        assert_eq!("trim-startup".parse::<PlaybackSpeed>(), Ok(PlaybackSpeed::TrimStartup));
        assert_eq!("FAST".parse::<PlaybackSpeed>(), Ok(PlaybackSpeed::Fast));
        assert!("warp".parse::<PlaybackSpeed>().is_err());
        assert_eq!(PlaybackSpeed::TrimStartup.to_string(), "trim_startup");
    }
}
