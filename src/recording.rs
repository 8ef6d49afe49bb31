//! Frame-indexed recording log
//!
//! A recording is the ordered list of key transitions captured while the
//! engine was in recording mode, each tagged with the capture frame at
//! which it arrived. Frames count ticks since recording started, so replay
//! timing depends only on the tick source, never on the wall clock.

use crate::key::{KeyIdentity, KeyTransition};

/// A captured key transition and the frame it was captured on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    pub transition: KeyTransition,
    pub frame: u32,
}

impl RecordedEvent {
    pub fn new(transition: KeyTransition, frame: u32) -> Self {
        Self { transition, frame }
    }
}

/// Ordered sequence of recorded events with non-decreasing frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recording {
    events: Vec<RecordedEvent>,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a recording from events that are already frame-ordered
    ///
    /// Returns `None` if any frame is lower than the one before it.
    pub fn from_events(events: Vec<RecordedEvent>) -> Option<Self> {
        let ordered = events.windows(2).all(|pair| pair[0].frame <= pair[1].frame);
        ordered.then_some(Self { events })
    }

    /// Append an event. Returns false (and drops the event) if its frame
    /// would break the ordering.
    pub fn push(&mut self, event: RecordedEvent) -> bool {
        if self.last_frame().is_some_and(|last| event.frame < last) {
            return false;
        }
        self.events.push(event);
        true
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RecordedEvent> {
        self.events.get(index)
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordedEvent> {
        self.events.iter()
    }

    pub fn first_frame(&self) -> Option<u32> {
        self.events.first().map(|e| e.frame)
    }

    pub fn last_frame(&self) -> Option<u32> {
        self.events.last().map(|e| e.frame)
    }

    /// Number of frames between the first and last event
    pub fn span(&self) -> u32 {
        match (self.first_frame(), self.last_frame()) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }
}

impl<'a> IntoIterator for &'a Recording {
    type Item = &'a RecordedEvent;
    type IntoIter = std::slice::Iter<'a, RecordedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Capture side of the log: owns the frame counter while recording
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    frame: u32,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a fresh recording
    pub fn restart(&mut self, recording: &mut Recording) {
        recording.clear();
        self.frame = 0;
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Advance the capture clock by one tick
    pub fn advance(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    /// Append this tick's transitions, skipping any excluded identity
    ///
    /// Hotkeys are passed as `excluded` so the presses used to drive the
    /// mode machine never end up in the recorded content. Returns the number
    /// of events appended.
    pub fn capture(
        &self,
        recording: &mut Recording,
        transitions: &[KeyTransition],
        excluded: &[KeyIdentity],
    ) -> usize {
        let mut appended = 0;
        for transition in transitions {
            if excluded.contains(&transition.key) {
                tracing::trace!("Skipping hotkey {} during capture", transition.key);
                continue;
            }
            if recording.push(RecordedEvent::new(*transition, self.frame)) {
                appended += 1;
            }
        }
        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: KeyIdentity = KeyIdentity::plain(0x1E);
    const B: KeyIdentity = KeyIdentity::plain(0x30);
    const F1: KeyIdentity = KeyIdentity::plain(0x3B);

    #[test]
    fn test_from_events_rejects_decreasing_frames() {
        let ok = vec![
            RecordedEvent::new(KeyTransition::press(A), 1),
            RecordedEvent::new(KeyTransition::release(A), 1),
            RecordedEvent::new(KeyTransition::press(B), 4),
        ];
        assert_eq!(Recording::from_events(ok).unwrap().len(), 3);

        let bad = vec![
            RecordedEvent::new(KeyTransition::press(A), 5),
            RecordedEvent::new(KeyTransition::release(A), 2),
        ];
        assert!(Recording::from_events(bad).is_none());
    }

    #[test]
    fn test_push_keeps_order_invariant() {
        let mut recording = Recording::new();
        assert!(recording.push(RecordedEvent::new(KeyTransition::press(A), 3)));
        assert!(!recording.push(RecordedEvent::new(KeyTransition::release(A), 2)));
        assert!(recording.push(RecordedEvent::new(KeyTransition::release(A), 3)));
        assert_eq!(recording.len(), 2);
        assert_eq!(recording.span(), 0);
    }

    #[test]
    fn test_capture_tags_frame_and_keeps_source_order() {
        let mut recorder = Recorder::new();
        let mut recording = Recording::new();
        recorder.restart(&mut recording);
        recorder.advance();
        recorder.advance();

        let batch = [
            KeyTransition::press(A),
            KeyTransition::press(B),
            KeyTransition::release(A),
        ];
        assert_eq!(recorder.capture(&mut recording, &batch, &[]), 3);

        let frames: Vec<u32> = recording.iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![2, 2, 2]);
        let transitions: Vec<KeyTransition> = recording.iter().map(|e| e.transition).collect();
        assert_eq!(transitions, batch.to_vec());
    }

    #[test]
    fn test_capture_excludes_hotkeys() {
        let recorder = Recorder::new();
        let mut recording = Recording::new();
        let batch = [
            KeyTransition::press(F1),
            KeyTransition::press(A),
            KeyTransition::release(F1),
        ];
        assert_eq!(recorder.capture(&mut recording, &batch, &[F1]), 1);
        assert_eq!(recording.get(0).unwrap().transition, KeyTransition::press(A));
    }

    #[test]
    fn test_restart_clears_recording_and_frame() {
        let mut recorder = Recorder::new();
        let mut recording = Recording::new();
        recorder.advance();
        recorder.capture(&mut recording, &[KeyTransition::press(A)], &[]);
        recorder.restart(&mut recording);
        assert!(recording.is_empty());
        assert_eq!(recorder.frame(), 0);
    }
}
