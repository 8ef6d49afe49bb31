//! Recording/playback engine
//!
//! [`Engine`] holds all session state: the current [`Mode`], the hotkey
//! bindings, the recording and both frame counters. The host calls
//! [`Engine::update`] exactly once per tick with the input gathered since
//! the previous tick; the engine routes that input to capture, binding or
//! mode control and drives playback through a [`KeySynthesizer`].
//!
//! Per tick, in priority order:
//!
//! ```text
//!   Idle ──record key──▶ Recording ──record/stop key──▶ Idle
//!    │                      │
//!    │                 playback key
//!    │                      ▼
//!    └──playback key──▶  Playing ──stop key / disabled / end──▶ Idle
//!                          │  ▲
//!                          └──┘ playback key restarts, record key re-records
//! ```
//!
//! Every exit from `Playing` triggered by a key or by disabling the engine
//! first releases the keys that playback left held.

use crate::key::{KeyIdentity, KeyTransition};
use crate::output::KeySynthesizer;
use crate::playback::{PlaybackSpeed, Scheduler, StepOutcome};
use crate::recording::{Recorder, Recording};
use crate::state::{BindingRole, Mode};

/// Edge-tracked state of a button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// True for one tick when the button goes down
    pub pressed: bool,
    /// True while the button is held
    pub down: bool,
    /// True for one tick when the button goes up
    pub released: bool,
}

impl ButtonState {
    /// Feed the current level and derive this tick's edges
    pub fn update(&mut self, is_down: bool) {
        if is_down {
            self.released = false;
            self.pressed = !self.down;
            self.down = true;
        } else {
            self.released = self.down;
            self.pressed = false;
            self.down = false;
        }
    }
}

/// Mouse state as seen by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseState {
    pub x: i32,
    pub y: i32,
    pub left: ButtonState,
}

/// Input gathered for a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Key transitions in arrival order
    pub keys: Vec<KeyTransition>,
    pub mouse: MouseState,
    /// Whether the host currently has input focus
    pub focused: bool,
}

impl TickInput {
    /// Focused input carrying only key transitions
    pub fn keys(keys: Vec<KeyTransition>) -> Self {
        Self {
            keys,
            mouse: MouseState::default(),
            focused: true,
        }
    }

    /// Focused input with nothing in it
    pub fn empty() -> Self {
        Self::keys(Vec::new())
    }

    /// Whether `key` was pressed (not released) this tick
    pub fn key_pressed(&self, key: KeyIdentity) -> bool {
        self.keys.iter().any(|t| t.is_press() && t.key == key)
    }

    fn key_pressed_opt(&self, key: Option<KeyIdentity>) -> bool {
        key.is_some_and(|k| self.key_pressed(k))
    }

    /// First key press of the tick, ignoring releases
    pub fn first_press(&self) -> Option<KeyIdentity> {
        self.keys.iter().find(|t| t.is_press()).map(|t| t.key)
    }
}

/// Hotkey bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkeys {
    pub record: KeyIdentity,
    pub playback: KeyIdentity,
    pub stop: Option<KeyIdentity>,
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            record: KeyIdentity::plain(0x3B),   // F1
            playback: KeyIdentity::plain(0x3C), // F2
            stop: None,
        }
    }
}

impl Hotkeys {
    pub fn get(&self, role: BindingRole) -> Option<KeyIdentity> {
        match role {
            BindingRole::Record => Some(self.record),
            BindingRole::Playback => Some(self.playback),
            BindingRole::Stop => self.stop,
        }
    }

    pub fn set(&mut self, role: BindingRole, key: KeyIdentity) {
        match role {
            BindingRole::Record => self.record = key,
            BindingRole::Playback => self.playback = key,
            BindingRole::Stop => self.stop = Some(key),
        }
    }

    /// Identities that must never be recorded as content
    pub fn excluded(&self) -> Vec<KeyIdentity> {
        let mut keys = vec![self.record, self.playback];
        keys.extend(self.stop);
        keys
    }

    /// Roles other than `role` already bound to `key`
    pub fn conflicts(&self, role: BindingRole, key: KeyIdentity) -> Vec<BindingRole> {
        [BindingRole::Record, BindingRole::Playback, BindingRole::Stop]
            .into_iter()
            .filter(|&other| other != role && self.get(other) == Some(key))
            .collect()
    }
}

/// The recording/playback engine
#[derive(Debug, Clone)]
pub struct Engine {
    mode: Mode,
    hotkeys: Hotkeys,
    recording: Recording,
    recorder: Recorder,
    scheduler: Scheduler,
    speed: PlaybackSpeed,
    looping: bool,
    enabled: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Hotkeys::default())
    }
}

impl Engine {
    /// Create an idle, enabled engine with an empty recording
    pub fn new(hotkeys: Hotkeys) -> Self {
        Self {
            mode: Mode::Idle,
            hotkeys,
            recording: Recording::new(),
            recorder: Recorder::new(),
            scheduler: Scheduler::new(),
            speed: PlaybackSpeed::default(),
            looping: false,
            enabled: true,
        }
    }

    pub fn with_speed(mut self, speed: PlaybackSpeed) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn hotkeys(&self) -> &Hotkeys {
        &self.hotkeys
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn capture_frame(&self) -> u32 {
        self.recorder.frame()
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable hotkey handling. A disabled engine ignores hotkeys
    /// while idle and abandons playback on its next tick.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Reassign a hotkey directly. Only allowed while idle.
    pub fn set_hotkey(&mut self, role: BindingRole, key: KeyIdentity) -> bool {
        if !self.mode.is_idle() {
            return false;
        }
        self.bind(role, key);
        true
    }

    /// Wait for the next key press to become the `role` hotkey
    ///
    /// Only honored while idle; returns whether the request was accepted.
    pub fn request_binding(&mut self, role: BindingRole) -> bool {
        if !self.mode.is_idle() {
            tracing::debug!("Ignoring {} binding request while {}", role, self.mode);
            return false;
        }
        self.set_mode(Mode::awaiting_for(role));
        true
    }

    /// Replace the recording wholesale
    ///
    /// Interrupts playback (releasing held keys) or recording first.
    pub fn load_recording(&mut self, recording: Recording, synth: &mut dyn KeySynthesizer) {
        self.halt(synth);
        self.recording = recording;
        self.scheduler.restart();
        tracing::debug!("Recording replaced ({} events)", self.recording.len());
    }

    /// Return to idle from any mode, releasing held keys if playing
    pub fn halt(&mut self, synth: &mut dyn KeySynthesizer) {
        if self.mode.is_playing() {
            self.release_held_keys(synth);
        }
        if !self.mode.is_idle() {
            self.set_mode(Mode::Idle);
        }
    }

    /// Title-style label reflecting the current mode
    pub fn status_label(&self) -> String {
        format!("{} keyreplay", self.mode.symbol())
    }

    /// Label for a hotkey binding ("Record key: F1", or a prompt while waiting)
    pub fn binding_label(&self, role: BindingRole) -> String {
        if self.mode.awaiting() == Some(role) {
            return "Press any key".to_string();
        }
        match self.hotkeys.get(role) {
            Some(key) => format!("{}: {}", role.label(), key),
            None => format!("{}: (none)", role.label()),
        }
    }

    /// Power-saving hint: the host may block until the next input event
    /// instead of ticking on a timer
    pub fn should_block(&self) -> bool {
        self.mode.is_idle()
    }

    /// Run one tick
    pub fn update(&mut self, input: &TickInput, synth: &mut dyn KeySynthesizer) {
        match self.mode {
            Mode::Idle => {
                if self.enabled {
                    if input.key_pressed(self.hotkeys.record) {
                        self.start_recording();
                    }
                    if input.key_pressed(self.hotkeys.playback) {
                        self.start_playback();
                    }
                }
            }

            Mode::AwaitingRecordHotkey
            | Mode::AwaitingPlaybackHotkey
            | Mode::AwaitingStopHotkey => {
                if input.focused {
                    self.update_binding(input);
                }
            }

            Mode::Recording => {
                if input.key_pressed(self.hotkeys.record) {
                    self.set_mode(Mode::Idle);
                } else if input.key_pressed(self.hotkeys.playback) {
                    self.start_playback();
                } else if input.key_pressed_opt(self.hotkeys.stop) {
                    self.set_mode(Mode::Idle);
                } else {
                    self.recorder.capture(
                        &mut self.recording,
                        &input.keys,
                        &self.hotkeys.excluded(),
                    );
                }
            }

            Mode::Playing => {
                if !self.enabled {
                    self.release_held_keys(synth);
                    self.set_mode(Mode::Idle);
                } else if input.key_pressed(self.hotkeys.record) {
                    self.release_held_keys(synth);
                    self.start_recording();
                } else if input.key_pressed(self.hotkeys.playback) {
                    self.release_held_keys(synth);
                    self.start_playback();
                } else if input.key_pressed_opt(self.hotkeys.stop) {
                    self.release_held_keys(synth);
                    self.set_mode(Mode::Idle);
                } else {
                    let outcome =
                        self.scheduler
                            .step(&self.recording, self.speed, self.looping, synth);
                    if outcome == StepOutcome::Finished {
                        tracing::info!("Playback finished");
                        self.set_mode(Mode::Idle);
                    }
                }
            }
        }

        // Finish the tick
        match self.mode {
            Mode::Recording => self.recorder.advance(),
            Mode::Playing => self.scheduler.advance_frame(),
            _ => {}
        }
    }

    fn update_binding(&mut self, input: &TickInput) {
        let Some(role) = self.mode.awaiting() else {
            return;
        };

        if input.mouse.left.pressed {
            tracing::info!("{} binding cancelled", role);
            self.set_mode(Mode::Idle);
        } else if let Some(key) = input.first_press() {
            self.bind(role, key);
            self.set_mode(Mode::Idle);
        }
    }

    fn bind(&mut self, role: BindingRole, key: KeyIdentity) {
        let conflicts = self.hotkeys.conflicts(role, key);
        if !conflicts.is_empty() {
            tracing::warn!("{} is also bound to {:?}", key, conflicts);
        }
        self.hotkeys.set(role, key);
        tracing::info!("{}: {}", role.label(), key);
    }

    fn start_recording(&mut self) {
        self.recorder.restart(&mut self.recording);
        self.set_mode(Mode::Recording);
    }

    fn start_playback(&mut self) {
        self.scheduler.restart();
        self.set_mode(Mode::Playing);
        tracing::debug!(
            "Playing {} events (speed: {}, loop: {})",
            self.recording.len(),
            self.speed,
            self.looping
        );
    }

    fn release_held_keys(&mut self, synth: &mut dyn KeySynthesizer) {
        let released = self.scheduler.release_held_keys(&self.recording, synth);
        if released > 0 {
            tracing::debug!("Released {} held key(s)", released);
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::info!("{} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F1: KeyIdentity = KeyIdentity::plain(0x3B);
    const F2: KeyIdentity = KeyIdentity::plain(0x3C);
    const F3: KeyIdentity = KeyIdentity::plain(0x3D);
    const A: KeyIdentity = KeyIdentity::plain(0x1E);

    fn press(key: KeyIdentity) -> TickInput {
        TickInput::keys(vec![KeyTransition::press(key)])
    }

    #[test]
    fn test_button_edges() {
        let mut button = ButtonState::default();
        button.update(true);
        assert!(button.pressed && button.down && !button.released);
        button.update(true);
        assert!(!button.pressed && button.down);
        button.update(false);
        assert!(button.released && !button.down);
        button.update(false);
        assert!(!button.released);
    }

    #[test]
    fn test_record_hotkey_starts_and_stops_recording() {
        let mut engine = Engine::new(Hotkeys::default());
        let mut out = Vec::new();

        engine.update(&press(F1), &mut out);
        assert_eq!(engine.mode(), Mode::Recording);

        engine.update(&press(A), &mut out);
        engine.update(&press(F1), &mut out);
        assert_eq!(engine.mode(), Mode::Idle);
        assert_eq!(engine.recording().len(), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn test_release_of_hotkey_does_not_trigger() {
        let mut engine = Engine::new(Hotkeys::default());
        let mut out = Vec::new();
        engine.update(&TickInput::keys(vec![KeyTransition::release(F1)]), &mut out);
        assert_eq!(engine.mode(), Mode::Idle);
    }

    #[test]
    fn test_disabled_engine_ignores_hotkeys_when_idle() {
        let mut engine = Engine::new(Hotkeys::default());
        engine.set_enabled(false);
        let mut out = Vec::new();
        engine.update(&press(F1), &mut out);
        engine.update(&press(F2), &mut out);
        assert_eq!(engine.mode(), Mode::Idle);
    }

    #[test]
    fn test_recording_to_playback_directly() {
        let mut engine = Engine::new(Hotkeys::default());
        let mut out = Vec::new();
        engine.update(&press(F1), &mut out);
        engine.update(&press(F2), &mut out);
        assert_eq!(engine.mode(), Mode::Playing);
        assert_eq!(engine.scheduler().next_index(), 0);
    }

    #[test]
    fn test_stop_hotkey_ends_recording() {
        let hotkeys = Hotkeys {
            stop: Some(F3),
            ..Hotkeys::default()
        };
        let mut engine = Engine::new(hotkeys);
        let mut out = Vec::new();
        engine.update(&press(F1), &mut out);
        engine.update(&press(F3), &mut out);
        assert_eq!(engine.mode(), Mode::Idle);
        assert!(engine.recording().is_empty());
    }

    #[test]
    fn test_same_key_for_both_hotkeys_ends_in_playing() {
        let hotkeys = Hotkeys {
            record: F1,
            playback: F1,
            stop: None,
        };
        let mut engine = Engine::new(hotkeys);
        let mut out = Vec::new();
        engine.update(&press(F1), &mut out);
        assert_eq!(engine.mode(), Mode::Playing);
    }

    #[test]
    fn test_binding_takes_first_press() {
        let mut engine = Engine::new(Hotkeys::default());
        let mut out = Vec::new();
        assert!(engine.request_binding(BindingRole::Record));
        assert_eq!(engine.binding_label(BindingRole::Record), "Press any key");

        // A tick with nothing keeps waiting
        engine.update(&TickInput::empty(), &mut out);
        assert_eq!(engine.mode(), Mode::AwaitingRecordHotkey);

        let input = TickInput::keys(vec![KeyTransition::release(F2), KeyTransition::press(A)]);
        engine.update(&input, &mut out);
        assert_eq!(engine.mode(), Mode::Idle);
        assert_eq!(engine.hotkeys().record, A);
        assert_eq!(engine.binding_label(BindingRole::Record), "Record key: A");
    }

    #[test]
    fn test_binding_cancelled_by_mouse_press() {
        let mut engine = Engine::new(Hotkeys::default());
        let mut out = Vec::new();
        engine.request_binding(BindingRole::Stop);

        let mut input = press(A);
        input.mouse.left.update(true);
        engine.update(&input, &mut out);
        assert_eq!(engine.mode(), Mode::Idle);
        assert_eq!(engine.hotkeys().stop, None);
    }

    #[test]
    fn test_binding_requires_focus() {
        let mut engine = Engine::new(Hotkeys::default());
        let mut out = Vec::new();
        engine.request_binding(BindingRole::Playback);

        let mut input = press(A);
        input.focused = false;
        engine.update(&input, &mut out);
        assert_eq!(engine.mode(), Mode::AwaitingPlaybackHotkey);
    }

    #[test]
    fn test_binding_request_ignored_unless_idle() {
        let mut engine = Engine::new(Hotkeys::default());
        let mut out = Vec::new();
        engine.update(&press(F1), &mut out);
        assert!(!engine.request_binding(BindingRole::Playback));
        assert!(!engine.set_hotkey(BindingRole::Playback, A));
        assert_eq!(engine.mode(), Mode::Recording);
    }

    #[test]
    fn test_disabling_abandons_playback_and_releases() {
        let mut engine = Engine::new(Hotkeys::default());
        let mut out = Vec::new();
        engine.update(&press(F1), &mut out);
        engine.update(&press(A), &mut out);
        engine.update(&TickInput::empty(), &mut out);
        engine.update(&TickInput::keys(vec![KeyTransition::release(A)]), &mut out);
        engine.update(&press(F1), &mut out);

        // Stop while A is still held by playback
        engine.update(&press(F2), &mut out);
        engine.update(&TickInput::empty(), &mut out);
        assert_eq!(out, vec![KeyTransition::press(A)]);

        engine.set_enabled(false);
        engine.update(&TickInput::empty(), &mut out);
        assert_eq!(engine.mode(), Mode::Idle);
        assert_eq!(out.last(), Some(&KeyTransition::release(A)));
    }

    #[test]
    fn test_status_label_follows_mode() {
        let mut engine = Engine::new(Hotkeys::default());
        let mut out = Vec::new();
        assert_eq!(engine.status_label(), "- keyreplay");
        engine.update(&press(F1), &mut out);
        assert_eq!(engine.status_label(), "O keyreplay");
        assert!(!engine.should_block());
    }

    #[test]
    fn test_hotkey_conflicts() {
        let hotkeys = Hotkeys::default();
        assert_eq!(hotkeys.conflicts(BindingRole::Stop, F1), vec![BindingRole::Record]);
        assert!(hotkeys.conflicts(BindingRole::Record, F1).is_empty());
        assert_eq!(hotkeys.excluded(), vec![F1, F2]);
    }
}
