//! Keyboard input module
//!
//! On Linux, provides kernel-level key event capture using evdev.
//! This approach works on all Wayland compositors because it
//! operates at the Linux input subsystem level.
//!
//! Linux: Requires the user to be in the 'input' group.
//!
//! Listeners deliver a stream of [`InputEvent`]s; the daemon folds the
//! events that arrive between two ticks into an [`InputFrame`] and hands
//! the resulting [`TickInput`] to the engine.

#[cfg(target_os = "linux")]
pub mod evdev_listener;

use crate::engine::{MouseState, TickInput};
use crate::error::InputError;
use crate::key::KeyTransition;
use tokio::sync::mpsc;

/// Events emitted by an input listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A key went down or up (auto-repeat is not reported)
    Key(KeyTransition),
    /// The left mouse button changed level
    MouseLeft { down: bool },
}

/// Trait for input capture implementations
#[async_trait::async_trait]
pub trait InputListener: Send + Sync {
    /// Start listening for input events
    /// Returns a channel receiver for events
    async fn start(&mut self) -> Result<mpsc::Receiver<InputEvent>, InputError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), InputError>;
}

/// Accumulates listener events between ticks
///
/// Mouse button edges are derived per tick from the button level, so a
/// press-and-release that both land inside one tick still reports a press
/// edge on that tick.
#[derive(Debug, Default)]
pub struct InputFrame {
    keys: Vec<KeyTransition>,
    mouse: MouseState,
    left_down: bool,
    left_pressed_since_tick: bool,
}

impl InputFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event for the upcoming tick
    pub fn push(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key(transition) => self.keys.push(transition),
            InputEvent::MouseLeft { down } => {
                if down && !self.left_down {
                    self.left_pressed_since_tick = true;
                }
                self.left_down = down;
            }
        }
    }

    /// Whether anything arrived since the last tick
    pub fn has_events(&self) -> bool {
        !self.keys.is_empty() || self.left_pressed_since_tick
    }

    /// Build this tick's input and reset for the next one
    pub fn take_tick(&mut self, focused: bool) -> TickInput {
        let was_down = self.mouse.left.down;
        if self.left_pressed_since_tick && was_down {
            // Went up and down again within one tick: report a fresh press
            self.mouse.left.update(false);
        }
        self.mouse
            .left
            .update(self.left_down || self.left_pressed_since_tick);
        self.left_pressed_since_tick = false;

        TickInput {
            keys: std::mem::take(&mut self.keys),
            mouse: self.mouse,
            focused,
        }
    }
}

/// Factory function to create the appropriate input listener
///
/// On Linux, uses evdev for kernel-level key event capture.
#[cfg(target_os = "linux")]
pub fn create_listener() -> Result<Box<dyn InputListener>, InputError> {
    Ok(Box::new(evdev_listener::EvdevListener::new()?))
}

/// Factory function to create the appropriate input listener
#[cfg(not(target_os = "linux"))]
pub fn create_listener() -> Result<Box<dyn InputListener>, InputError> {
    Err(InputError::NotSupported(
        "keyboard capture needs Linux evdev".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyIdentity;

    #[test]
    fn test_keys_are_drained_each_tick() {
        let mut frame = InputFrame::new();
        let a = KeyIdentity::plain(0x1E);
        frame.push(InputEvent::Key(KeyTransition::press(a)));
        frame.push(InputEvent::Key(KeyTransition::release(a)));
        assert!(frame.has_events());

        let tick = frame.take_tick(true);
        assert_eq!(tick.keys, vec![KeyTransition::press(a), KeyTransition::release(a)]);
        assert!(tick.focused);

        assert!(!frame.has_events());
        assert!(frame.take_tick(true).keys.is_empty());
    }

    #[test]
    fn test_mouse_press_edge() {
        let mut frame = InputFrame::new();
        frame.push(InputEvent::MouseLeft { down: true });
        let tick = frame.take_tick(true);
        assert!(tick.mouse.left.pressed);
        assert!(tick.mouse.left.down);

        // Still held: no new edge
        let tick = frame.take_tick(true);
        assert!(!tick.mouse.left.pressed);
        assert!(tick.mouse.left.down);

        frame.push(InputEvent::MouseLeft { down: false });
        let tick = frame.take_tick(true);
        assert!(tick.mouse.left.released);
    }

    #[test]
    fn test_click_within_one_tick_reports_press() {
        let mut frame = InputFrame::new();
        frame.push(InputEvent::MouseLeft { down: true });
        frame.push(InputEvent::MouseLeft { down: false });
        let tick = frame.take_tick(true);
        assert!(tick.mouse.left.pressed);

        let tick = frame.take_tick(true);
        assert!(tick.mouse.left.released);
        assert!(!tick.mouse.left.down);
    }
}
