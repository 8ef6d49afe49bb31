//! Error types for keyreplay
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.
//!
//! The recording engine itself never fails; these errors come from the
//! host around it (configuration, input devices, key output, files).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the keyreplay application
#[derive(Error, Debug)]
pub enum KeyreplayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Recording file error: {0}")]
    Recording(#[from] RecordingFileError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to reading keyboard input
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Input capture is not supported on this platform: {0}")]
    NotSupported(String),

    #[error("evdev error: {0}")]
    Evdev(String),
}

/// Errors related to synthesizing key events
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("ydotool daemon not running.\n  Start with: systemctl --user start ydotool\n  Enable at boot: systemctl --user enable ydotool")]
    YdotoolNotRunning,

    #[error("ydotool not found in PATH. Install via your package manager.")]
    YdotoolNotFound,

    #[error("Key injection failed: {0}")]
    InjectionFailed(String),

    #[error("All output methods failed. Ensure ydotool is installed and ydotoold is running.")]
    AllMethodsFailed,
}

/// Errors reading or writing a recording file
///
/// Malformed lines are not errors; they are skipped and reported by the
/// decoder. Only failing to touch the file at all ends up here.
#[derive(Error, Debug)]
pub enum RecordingFileError {
    #[error("Failed to read recording {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write recording {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias using KeyreplayError
pub type Result<T> = std::result::Result<T, KeyreplayError>;

