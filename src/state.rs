//! Mode state for the recording engine
//!
//! Idle ⇄ Recording ⇄ Playing, plus the three "press a key to bind it"
//! waiting modes entered from the host.

use std::fmt;
use std::str::FromStr;

/// Which hotkey a binding request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingRole {
    /// Start (and stop) recording
    Record,
    /// Start (and restart) playback
    Playback,
    /// Stop playback or recording
    Stop,
}

impl BindingRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingRole::Record => "record",
            BindingRole::Playback => "playback",
            BindingRole::Stop => "stop",
        }
    }

    /// Label shown next to the binding ("Record key: F1")
    pub fn label(&self) -> &'static str {
        match self {
            BindingRole::Record => "Record key",
            BindingRole::Playback => "Playback key",
            BindingRole::Stop => "Stop key",
        }
    }
}

impl fmt::Display for BindingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "record" => Ok(BindingRole::Record),
            "playback" | "play" => Ok(BindingRole::Playback),
            "stop" => Ok(BindingRole::Stop),
            other => Err(format!("unknown hotkey role '{}'", other)),
        }
    }
}

/// Engine mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Waiting for a hotkey
    #[default]
    Idle,
    /// Capturing key transitions into the recording
    Recording,
    /// Replaying the recording
    Playing,
    /// Next key press becomes the record hotkey
    AwaitingRecordHotkey,
    /// Next key press becomes the playback hotkey
    AwaitingPlaybackHotkey,
    /// Next key press becomes the stop hotkey
    AwaitingStopHotkey,
}

impl Mode {
    pub fn is_idle(&self) -> bool {
        matches!(self, Mode::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Mode::Recording)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Mode::Playing)
    }

    /// The binding being waited for, if any
    pub fn awaiting(&self) -> Option<BindingRole> {
        match self {
            Mode::AwaitingRecordHotkey => Some(BindingRole::Record),
            Mode::AwaitingPlaybackHotkey => Some(BindingRole::Playback),
            Mode::AwaitingStopHotkey => Some(BindingRole::Stop),
            _ => None,
        }
    }

    /// Mode that waits for a binding of `role`
    pub fn awaiting_for(role: BindingRole) -> Self {
        match role {
            BindingRole::Record => Mode::AwaitingRecordHotkey,
            BindingRole::Playback => Mode::AwaitingPlaybackHotkey,
            BindingRole::Stop => Mode::AwaitingStopHotkey,
        }
    }

    /// Short name written to the state file
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Recording => "recording",
            Mode::Playing => "playing",
            Mode::AwaitingRecordHotkey
            | Mode::AwaitingPlaybackHotkey
            | Mode::AwaitingStopHotkey => "binding",
        }
    }

    /// Status symbol used in the title-style label
    pub fn symbol(&self) -> &'static str {
        match self {
            Mode::Recording => "O",
            Mode::Playing => ">",
            _ => "-",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => write!(f, "Idle"),
            Mode::Recording => write!(f, "Recording"),
            Mode::Playing => write!(f, "Playing"),
            Mode::AwaitingRecordHotkey => write!(f, "Waiting for record key"),
            Mode::AwaitingPlaybackHotkey => write!(f, "Waiting for playback key"),
            Mode::AwaitingStopHotkey => write!(f, "Waiting for stop key"),
        }
    }
}
