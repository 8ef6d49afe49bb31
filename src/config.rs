//! Configuration loading and types for keyreplay
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/keyreplay/config.toml)
//! 3. Environment variables (KEYREPLAY_*)
//! 4. CLI arguments (highest priority)

use crate::engine::Hotkeys;
use crate::error::KeyreplayError;
use crate::key::parse_key_name;
use crate::playback::PlaybackSpeed;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# keyreplay Configuration
#
# Location: ~/.config/keyreplay/config.toml
# All settings can be overridden via CLI flags

# Recording file, loaded when the daemon starts and saved whenever a
# recording ends. Use "auto" for the default location
# (~/.local/share/keyreplay/recording.txt), a custom path, or "disabled".
recording_file = "auto"

# State file for external integrations (Waybar, polybar, etc.)
# Use "auto" for default location ($XDG_RUNTIME_DIR/keyreplay/state),
# a custom path, or "disabled" to turn off. The daemon writes its mode
# ("idle", "recording", "playing", "binding") to this file whenever it changes.
state_file = "auto"

[hotkeys]
# Key that starts a recording (and stops it when pressed again)
# Names: F1-F24, SCROLLLOCK, PAUSE, RIGHTCTRL, ... or raw scancodes
# such as 0x3B (F1) or 0xE01D (right Ctrl)
record = "F1"

# Key that starts playback (and restarts it when pressed again)
playback = "F2"

# Optional key that stops playback or recording
# stop = "F3"

[playback]
# Timing policy: "normal", "trim_startup" or "fast"
# - normal: reproduce the recorded timing
# - trim_startup: like normal, but skip the pause before the first key
# - fast: one key event per tick, recorded timing ignored
speed = "normal"

# Start over when the end of the recording is reached
loop = false

# Respond to hotkeys (can be toggled at runtime with `keyreplay toggle`)
enabled = true

# Ticks per second; recorded timing has this resolution
tick_rate_hz = 60

[output]
# How keys are sent: "ydotool" or "dry_run" (log only)
mode = "ydotool"

# Delay between key events within one tick, in milliseconds
key_delay_ms = 0
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hotkeys: HotkeyConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Where the recording is persisted ("auto", a path, or "disabled")
    #[serde(default = "default_auto")]
    pub recording_file: Option<String>,

    /// Optional path to state file for external integrations (e.g., Waybar)
    /// When set, the daemon writes the current mode to this file whenever
    /// it changes.
    #[serde(default = "default_auto")]
    pub state_file: Option<String>,
}

/// Hotkey bindings, as key names
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HotkeyConfig {
    /// Start/stop recording
    #[serde(default = "default_record_key")]
    pub record: String,

    /// Start/restart playback
    #[serde(default = "default_playback_key")]
    pub playback: String,

    /// Optional stop key
    #[serde(default)]
    pub stop: Option<String>,
}

/// Playback behaviour
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub speed: PlaybackSpeed,

    #[serde(default, rename = "loop")]
    pub looping: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,
}

/// Key output configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputMode,

    /// Delay between key events within one tick (ms)
    #[serde(default)]
    pub key_delay_ms: u32,
}

/// Output backend selection
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Send keys through ydotool
    #[default]
    Ydotool,
    /// Only log what would be sent
    DryRun,
}

fn default_record_key() -> String {
    "F1".to_string()
}

fn default_playback_key() -> String {
    "F2".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tick_rate() -> u32 {
    60
}

fn default_auto() -> Option<String> {
    Some("auto".to_string())
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            record: default_record_key(),
            playback: default_playback_key(),
            stop: None,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: PlaybackSpeed::default(),
            looping: false,
            enabled: true,
            tick_rate_hz: default_tick_rate(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            key_delay_ms: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkeys: HotkeyConfig::default(),
            playback: PlaybackConfig::default(),
            output: OutputConfig::default(),
            recording_file: default_auto(),
            state_file: default_auto(),
        }
    }
}

impl HotkeyConfig {
    /// Parse the configured key names
    pub fn resolve(&self) -> Result<Hotkeys, KeyreplayError> {
        let parse = |what: &str, name: &str| {
            parse_key_name(name)
                .map_err(|e| KeyreplayError::Config(format!("hotkeys.{}: {}", what, e)))
        };

        Ok(Hotkeys {
            record: parse("record", &self.record)?,
            playback: parse("playback", &self.playback)?,
            stop: self
                .stop
                .as_deref()
                .map(|name| parse("stop", name))
                .transpose()?,
        })
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "keyreplay")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (state, pid, bind requests)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to /tmp
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("keyreplay")
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "keyreplay")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the data directory path (for recordings)
    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "keyreplay")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve the state file path from config
    /// Returns None if state_file is not configured or explicitly disabled
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        resolve_path(
            self.state_file.as_deref(),
            Self::runtime_dir().join("state"),
        )
    }

    /// Resolve the recording file path from config
    /// Returns None if recording_file is not configured or explicitly disabled
    pub fn resolve_recording_file(&self) -> Option<PathBuf> {
        resolve_path(
            self.recording_file.as_deref(),
            Self::data_dir().join("recording.txt"),
        )
    }

    /// Ensure config and data directories exist
    pub fn ensure_directories() -> std::io::Result<()> {
        if let Some(config_dir) = Self::config_dir() {
            std::fs::create_dir_all(&config_dir)?;
            tracing::debug!("Ensured config directory exists: {:?}", config_dir);
        }

        let data_dir = Self::data_dir();
        std::fs::create_dir_all(&data_dir)?;
        tracing::debug!("Ensured data directory exists: {:?}", data_dir);

        Ok(())
    }
}

fn resolve_path(setting: Option<&str>, auto: PathBuf) -> Option<PathBuf> {
    setting.and_then(|path| match path.to_lowercase().as_str() {
        "disabled" | "none" | "off" | "false" => None,
        "auto" => Some(auto),
        _ => Some(PathBuf::from(path)),
    })
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, KeyreplayError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| KeyreplayError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| KeyreplayError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(key) = std::env::var("KEYREPLAY_RECORD_KEY") {
        config.hotkeys.record = key;
    }
    if let Ok(key) = std::env::var("KEYREPLAY_PLAYBACK_KEY") {
        config.hotkeys.playback = key;
    }
    if let Ok(speed) = std::env::var("KEYREPLAY_SPEED") {
        config.playback.speed = speed
            .parse()
            .map_err(|e| KeyreplayError::Config(format!("KEYREPLAY_SPEED: {}", e)))?;
    }

    Ok(config)
}
