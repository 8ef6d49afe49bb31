// Command-line interface definitions for keyreplay
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "keyreplay")]
#[command(author, version, about = "Frame-accurate keyboard macro recorder for Linux")]
#[command(long_about = "
keyreplay records keyboard input and plays it back with the same timing.
Everything is measured in ticks (60 per second by default), so playback
reproduces the recorded spacing between keys regardless of system load.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Install ydotool and start its daemon: systemctl --user enable --now ydotool
  4. Run: keyreplay setup (to write the default config)
  5. Run: keyreplay (to start the daemon)

USAGE:
  Press F1 (default) to start recording, F1 again to stop.
  Press F2 (default) to play the recording back; F2 again restarts it.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the record hotkey (e.g., F1, SCROLLLOCK, 0x3B)
    #[arg(long, value_name = "KEY")]
    pub record_key: Option<String>,

    /// Override the playback hotkey
    #[arg(long, value_name = "KEY")]
    pub playback_key: Option<String>,

    /// Bind a stop hotkey
    #[arg(long, value_name = "KEY")]
    pub stop_key: Option<String>,

    /// Playback speed: normal, trim_startup or fast
    #[arg(long, value_name = "SPEED")]
    pub speed: Option<String>,

    /// Loop playback until stopped
    #[arg(long = "loop")]
    pub looping: bool,

    /// Log key output instead of sending it
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Ask the running daemon to bind the next key press to a hotkey
    Bind {
        /// Which hotkey: record, playback or stop
        role: String,
    },

    /// Enable or disable hotkey handling in the running daemon
    Toggle,

    /// Decode a recording file and print its events
    Show {
        /// Path to recording file
        file: std::path::PathBuf,
    },

    /// Write the default config file
    Setup,

    /// Show current configuration
    Config,

    /// Show daemon status (for Waybar/polybar integration)
    Status {
        /// Continuously output status changes (for Waybar exec)
        #[arg(long)]
        follow: bool,

        /// Output format: "text" (default) or "json" (for Waybar)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
