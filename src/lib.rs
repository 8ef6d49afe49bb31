//! keyreplay: Frame-accurate keyboard macro recorder for Linux
//!
//! This library provides the core functionality for:
//! - Capturing key transitions via evdev (kernel-level, works on all compositors)
//! - Recording them against a per-tick frame counter
//! - Playing them back with the recorded spacing, trimmed, or as fast as possible
//! - Releasing any key left held when playback is cut short
//! - Persisting recordings as a line-oriented text file
//! - Sending keys via ydotool
//!
//! # Architecture
//!
//! ```text
//!                            ┌─────────────────────────────────────┐
//!                            │              Daemon                 │
//!                            │      (one engine update per tick)   │
//!                            └─────────────────────────────────────┘
//!                                            │
//!                   ┌────────────────────────┼────────────────────────┐
//!                   │                        │                        │
//!                   ▼                        ▼                        ▼
//!          ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//!          │    Input     │         │    Engine    │         │  State file  │
//!          │   (evdev)    │────────▶│  (mode FSM)  │────────▶│ (Waybar etc) │
//!          └──────────────┘  tick   └──────────────┘         └──────────────┘
//!                            input     │        │
//!                                      ▼        ▼
//!                            ┌────────────┐  ┌────────────┐
//!                            │  Recorder  │  │ Scheduler  │
//!                            │ (capture)  │  │ (playback) │
//!                            └────────────┘  └────────────┘
//!                                  │               │
//!                                  ▼               ▼
//!                            ┌────────────┐  ┌────────────┐
//!                            │   Codec    │  │   Output   │
//!                            │ (txt file) │  │ (ydotool)  │
//!                            └────────────┘  └────────────┘
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod input;
pub mod key;
pub mod output;
pub mod playback;
pub mod recording;
pub mod state;

pub use config::Config;
pub use engine::{Engine, Hotkeys, TickInput};
pub use error::{KeyreplayError, Result};
pub use key::{KeyIdentity, KeyTransition, TransitionKind};
pub use playback::PlaybackSpeed;
pub use recording::{RecordedEvent, Recording};
pub use state::{BindingRole, Mode};
