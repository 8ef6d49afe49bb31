//! Daemon module - main event loop orchestration
//!
//! Drives the engine from a fixed-rate tick, feeding it the input captured
//! since the previous tick and sending the keys it emits to the output
//! backend. While the engine is idle the tick timer is paused and the loop
//! only wakes up for input or signals.

use crate::codec;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{KeyreplayError, Result};
use crate::input::{self, InputFrame};
use crate::key::KeyTransition;
use crate::output::{self, KeyOutput};
use crate::state::{BindingRole, Mode};
use pidlock::Pidlock;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::MissedTickBehavior;

/// Write state to file for external integrations (e.g., Waybar)
fn write_state_file(path: &Path, state: &str) {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    if let Err(e) = std::fs::write(path, state) {
        tracing::warn!("Failed to write state file: {}", e);
    } else {
        tracing::trace!("State file updated: {}", state);
    }
}

/// Remove a runtime file on shutdown
fn cleanup_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

/// Path of the PID file used by `keyreplay bind` and `keyreplay toggle`
pub fn pid_file_path() -> PathBuf {
    Config::runtime_dir().join("pid")
}

/// Path of the file carrying a pending binding request
pub fn bind_request_path() -> PathBuf {
    Config::runtime_dir().join("bind")
}

/// Write PID file for external control via signals
fn write_pid_file() -> Option<PathBuf> {
    let pid_path = pid_file_path();

    // Ensure parent directory exists
    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }

    let pid = std::process::id();
    if let Err(e) = std::fs::write(&pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }

    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path)
}

/// Read and consume a pending binding request
fn take_bind_request() -> Option<BindingRole> {
    let path = bind_request_path();
    let contents = std::fs::read_to_string(&path).ok()?;
    cleanup_file(&path);
    match contents.parse() {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::warn!("Ignoring binding request: {}", e);
            None
        }
    }
}

/// Main daemon that orchestrates all components
pub struct Daemon {
    config: Config,
    state_file_path: Option<PathBuf>,
    recording_file_path: Option<PathBuf>,
    pid_file_path: Option<PathBuf>,
}

impl Daemon {
    /// Create a new daemon with the given configuration
    pub fn new(config: Config) -> Self {
        let state_file_path = config.resolve_state_file();
        let recording_file_path = config.resolve_recording_file();

        Self {
            config,
            state_file_path,
            recording_file_path,
            pid_file_path: None,
        }
    }

    /// Update the state file if configured
    fn update_state(&self, mode: Mode) {
        if let Some(ref path) = self.state_file_path {
            write_state_file(path, mode.as_str());
        }
    }

    /// Persist the current recording if a recording file is configured
    fn save_recording(&self, engine: &Engine) {
        let Some(ref path) = self.recording_file_path else {
            return;
        };
        match codec::save(path, engine.recording()) {
            Ok(()) => tracing::info!(
                "Saved {} events ({} frames) to {:?}",
                engine.recording().len(),
                engine.recording().span(),
                path
            ),
            Err(e) => tracing::error!("{}", e),
        }
    }

    /// Load the persisted recording into the engine, if there is one
    fn load_recording(&self, engine: &mut Engine, pending: &mut Vec<KeyTransition>) {
        let Some(ref path) = self.recording_file_path else {
            return;
        };
        if !path.exists() {
            tracing::debug!("No recording at {:?} yet", path);
            return;
        }
        match codec::load(path) {
            Ok(decoded) => {
                tracing::info!(
                    "Loaded {} events from {:?} ({} line(s) skipped)",
                    decoded.recording.len(),
                    path,
                    decoded.skipped()
                );
                engine.load_recording(decoded.recording, pending);
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }

    /// React to the engine leaving or entering a mode
    fn on_mode_change(&self, from: Mode, to: Mode, engine: &Engine) {
        self.update_state(to);
        tracing::debug!("Status: {}", engine.status_label());

        if from.is_recording() {
            self.save_recording(engine);
        }
        if from.awaiting().is_some() && to.is_idle() {
            for role in [BindingRole::Record, BindingRole::Playback, BindingRole::Stop] {
                tracing::debug!("{}", engine.binding_label(role));
            }
        }
    }

    /// Send the keys the engine emitted this tick
    async fn flush(chain: &[Box<dyn KeyOutput>], pending: &mut Vec<KeyTransition>) {
        if let Err(e) = output::emit_with_fallback(chain, pending).await {
            tracing::error!("Key output failed: {}", e);
        }
        pending.clear();
    }

    /// Run the daemon main loop
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting keyreplay daemon");

        // Single instance check
        let lock_path = Config::runtime_dir().join("daemon.lock");
        std::fs::create_dir_all(Config::runtime_dir())?;
        let mut pidlock = Pidlock::new(&lock_path.to_string_lossy());
        if pidlock.acquire().is_err() {
            return Err(KeyreplayError::Config(
                "Another keyreplay daemon is already running".to_string(),
            ));
        }

        // Write PID file for external control via signals
        self.pid_file_path = write_pid_file();

        // Set up signal handlers for external control
        let mut sigusr1 = signal(SignalKind::user_defined1()).map_err(|e| {
            KeyreplayError::Config(format!("Failed to set up SIGUSR1 handler: {}", e))
        })?;
        let mut sigusr2 = signal(SignalKind::user_defined2()).map_err(|e| {
            KeyreplayError::Config(format!("Failed to set up SIGUSR2 handler: {}", e))
        })?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            KeyreplayError::Config(format!("Failed to set up SIGTERM handler: {}", e))
        })?;

        // Ensure required directories exist
        Config::ensure_directories().map_err(|e| {
            KeyreplayError::Config(format!("Failed to create directories: {}", e))
        })?;

        let hotkeys = self.config.hotkeys.resolve()?;
        let mut engine = Engine::new(hotkeys)
            .with_speed(self.config.playback.speed)
            .with_looping(self.config.playback.looping);
        engine.set_enabled(self.config.playback.enabled);

        tracing::info!(
            "Hotkeys: record={}, playback={}, stop={}",
            hotkeys.record,
            hotkeys.playback,
            hotkeys
                .stop
                .map(|k| k.to_string())
                .unwrap_or_else(|| "(none)".to_string())
        );
        tracing::info!(
            "Playback: speed={}, loop={}, enabled={}",
            engine.speed(),
            engine.is_looping(),
            engine.is_enabled()
        );

        if let Some(ref path) = self.state_file_path {
            tracing::info!("State file: {:?}", path);
        }

        // Initialize output chain
        let output_chain = output::create_output_chain(&self.config.output);
        tracing::debug!(
            "Output chain: {}",
            output_chain
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        let mut pending: Vec<KeyTransition> = Vec::new();
        self.load_recording(&mut engine, &mut pending);

        // Start input listener
        let mut listener = input::create_listener()?;
        let mut input_rx = listener.start().await?;

        let tick_rate = self.config.playback.tick_rate_hz.max(1);
        let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / tick_rate as f64));
        // Every tick counts as one frame, so late ticks are delayed, not skipped
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!("Tick rate: {} Hz", tick_rate);

        let mut frame = InputFrame::new();
        let mut last_mode = engine.mode();

        // Write initial state
        self.update_state(last_mode);

        // Main event loop
        loop {
            let mut run_tick = false;

            tokio::select! {
                // Fixed-rate tick while something is going on
                _ = interval.tick(), if !engine.should_block() => {
                    run_tick = true;
                }

                event = input_rx.recv() => {
                    match event {
                        Some(event) => {
                            frame.push(event);
                            // Idle engines tick on input instead of on the timer
                            run_tick = engine.should_block();
                        }
                        None => {
                            tracing::error!("Input listener stopped");
                            break;
                        }
                    }
                }

                // Handle SIGUSR1 - bind the next key press (from `keyreplay bind`)
                _ = sigusr1.recv() => {
                    tracing::debug!("Received SIGUSR1 (binding request)");
                    if let Some(role) = take_bind_request() {
                        if engine.request_binding(role) {
                            tracing::info!("Press a key to bind as the {} hotkey", role);
                        }
                    }
                }

                // Handle SIGUSR2 - toggle enabled (from `keyreplay toggle`)
                _ = sigusr2.recv() => {
                    let enabled = !engine.is_enabled();
                    engine.set_enabled(enabled);
                    tracing::info!("Hotkeys {}", if enabled { "enabled" } else { "disabled" });
                }

                // Handle graceful shutdown (SIGINT from Ctrl+C)
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    break;
                }

                // Handle graceful shutdown (SIGTERM from systemctl stop)
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    break;
                }
            }

            if run_tick {
                let tick_input = frame.take_tick(true);
                engine.update(&tick_input, &mut pending);
                Self::flush(&output_chain, &mut pending).await;

                let mode = engine.mode();
                if mode != last_mode {
                    self.on_mode_change(last_mode, mode, &engine);
                    last_mode = mode;
                }
            }
        }

        // Don't leave keys held down or a recording unsaved
        engine.halt(&mut pending);
        Self::flush(&output_chain, &mut pending).await;
        if last_mode.is_recording() {
            self.save_recording(&engine);
        }

        // Cleanup
        listener.stop().await?;

        // Remove state file on shutdown
        if let Some(ref path) = self.state_file_path {
            cleanup_file(path);
        }

        // Remove PID file on shutdown
        if let Some(ref path) = self.pid_file_path {
            cleanup_file(path);
        }

        let _ = pidlock.release();

        tracing::info!("Daemon stopped");

        Ok(())
    }
}
