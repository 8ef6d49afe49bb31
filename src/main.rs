//! keyreplay - Frame-accurate keyboard macro recorder for Linux
//!
//! Run with `keyreplay` or `keyreplay daemon` to start the daemon.
//! Use `keyreplay setup` to write the default config.
//! Use `keyreplay bind <role>` to rebind a hotkey in the running daemon.

use clap::Parser;
use keyreplay::cli::{Cli, Commands};
use keyreplay::config::{self, Config};
use keyreplay::{codec, daemon};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("keyreplay={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(key) = cli.record_key {
        config.hotkeys.record = key;
    }
    if let Some(key) = cli.playback_key {
        config.hotkeys.playback = key;
    }
    if let Some(key) = cli.stop_key {
        config.hotkeys.stop = Some(key);
    }
    if let Some(speed) = cli.speed {
        config.playback.speed = speed.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if cli.looping {
        config.playback.looping = true;
    }
    if cli.dry_run {
        config.output.mode = config::OutputMode::DryRun;
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut daemon = daemon::Daemon::new(config);
            daemon.run().await?;
        }

        Commands::Bind { role } => {
            send_bind_request(&role)?;
        }

        Commands::Toggle => {
            signal_daemon(nix::sys::signal::Signal::SIGUSR2)?;
            println!("Toggled hotkey handling");
        }

        Commands::Show { file } => {
            show_recording(&file)?;
        }

        Commands::Setup => {
            run_setup()?;
        }

        Commands::Config => {
            show_config(&config)?;
        }

        Commands::Status { follow, format } => {
            run_status(&config, follow, &format)?;
        }
    }

    Ok(())
}

/// Read the running daemon's PID
fn daemon_pid() -> anyhow::Result<i32> {
    let pid_path = daemon::pid_file_path();
    let contents = std::fs::read_to_string(&pid_path).map_err(|_| {
        anyhow::anyhow!(
            "keyreplay daemon is not running (no PID file at {:?})",
            pid_path
        )
    })?;
    contents
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid PID file {:?}: {}", pid_path, e))
}

/// Send a control signal to the running daemon
fn signal_daemon(signal: nix::sys::signal::Signal) -> anyhow::Result<()> {
    let pid = daemon_pid()?;
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), signal)
        .map_err(|e| anyhow::anyhow!("Failed to signal daemon (pid {}): {}", pid, e))?;
    Ok(())
}

/// Ask the daemon to bind the next key press to a hotkey
fn send_bind_request(role: &str) -> anyhow::Result<()> {
    let role: keyreplay::BindingRole = role.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let request_path = daemon::bind_request_path();
    if let Some(parent) = request_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&request_path, role.as_str())?;

    if let Err(e) = signal_daemon(nix::sys::signal::Signal::SIGUSR1) {
        let _ = std::fs::remove_file(&request_path);
        return Err(e);
    }

    println!("Press a key to bind as the {} hotkey", role);
    Ok(())
}

/// Decode a recording file and print its contents
fn show_recording(path: &Path) -> anyhow::Result<()> {
    let decoded = codec::load(path)?;
    let recording = &decoded.recording;

    println!("Recording: {:?}\n", path);
    for event in recording {
        let kind = if event.transition.is_press() {
            "press"
        } else {
            "release"
        };
        println!(
            "  frame {:>6}  {:<7}  {}",
            event.frame, kind, event.transition.key
        );
    }

    println!("\n---");
    println!(
        "{} events over {} frames",
        recording.len(),
        recording.span()
    );
    if !decoded.skipped_lines.is_empty() {
        let lines: Vec<String> = decoded
            .skipped_lines
            .iter()
            .map(|n| n.to_string())
            .collect();
        println!(
            "{} malformed line(s) skipped: {}",
            decoded.skipped(),
            lines.join(", ")
        );
    }

    Ok(())
}

/// Run the setup command
fn run_setup() -> anyhow::Result<()> {
    println!("keyreplay Setup\n");
    println!("===============\n");

    // Ensure directories exist first
    println!("Creating directories...");
    Config::ensure_directories()?;
    println!(
        "  ✓ Config directory: {:?}",
        Config::config_dir().unwrap_or_default()
    );
    println!("  ✓ Data directory: {:?}", Config::data_dir());

    // Create default config file if it doesn't exist
    if let Some(config_path) = Config::default_path() {
        if !config_path.exists() {
            println!("\nCreating default config file...");
            std::fs::write(&config_path, config::DEFAULT_CONFIG)?;
            println!("  ✓ Created: {:?}", config_path);
        } else {
            println!("\n  Config file exists: {:?}", config_path);
        }
    }

    let mut all_ok = true;

    // Check input group
    println!("\nChecking input group membership...");
    let groups_output = std::process::Command::new("groups").output()?;
    let groups_str = String::from_utf8_lossy(&groups_output.stdout);
    if groups_str.split_whitespace().any(|g| g == "input") {
        println!("  ✓ User is in 'input' group");
    } else {
        println!("  ✗ User is NOT in 'input' group");
        println!("    Run: sudo usermod -aG input $USER");
        println!("    Then log out and back in");
        all_ok = false;
    }

    // Check ydotool
    println!("\nChecking ydotool...");
    if which::which("ydotool").is_ok() {
        println!("  ✓ ydotool found");
    } else {
        println!("  ✗ ydotool not found (playback won't send keys)");
        println!("    Install via your package manager, or run with --dry-run");
        all_ok = false;
    }

    // Summary
    println!("\n---");
    if all_ok {
        println!("✓ All checks passed! Run 'keyreplay' to start.");
    } else {
        println!("✗ Some checks failed. Please fix the issues above.");
    }

    Ok(())
}

/// Print the current state in the requested format
fn print_state(state: &str, format: &str) {
    if format == "json" {
        println!("{}", format_state_json(state));
    } else {
        println!("{}", state);
    }
}

fn read_state(path: &Path) -> String {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "stopped".to_string())
}

/// Run the status command - show current daemon state
fn run_status(config: &Config, follow: bool, format: &str) -> anyhow::Result<()> {
    let Some(state_path) = config.resolve_state_file() else {
        eprintln!("Error: state_file is not configured.");
        eprintln!();
        eprintln!("To enable status monitoring, add to your config.toml:");
        eprintln!();
        eprintln!("  state_file = \"auto\"");
        eprintln!();
        eprintln!("This enables external integrations like Waybar to monitor keyreplay state.");
        std::process::exit(1);
    };

    let state = read_state(&state_path);
    print_state(&state, format);

    if !follow {
        return Ok(());
    }

    // Follow mode: watch for changes
    use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
    use std::sync::mpsc::channel;
    use std::time::Duration;

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        NotifyConfig::default().with_poll_interval(Duration::from_millis(100)),
    )?;

    // Watch the state file's parent directory (file may not exist yet)
    if let Some(parent) = state_path.parent() {
        std::fs::create_dir_all(parent)?;
        watcher.watch(parent, RecursiveMode::NonRecursive)?;
    }

    let mut last_state = state;

    loop {
        match rx.recv_timeout(Duration::from_millis(500)) {
            Ok(Ok(_event)) => {
                let new_state = read_state(&state_path);
                if new_state != last_state {
                    print_state(&new_state, format);
                    last_state = new_state;
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Watch error: {:?}", e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                // Check if file was deleted (daemon stopped)
                if !state_path.exists() && last_state != "stopped" {
                    print_state("stopped", format);
                    last_state = "stopped".to_string();
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                break;
            }
        }
    }

    Ok(())
}

/// Format state as JSON for Waybar consumption
fn format_state_json(state: &str) -> String {
    let (text, class, tooltip) = match state {
        "recording" => ("O", "recording", "Recording keys..."),
        "playing" => (">", "playing", "Playing back..."),
        "binding" => ("?", "binding", "Press a key to bind"),
        "idle" => ("-", "idle", "keyreplay ready"),
        "stopped" => ("", "stopped", "keyreplay not running"),
        _ => ("?", "unknown", "Unknown state"),
    };

    serde_json::json!({
        "text": text,
        "class": class,
        "tooltip": tooltip,
    })
    .to_string()
}

/// Show current configuration
fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[hotkeys]");
    println!("  record = {:?}", config.hotkeys.record);
    println!("  playback = {:?}", config.hotkeys.playback);
    match config.hotkeys.stop {
        Some(ref stop) => println!("  stop = {:?}", stop),
        None => println!("  stop = (none)"),
    }
    match config.hotkeys.resolve() {
        Ok(hotkeys) => println!(
            "  (resolves to: record={}, playback={})",
            hotkeys.record, hotkeys.playback
        ),
        Err(e) => println!("  ✗ {}", e),
    }

    println!("\n[playback]");
    println!("  speed = {}", config.playback.speed);
    println!("  loop = {}", config.playback.looping);
    println!("  enabled = {}", config.playback.enabled);
    println!("  tick_rate_hz = {}", config.playback.tick_rate_hz);

    println!("\n[output]");
    println!("  mode = {:?}", config.output.mode);
    println!("  key_delay_ms = {}", config.output.key_delay_ms);

    println!("\n[files]");
    println!("  recording_file = {:?}", config.recording_file);
    if let Some(resolved) = config.resolve_recording_file() {
        println!("  (resolves to: {:?})", resolved);
    }
    println!("  state_file = {:?}", config.state_file);
    if let Some(resolved) = config.resolve_state_file() {
        println!("  (resolves to: {:?})", resolved);
    }

    println!("\n---");
    println!(
        "Config file: {:?}",
        Config::default_path().unwrap_or_else(|| PathBuf::from("(not found)"))
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_state_json() {
        let json: serde_json::Value = serde_json::from_str(&format_state_json("playing")).unwrap();
        assert_eq!(json["class"], "playing");
        assert_eq!(json["text"], ">");

        let json: serde_json::Value = serde_json::from_str(&format_state_json("bogus")).unwrap();
        assert_eq!(json["class"], "unknown");
    }

    #[test]
    fn test_read_state_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_state(&dir.path().join("state")), "stopped");

        std::fs::write(dir.path().join("state"), "recording\n").unwrap();
        assert_eq!(read_state(&dir.path().join("state")), "recording");
    }
}
