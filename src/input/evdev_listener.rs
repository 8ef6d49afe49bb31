//! evdev-based input listener
//!
//! Uses the Linux evdev interface to capture key transitions at the kernel
//! level. This works on all Wayland compositors because it bypasses the
//! display server.
//!
//! The user must be in the 'input' group to access /dev/input/* devices.

use super::{InputEvent, InputListener};
use crate::error::InputError;
use crate::key::{KeyIdentity, KeyTransition};
use evdev::{BusType, Device, InputEventKind, Key};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// evdev-based input listener
pub struct EvdevListener {
    /// Paths to keyboard and pointer devices
    device_paths: Vec<PathBuf>,
    /// Signal to stop the listener task
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevListener {
    /// Create a listener over every keyboard (and left-button pointer) device
    pub fn new() -> Result<Self, InputError> {
        let device_paths = find_input_devices()?;

        if device_paths.is_empty() {
            return Err(InputError::NoKeyboard);
        }

        tracing::debug!(
            "Found {} input device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        Ok(Self {
            device_paths,
            stop_signal: None,
        })
    }
}

#[async_trait::async_trait]
impl InputListener for EvdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<InputEvent>, InputError> {
        let (tx, rx) = mpsc::channel(256);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let device_paths = self.device_paths.clone();

        // Spawn the listener task
        tokio::task::spawn_blocking(move || {
            evdev_listener_loop(device_paths, tx, stop_rx);
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), InputError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// Translate a raw evdev key event into an input event
///
/// `value` is 1 for press, 0 for release and 2 for auto-repeat (ignored).
fn translate(key: Key, value: i32) -> Option<InputEvent> {
    if key == Key::BTN_LEFT {
        return match value {
            1 => Some(InputEvent::MouseLeft { down: true }),
            0 => Some(InputEvent::MouseLeft { down: false }),
            _ => None,
        };
    }

    let identity = KeyIdentity::from_evdev_code(key.code())?;
    match value {
        1 => Some(InputEvent::Key(KeyTransition::press(identity))),
        0 => Some(InputEvent::Key(KeyTransition::release(identity))),
        _ => None,
    }
}

/// Main listener loop running in a blocking task
fn evdev_listener_loop(
    device_paths: Vec<PathBuf>,
    tx: mpsc::Sender<InputEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // Open all devices in non-blocking mode
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                // Set device to non-blocking mode so fetch_events doesn't block
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No input devices could be opened");
        return;
    }

    tracing::info!("Capturing keyboard input from {} device(s)", devices.len());

    loop {
        // Check for stop signal (non-blocking)
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Input listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        // Poll each device (all set to non-blocking mode)
        for device in &mut devices {
            // fetch_events returns immediately if no events (non-blocking)
            if let Ok(events) = device.fetch_events() {
                for event in events {
                    if let InputEventKind::Key(key) = event.kind() {
                        let Some(input) = translate(key, event.value()) else {
                            continue;
                        };
                        tracing::trace!("Input: {:?}", input);
                        if tx.blocking_send(input).is_err() {
                            return; // Channel closed
                        }
                    }
                }
            }
        }

        // Small sleep to avoid busy-waiting
        std::thread::sleep(std::time::Duration::from_millis(2));
    }
}

/// Whether a device is a uinput injector rather than real hardware
///
/// ydotoold (and other key injectors) register a virtual keyboard. Reading
/// from it would feed every synthesized key back in as input.
fn is_virtual_device(name: &str, bus_type: BusType) -> bool {
    bus_type == BusType::BUS_VIRTUAL || name.to_lowercase().contains("ydotool")
}

/// Find all keyboard devices, plus pointers with a left button
fn find_input_devices() -> Result<Vec<PathBuf>, InputError> {
    let mut found = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| InputError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| InputError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        // Only look at event* devices
        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                let name = device.name().unwrap_or("unknown");
                if is_virtual_device(name, device.input_id().bus_type()) {
                    tracing::debug!("Skipping virtual device: {:?} ({:?})", path, name);
                    continue;
                }

                let (is_keyboard, has_left_button) = device
                    .supported_keys()
                    .map(|keys| {
                        // A keyboard should have at least some letter keys
                        (
                            keys.contains(Key::KEY_A)
                                && keys.contains(Key::KEY_Z)
                                && keys.contains(Key::KEY_ENTER),
                            keys.contains(Key::BTN_LEFT),
                        )
                    })
                    .unwrap_or((false, false));

                if is_keyboard || has_left_button {
                    tracing::debug!(
                        "Found {}: {:?} ({:?})",
                        if is_keyboard { "keyboard" } else { "pointer" },
                        path,
                        name
                    );
                    found.push(path);
                }
            }
            Err(e) => {
                // Permission denied is common for non-input-group users
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(InputError::DeviceAccess(path.display().to_string()));
                }
                // Other errors (device busy, etc.) - just skip
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(found)
}
