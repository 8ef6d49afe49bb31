//! ydotool-based key output
//!
//! Uses `ydotool key` to press and release keys by Linux keycode. This
//! works on all Wayland compositors because ydotool uses the uinput kernel
//! interface.
//!
//! Requires:
//! - ydotool installed
//! - ydotoold daemon running (systemctl --user start ydotool)
//! - User in 'input' group

use super::KeyOutput;
use crate::error::OutputError;
use crate::key::{KeyTransition, TransitionKind};
use std::process::Stdio;
use tokio::process::Command;

/// ydotool-based key output
pub struct YdotoolOutput {
    /// Delay between key events in milliseconds
    delay_ms: u32,
}

impl YdotoolOutput {
    /// Create a new ydotool output
    pub fn new(delay_ms: u32) -> Self {
        Self { delay_ms }
    }

    /// Build the `code:state` arguments for `ydotool key`
    ///
    /// Keys without a Linux keycode are dropped with a warning.
    fn key_args(transitions: &[KeyTransition]) -> Vec<String> {
        transitions
            .iter()
            .filter_map(|t| match t.key.to_evdev_code() {
                Some(code) => {
                    let state = match t.kind {
                        TransitionKind::Press => 1,
                        TransitionKind::Release => 0,
                    };
                    Some(format!("{}:{}", code, state))
                }
                None => {
                    tracing::warn!("{} has no Linux keycode, not sent", t.key);
                    None
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl KeyOutput for YdotoolOutput {
    async fn emit(&self, transitions: &[KeyTransition]) -> Result<(), OutputError> {
        let args = Self::key_args(transitions);
        if args.is_empty() {
            return Ok(());
        }

        let mut cmd = Command::new("ydotool");
        cmd.arg("key");
        cmd.arg("--key-delay").arg(self.delay_ms.to_string());
        cmd.args(&args);

        let output = cmd
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OutputError::YdotoolNotFound
                } else {
                    OutputError::InjectionFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            // Check for common errors
            if stderr.contains("socket") || stderr.contains("connect") || stderr.contains("daemon")
            {
                return Err(OutputError::YdotoolNotRunning);
            }

            return Err(OutputError::InjectionFailed(stderr.to_string()));
        }

        Ok(())
    }

    async fn is_available(&self) -> bool {
        which::which("ydotool").is_ok()
    }

    fn name(&self) -> &'static str {
        "ydotool"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyIdentity;

    #[test]
    fn test_new() {
        let output = YdotoolOutput::new(10);
        assert_eq!(output.delay_ms, 10);
    }

    #[test]
    fn test_key_args() {
        let a = KeyIdentity::plain(0x1E);
        let rctrl = KeyIdentity::extended(0x1D);
        let unmapped = KeyIdentity::extended(0x10);
        let args = YdotoolOutput::key_args(&[
            KeyTransition::press(rctrl),
            KeyTransition::press(a),
            KeyTransition::press(unmapped),
            KeyTransition::release(a),
            KeyTransition::release(rctrl),
        ]);
        assert_eq!(args, vec!["97:1", "30:1", "30:0", "97:0"]);
    }
}
