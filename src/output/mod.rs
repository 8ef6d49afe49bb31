//! Key output module
//!
//! The recording engine emits key transitions through the synchronous
//! [`KeySynthesizer`] primitive. The daemon buffers one tick's transitions
//! in a `Vec<KeyTransition>` and hands the batch to an output backend:
//!
//! 1. ydotool - uinput-based, works on X11/Wayland/TTY, requires daemon
//! 2. dry_run - logs the transitions instead of sending them

pub mod dry_run;
pub mod ydotool;

use crate::config::{OutputConfig, OutputMode};
use crate::error::OutputError;
use crate::key::{KeyIdentity, KeyTransition, TransitionKind};

/// Primitive that presses or releases a single key
///
/// Assumed to always succeed from the engine's point of view.
pub trait KeySynthesizer {
    fn synthesize(&mut self, key: KeyIdentity, kind: TransitionKind);
}

/// Buffer transitions for later delivery
impl KeySynthesizer for Vec<KeyTransition> {
    fn synthesize(&mut self, key: KeyIdentity, kind: TransitionKind) {
        self.push(KeyTransition { key, kind });
    }
}

/// Trait for key output implementations
#[async_trait::async_trait]
pub trait KeyOutput: Send + Sync {
    /// Send a batch of key transitions, in order
    async fn emit(&self, transitions: &[KeyTransition]) -> Result<(), OutputError>;

    /// Check if this output method is available
    async fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function that returns a fallback chain of output methods
pub fn create_output_chain(config: &OutputConfig) -> Vec<Box<dyn KeyOutput>> {
    let mut chain: Vec<Box<dyn KeyOutput>> = Vec::new();

    match config.mode {
        OutputMode::Ydotool => {
            chain.push(Box::new(ydotool::YdotoolOutput::new(config.key_delay_ms)));
        }
        OutputMode::DryRun => {
            chain.push(Box::new(dry_run::DryRunOutput::new()));
        }
    }

    chain
}

/// Try each output method in the chain until one succeeds
pub async fn emit_with_fallback(
    chain: &[Box<dyn KeyOutput>],
    transitions: &[KeyTransition],
) -> Result<(), OutputError> {
    if transitions.is_empty() {
        return Ok(());
    }

    for output in chain {
        if !output.is_available().await {
            tracing::debug!("{} not available, trying next", output.name());
            continue;
        }

        match output.emit(transitions).await {
            Ok(()) => {
                tracing::trace!("{} transition(s) via {}", transitions.len(), output.name());
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("{} failed: {}, trying next", output.name(), e);
            }
        }
    }

    Err(OutputError::AllMethodsFailed)
}
