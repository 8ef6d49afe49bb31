//! Log-only key output
//!
//! Useful for checking what a recording would do without touching the
//! system's input.

use super::KeyOutput;
use crate::error::OutputError;
use crate::key::KeyTransition;

/// Output that logs transitions instead of sending them
#[derive(Debug, Default)]
pub struct DryRunOutput;

impl DryRunOutput {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl KeyOutput for DryRunOutput {
    async fn emit(&self, transitions: &[KeyTransition]) -> Result<(), OutputError> {
        for t in transitions {
            tracing::info!("[dry-run] {:?} {}", t.kind, t.key);
        }
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "dry_run"
    }
}
