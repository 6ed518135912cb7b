//! Collaborator traits
//!
//! The engine never spawns anything itself. Commands go through a
//! [`CommandExecutor`] and identifiers come from an [`IdGenerator`], so the
//! crate can be driven by a local shell, a remote session, or a test double.

use crate::bindings::Bindings;
use crate::types::CommandOutput;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use std::sync::Arc;

/// Runs one command text with a set of environment bindings
///
/// Failures are reported through [`CommandOutput::failure`] together with
/// whatever the command printed, rather than as a separate error.
pub trait CommandExecutor {
    fn execute(&self, command: &str, bindings: &Bindings) -> CommandOutput;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn execute(&self, command: &str, bindings: &Bindings) -> CommandOutput {
        (**self).execute(command, bindings)
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for Box<E> {
    fn execute(&self, command: &str, bindings: &Bindings) -> CommandOutput {
        (**self).execute(command, bindings)
    }
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for Arc<E> {
    fn execute(&self, command: &str, bindings: &Bindings) -> CommandOutput {
        (**self).execute(command, bindings)
    }
}

/// Source of fresh instance identifiers
pub trait IdGenerator {
    fn generate(&self) -> String;
}

/// 12 random bytes, base64 encoded
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomId;

impl RandomId {
    const LEN: usize = 12;
}

impl IdGenerator for RandomId {
    fn generate(&self) -> String {
        let mut bytes = [0u8; Self::LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }
}
