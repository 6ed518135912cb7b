//! Error types for the reconcile crate

use thiserror::Error;

/// A rule declaration that can not be resolved deterministically
///
/// Rule indexes are zero-based positions in declaration order; messages show
/// them one-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthoringError {
    /// Two rules declare the same trigger set
    #[error(
        "update rule #{} duplicates the triggers [{}] of rule #{}",
        .duplicate + 1,
        .triggers.join(", "),
        .first + 1
    )]
    DuplicateRule {
        triggers: Vec<String>,
        first: usize,
        duplicate: usize,
    },

    /// More than one rule without triggers
    #[error(
        "update rule #{} is a second fallback rule (rule #{} already has no triggers)",
        .duplicate + 1,
        .first + 1
    )]
    DuplicateFallback { first: usize, duplicate: usize },

    /// A change of exactly `conflict` would fit two rules equally well
    #[error(
        "a change of [{}] is covered by both rule #{} and rule #{}; declare a rule triggered by exactly these names",
        .conflict.join(", "),
        .first + 1,
        .second + 1
    )]
    AmbiguousRules {
        conflict: Vec<String>,
        first: usize,
        second: usize,
    },

    /// Invalidation of an output that no read rule produces
    #[error("update rule #{} invalidates `{name}`, but no read rule declares it", .rule + 1)]
    UndeclaredInvalidation { rule: usize, name: String },
}

/// Why a command did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecFailure {
    /// Command ran and exited with a non-zero status
    #[error("exited with status {0}")]
    Exit(i32),

    /// Command was killed before it could exit
    #[error("terminated by signal")]
    Signal,

    /// Command could not be delivered or started
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors that can occur while planning or reconciling
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected rule declaration
    #[error("invalid update rules:\n{}", list(.0))]
    Authoring(Vec<AuthoringError>),

    /// Execution collaborator could not be established
    #[error("connection error: {0}")]
    Connection(String),

    /// A declared command failed
    #[error("unable to execute command: {command}\n{failure}\n{combined}")]
    Command {
        command: String,
        failure: ExecFailure,
        /// Everything the command printed before failing
        combined: String,
    },

    /// No update rule covers the changed inputs
    #[error(
        "changed inputs [{}] are not covered by any update rule; the instance must be replaced",
        .changed.join(", ")
    )]
    ReplaceRequired { changed: Vec<String> },

    /// A create plan was handed an instance that already exists
    #[error("instance {id} already exists; plan against its state instead of creating another")]
    InstanceExists { id: String },
}

impl Error {
    /// Authoring errors carried by this error, if any
    pub fn authoring(&self) -> &[AuthoringError] {
        match self {
            Self::Authoring(errors) => errors,
            _ => &[],
        }
    }
}

fn list(errors: &[AuthoringError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for reconcile operations
pub type Result<T> = std::result::Result<T, Error>;
