//! Error types for shellkit

use thiserror::Error;

/// Errors raised while establishing or closing a shell
#[derive(Debug, Error)]
pub enum Error {
    /// Connection parameters are incomplete
    #[error("missing {0} for the ssh connection")]
    MissingParameter(&'static str),

    /// A declared parameter can not be honoured
    #[error("{parameter} is not supported for ssh connections: {reason}")]
    UnsupportedParameter {
        parameter: &'static str,
        reason: &'static str,
    },

    /// A helper process could not be started
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote host could not be reached
    #[error("unable to connect to {destination}: {message}")]
    Unreachable {
        destination: String,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for shellkit operations
pub type Result<T> = std::result::Result<T, Error>;
