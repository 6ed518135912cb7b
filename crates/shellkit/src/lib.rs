//! # Shellkit
//!
//! Shells that run declared commands with environment bindings.
//!
//! - [`LocalShell`]: `sh -c` on this machine
//! - [`SshShell`]: `sh -s` on a remote host, multiplexed over one ssh
//!   control master
//! - [`SessionRegistry`]: opens each distinct connection once and closes
//!   every session on shutdown
//!
//! Every shell implements [`reconcile::CommandExecutor`], so it can be handed
//! straight to a [`reconcile::Reconciler`].

pub mod capture;
pub mod connection;
pub mod error;
pub mod local;
pub mod registry;
pub mod ssh;

pub use connection::{Connection, Identity, Protocol, SshParams, SshTarget};
pub use error::{Error, Result};
pub use local::LocalShell;
pub use registry::SessionRegistry;
pub use ssh::SshShell;

use reconcile::CommandExecutor;

/// A command executor that can be shared between threads and closed
pub trait Shell: CommandExecutor + Send + Sync {
    /// Human readable description of where commands run
    fn describe(&self) -> String;

    /// Release whatever the shell holds open; safe to call more than once
    fn close(&self) {}
}
