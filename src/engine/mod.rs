//! Execution engine for shellform
//!
//! The engine orchestrates:
//! 1. Displaying - Render the plan against the prior state
//! 2. Confirming - Ask before anything runs
//! 3. Executing - Hand the plan to the reconciler

pub mod differ;
pub mod executor;

pub use executor::{ExecuteOptions, Outcome, TerminalConfirm, destroy, execute};
