//! # Reconcile
//!
//! Rule resolution and plan-time inference for resources managed through
//! user-declared commands.
//!
//! A resource declares an optional create command, an optional destroy
//! command, conditional update rules, and read rules that fetch its outputs.
//! Given the recorded state of an instance and a proposed set of inputs, this
//! crate decides, without running anything, whether the change can be applied
//! in place, which update rule fires, and which outputs become stale.
//!
//! ## Core Concepts
//!
//! - **RuleSet**: update and read rules, checked for ambiguity on construction
//! - **Plan**: the predicted action and outputs of an apply
//! - **Reconciler**: runs the create/read/update/delete phases of a plan
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{Declaration, NameSet, RandomId, ReadRule, Reconciler, RuleSet, UpdateRule};
//!
//! let rules = RuleSet::new(
//!     vec![UpdateRule::new(NameSet::of(["size"]), NameSet::of(["used"]), "resize")],
//!     vec![ReadRule::new("used", "df --output=used")],
//! )?;
//! let declaration = Declaration::new(Some("mkfs".into()), None, rules);
//!
//! let reconciler = Reconciler::new(&declaration, shell);
//! let plan = reconciler.plan(prior.as_ref(), &inputs);
//! let state = reconciler.apply(prior.as_ref(), &plan, &RandomId)?;
//! ```
//!
//! ## Collaborator Traits
//!
//! - [`CommandExecutor`]: runs one command with its bindings
//! - [`IdGenerator`]: hands out instance identifiers
//!
//! The crate never spawns processes on its own.

pub mod ambiguity;
pub mod bindings;
pub mod context;
pub mod data;
pub mod driver;
pub mod error;
pub mod invalidation;
pub mod matcher;
pub mod planner;
pub mod rules;
pub mod setcmp;
pub mod types;

// Re-export main types at crate root
pub use bindings::{BindingPrefix, Bindings};
pub use context::{CommandExecutor, IdGenerator, RandomId};
pub use data::query;
pub use driver::Reconciler;
pub use error::{AuthoringError, Error, ExecFailure, Result};
pub use invalidation::{OutputDecision, OutputPlan, StaleReason};
pub use matcher::Selection;
pub use planner::{Plan, PlannedAction, plan};
pub use rules::{Declaration, Resolution, RuleSet};
pub use types::{
    CommandOutput, InstanceState, NameSet, ReadRule, Scope, Snapshot, SortedNames, UpdateRule,
    Value, VarMap, Variable,
};
