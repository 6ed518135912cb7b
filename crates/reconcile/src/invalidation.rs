//! Prediction of which outputs an apply will recompute
//!
//! The decisions made here are what the update phase later acts on: every
//! output predicted unknown is fetched again, every retained one is not.

use crate::matcher::Selection;
use crate::types::{NameSet, ReadRule, Value, VarMap};
use std::fmt;

/// Why an output has to be fetched again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The instance is replaced as a whole
    Replacement,
    /// The selected update rule invalidates it
    InvalidatedByRule,
    /// Its fetch command differs from the one recorded at the last apply
    FetchCommandChanged,
    /// There is no usable prior value
    NoPriorValue,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Replacement => "instance is replaced",
            Self::InvalidatedByRule => "invalidated by update rule",
            Self::FetchCommandChanged => "read command changed",
            Self::NoPriorValue => "no prior value",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDecision {
    /// Prior value carries over
    Retain(String),
    /// Value will only be known after apply
    Unknown(StaleReason),
}

impl OutputDecision {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Predicted value of the output
    pub fn value(&self) -> Value {
        match self {
            Self::Retain(value) => Value::known(value.as_str()),
            Self::Unknown(_) => Value::Unknown,
        }
    }
}

/// Decision for one declared output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub name: String,
    pub decision: OutputDecision,
}

/// Decide, for every read rule, whether its prior value survives the apply
///
/// `recorded` holds the read rules stored with the prior state. Outputs that
/// are only recorded and no longer declared do not appear in the result.
pub fn plan_outputs(
    selection: &Selection<'_>,
    reads: &[ReadRule],
    prior: &VarMap,
    recorded: &[ReadRule],
) -> Vec<OutputPlan> {
    reads
        .iter()
        .map(|read| OutputPlan {
            name: read.name.clone(),
            decision: decide(selection, read, prior, recorded),
        })
        .collect()
}

fn decide(
    selection: &Selection<'_>,
    read: &ReadRule,
    prior: &VarMap,
    recorded: &[ReadRule],
) -> OutputDecision {
    let invalidates = match selection {
        Selection::NoMatch => return OutputDecision::Unknown(StaleReason::Replacement),
        Selection::Rule { rule, .. } => Some(&rule.invalidates),
        Selection::NoOp => None,
    };

    match invalidates {
        Some(NameSet::Unset) => return OutputDecision::Unknown(StaleReason::InvalidatedByRule),
        Some(set) if set.contains(&read.name) => {
            return OutputDecision::Unknown(StaleReason::InvalidatedByRule);
        }
        _ => {}
    }

    let unchanged = recorded
        .iter()
        .any(|r| r.name == read.name && r.cmd == read.cmd);
    if !unchanged {
        return OutputDecision::Unknown(StaleReason::FetchCommandChanged);
    }

    match prior.get(&read.name).and_then(Value::as_known) {
        Some(value) => OutputDecision::Retain(value.to_string()),
        None => OutputDecision::Unknown(StaleReason::NoPriorValue),
    }
}

/// Predicted output snapshot
pub fn to_values(outputs: &[OutputPlan]) -> VarMap {
    outputs
        .iter()
        .map(|o| (o.name.clone(), o.decision.value()))
        .collect()
}
