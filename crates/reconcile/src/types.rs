//! Core types for rule-driven reconciliation

use crate::error::ExecFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value of a single variable
///
/// Serialized as a plain string, with `null` standing for [`Value::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Value {
    /// Value is known now
    Known(String),
    /// Value will only be known after apply
    Unknown,
}

impl Value {
    /// Create a known value
    pub fn known(value: impl Into<String>) -> Self {
        Self::Known(value.into())
    }

    /// Check if the value is not known yet
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Get the known value, if any
    pub fn as_known(&self) -> Option<&str> {
        match self {
            Self::Known(value) => Some(value),
            Self::Unknown => None,
        }
    }

    /// Check whether two values are guaranteed to be equal.
    ///
    /// An unknown value is never the same as anything, another unknown included.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Known(a), Self::Known(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Unknown, Self::Known)
    }
}

impl From<Value> for Option<String> {
    fn from(value: Value) -> Self {
        match value {
            Value::Known(value) => Some(value),
            Value::Unknown => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::known(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(value) => write!(f, "{:?}", value),
            Self::Unknown => write!(f, "(known after apply)"),
        }
    }
}

/// Name to value mapping for one scope
pub type VarMap = BTreeMap<String, Value>;

/// Which side of a resource a variable lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Declared by the user
    Input,
    /// Produced by a read rule
    Output,
}

/// Borrowed view of one variable in a [`Snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable<'a> {
    pub name: &'a str,
    pub value: &'a Value,
    pub scope: Scope,
}

/// Input and output variables of a resource at one point in time
///
/// Inputs and outputs are kept apart so the same name may appear in both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub inputs: VarMap,
    #[serde(default)]
    pub outputs: VarMap,
}

impl Snapshot {
    /// Create a snapshot from its two scopes
    pub fn new(inputs: VarMap, outputs: VarMap) -> Self {
        Self { inputs, outputs }
    }

    /// Variables of one scope
    pub fn scope(&self, scope: Scope) -> &VarMap {
        match scope {
            Scope::Input => &self.inputs,
            Scope::Output => &self.outputs,
        }
    }

    /// Look up a variable
    pub fn get(&self, scope: Scope, name: &str) -> Option<Variable<'_>> {
        self.scope(scope)
            .get_key_value(name)
            .map(|(name, value)| Variable { name, value, scope })
    }

    /// All variables, inputs first, each scope in name order
    pub fn variables(&self) -> impl Iterator<Item = Variable<'_>> {
        let inputs = self.inputs.iter().map(|(name, value)| Variable {
            name,
            value,
            scope: Scope::Input,
        });
        let outputs = self.outputs.iter().map(|(name, value)| Variable {
            name,
            value,
            scope: Scope::Output,
        });
        inputs.chain(outputs)
    }

    /// Check if any variable is still unknown
    pub fn has_unknowns(&self) -> bool {
        self.variables().any(|v| v.value.is_unknown())
    }
}

/// Deduplicated, lexicographically sorted list of variable names
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SortedNames(Vec<String>);

impl SortedNames {
    /// Sort and deduplicate the given names
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self(names)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.binary_search_by(|n| n.as_str().cmp(name)).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for SortedNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for SortedNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Tri-state set of names
///
/// `Unset` and `Empty` carry different meanings wherever a `NameSet` is used
/// (a fallback trigger versus a concrete one, "invalidate everything" versus
/// "invalidate nothing"), so they are never collapsed into each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Option<Vec<String>>")]
pub enum NameSet {
    /// Not declared at all
    #[default]
    Unset,
    /// Declared, with no names
    Empty,
    /// Declared, with at least one name
    Some(SortedNames),
}

impl NameSet {
    /// Build a declared set; no names gives [`NameSet::Empty`]
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = SortedNames::new(names);
        if names.is_empty() {
            Self::Empty
        } else {
            Self::Some(names)
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Declared names, or `None` when unset
    pub fn declared(&self) -> Option<&[String]> {
        match self {
            Self::Unset => None,
            Self::Empty => Some(&[]),
            Self::Some(names) => Some(names.as_slice()),
        }
    }

    /// Check if a declared set contains `name`; an unset set contains nothing
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::Some(names) => names.contains(name),
            Self::Unset | Self::Empty => false,
        }
    }
}

impl From<Option<Vec<String>>> for NameSet {
    fn from(names: Option<Vec<String>>) -> Self {
        names.map_or(Self::Unset, Self::of)
    }
}

impl From<NameSet> for Option<Vec<String>> {
    fn from(set: NameSet) -> Self {
        match set {
            NameSet::Unset => None,
            NameSet::Empty => Some(Vec::new()),
            NameSet::Some(names) => Some(names.into_vec()),
        }
    }
}

/// Conditional update command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRule {
    /// Input names whose change makes this rule eligible; unset = fallback
    #[serde(default, skip_serializing_if = "NameSet::is_unset")]
    pub triggers: NameSet,
    /// Outputs made stale by the command; unset = all of them
    #[serde(default, skip_serializing_if = "NameSet::is_unset")]
    pub invalidates: NameSet,
    pub cmd: String,
}

impl UpdateRule {
    pub fn new(triggers: NameSet, invalidates: NameSet, cmd: impl Into<String>) -> Self {
        Self {
            triggers,
            invalidates,
            cmd: cmd.into(),
        }
    }

    /// Rule with no trigger set, used when no specific rule covers a change
    pub fn is_fallback(&self) -> bool {
        self.triggers.is_unset()
    }
}

/// Command producing the value of one output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadRule {
    pub name: String,
    pub cmd: String,
}

impl ReadRule {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
        }
    }
}

/// What the host records for an instance after a successful apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceState {
    /// Opaque identifier, assigned once at creation
    pub id: String,
    #[serde(flatten)]
    pub snapshot: Snapshot,
    /// Read rules in force when the outputs were last fetched
    #[serde(default)]
    pub reads: Vec<ReadRule>,
}

impl InstanceState {
    pub fn inputs(&self) -> &VarMap {
        &self.snapshot.inputs
    }

    pub fn outputs(&self) -> &VarMap {
        &self.snapshot.outputs
    }

    /// Fetch command recorded for an output
    pub fn recorded_read(&self, name: &str) -> Option<&str> {
        self.reads
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.cmd.as_str())
    }
}

/// Everything a command produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Stdout and stderr interleaved in arrival order
    pub combined: String,
    /// Why the command failed, `None` on success
    pub failure: Option<ExecFailure>,
}

impl CommandOutput {
    /// Successful output that only wrote to stdout
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        let stdout = stdout.into();
        Self {
            combined: stdout.clone(),
            stdout,
            ..Default::default()
        }
    }

    /// Output of a command that could not run or failed
    pub fn failed(failure: ExecFailure, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        Self {
            combined: stderr.clone(),
            stderr,
            failure: Some(failure),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}
