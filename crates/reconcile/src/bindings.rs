//! Environment bindings passed to commands

use crate::types::{Value, VarMap};

/// Prefix under which a group of variables is exposed to a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPrefix {
    /// Proposed inputs
    Input,
    /// Inputs of the last apply
    Previous,
    /// Outputs of the last apply
    State,
}

impl BindingPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "INPUT_",
            Self::Previous => "PREVIOUS_",
            Self::State => "STATE_",
        }
    }
}

/// Name-sorted list of `(key, value)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    pairs: Vec<(String, String)>,
}

impl Bindings {
    pub fn builder() -> BindingsBuilder {
        BindingsBuilder::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Look up a bound value by its full key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|i| self.pairs[i].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Collects variable groups before sorting them into [`Bindings`]
#[derive(Debug, Default)]
pub struct BindingsBuilder {
    pairs: Vec<(String, String)>,
}

impl BindingsBuilder {
    /// Bind every variable of `vars` under `prefix`
    pub fn with(mut self, prefix: BindingPrefix, vars: &VarMap) -> Self {
        for (name, value) in vars {
            let key = format!("{}{}", prefix.as_str(), name);
            let value = match value {
                Value::Known(value) => value.clone(),
                Value::Unknown => {
                    log::warn!("{} is not known yet, binding it as an empty string", key);
                    String::new()
                }
            };
            self.pairs.push((key, value));
        }
        self
    }

    pub fn build(mut self) -> Bindings {
        self.pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Bindings { pairs: self.pairs }
    }
}
