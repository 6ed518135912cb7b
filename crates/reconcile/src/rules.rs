//! Validated rule sets and resource declarations

use crate::ambiguity;
use crate::error::{AuthoringError, Error, Result};
use crate::matcher::{self, Selection};
use crate::types::{ReadRule, SortedNames, UpdateRule, VarMap};

/// Update and read rules of one resource
///
/// Only obtainable through [`RuleSet::new`], so every `RuleSet` in existence
/// has passed the authoring checks and selects rules deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    updates: Vec<UpdateRule>,
    reads: Vec<ReadRule>,
}

/// Changed inputs and the rule chosen to handle them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'r> {
    pub changed: SortedNames,
    pub selection: Selection<'r>,
}

impl RuleSet {
    /// Validate and build a rule set, reporting every authoring error at once
    pub fn new(updates: Vec<UpdateRule>, reads: Vec<ReadRule>) -> Result<Self> {
        let mut errors = ambiguity::check(&updates);

        for (index, rule) in updates.iter().enumerate() {
            for name in rule.invalidates.declared().unwrap_or_default() {
                if !reads.iter().any(|r| &r.name == name) {
                    errors.push(AuthoringError::UndeclaredInvalidation {
                        rule: index,
                        name: name.clone(),
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(Error::Authoring(errors));
        }

        log::debug!(
            "accepted {} update rule(s) and {} read rule(s)",
            updates.len(),
            reads.len()
        );
        Ok(Self { updates, reads })
    }

    pub fn updates(&self) -> &[UpdateRule] {
        &self.updates
    }

    pub fn reads(&self) -> &[ReadRule] {
        &self.reads
    }

    /// Read rule producing `name`
    pub fn read(&self, name: &str) -> Option<&ReadRule> {
        self.reads.iter().find(|r| r.name == name)
    }

    /// Names of every declared output, in declaration order
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.reads.iter().map(|r| r.name.as_str())
    }

    /// Work out which inputs changed and which rule handles them
    pub fn resolve(&self, prior: &VarMap, proposed: &VarMap) -> Resolution<'_> {
        let changed = matcher::differing_names(prior, proposed);
        let selection = matcher::select(&changed, &self.updates);
        log::debug!("changed inputs {} select {:?}", changed, selection);
        Resolution { changed, selection }
    }
}

/// Everything declared for one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub create: Option<String>,
    pub destroy: Option<String>,
    pub rules: RuleSet,
}

impl Declaration {
    pub fn new(create: Option<String>, destroy: Option<String>, rules: RuleSet) -> Self {
        Self {
            create,
            destroy,
            rules,
        }
    }
}
