//! Update rule selection
//!
//! A change is handled by the rule with the tightest trigger set covering every
//! changed input. Fallback rules (no triggers) only apply when no concrete rule
//! covers the change, and when nothing applies the instance has to be replaced.

use crate::setcmp;
use crate::types::{NameSet, SortedNames, UpdateRule, VarMap};

/// Outcome of rule selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'r> {
    /// Nothing changed
    NoOp,
    /// `rule` (at position `index`) handles the change
    Rule { index: usize, rule: &'r UpdateRule },
    /// No rule covers the change
    NoMatch,
}

impl<'r> Selection<'r> {
    /// Selected rule, if any
    pub fn rule(&self) -> Option<&'r UpdateRule> {
        match self {
            Self::Rule { rule, .. } => Some(rule),
            Self::NoOp | Self::NoMatch => None,
        }
    }

    /// Whether the instance must be destroyed and created again
    pub fn requires_replace(&self) -> bool {
        matches!(self, Self::NoMatch)
    }
}

/// Input names whose values differ between two snapshots
///
/// A name differs when only one side has it, or when the values are not the
/// same; unknown values always differ.
pub fn differing_names(prior: &VarMap, proposed: &VarMap) -> SortedNames {
    let before: Vec<&str> = prior.keys().map(String::as_str).collect();
    let after: Vec<&str> = proposed.keys().map(String::as_str).collect();
    let split = setcmp::partition(&before, &after);

    let changed_in_place = split
        .common
        .iter()
        .copied()
        .filter(|name| !prior[*name].same_as(&proposed[*name]));

    split
        .left
        .iter()
        .chain(split.right.iter())
        .copied()
        .chain(changed_in_place)
        .collect()
}

/// Pick the rule handling `changed`
///
/// Rules are expected to have passed the ambiguity check; ties between
/// equally tight rules go to the earliest declared.
pub(crate) fn select<'r>(changed: &SortedNames, rules: &'r [UpdateRule]) -> Selection<'r> {
    if changed.is_empty() {
        return Selection::NoOp;
    }

    let mut best: Option<(usize, usize)> = None;
    let mut fallback: Option<usize> = None;

    for (index, rule) in rules.iter().enumerate() {
        let triggers = match &rule.triggers {
            NameSet::Unset => {
                fallback.get_or_insert(index);
                continue;
            }
            set => set.declared().unwrap_or_default(),
        };

        if triggers.len() < changed.len() {
            continue;
        }
        if best.is_some_and(|(_, size)| size <= triggers.len()) {
            continue;
        }
        if setcmp::is_subset(changed.as_slice(), triggers) {
            best = Some((index, triggers.len()));
        }
    }

    match best.map(|(index, _)| index).or(fallback) {
        Some(index) => Selection::Rule {
            index,
            rule: &rules[index],
        },
        None => Selection::NoMatch,
    }
}
