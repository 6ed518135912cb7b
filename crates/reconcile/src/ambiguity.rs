//! Static check that rule selection is deterministic
//!
//! Two concrete trigger sets that overlap without one containing the other
//! leave their shared names as a conflict key: a change of exactly those names
//! fits both rules with nothing but declaration order to pick one. Such a key
//! is only accepted when some rule declares it as its exact trigger set.

use crate::error::AuthoringError;
use crate::setcmp;
use crate::types::UpdateRule;
use std::collections::{BTreeMap, BTreeSet};

/// Collect every authoring error in the update rules
///
/// Errors come out in a stable order: duplicates in declaration order,
/// then conflict keys in lexicographic order.
pub fn check(rules: &[UpdateRule]) -> Vec<AuthoringError> {
    let mut errors = Vec::new();

    let mut first_fallback: Option<usize> = None;
    let mut declared: BTreeMap<&[String], usize> = BTreeMap::new();
    let mut concrete: Vec<(usize, &[String])> = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        let Some(triggers) = rule.triggers.declared() else {
            match first_fallback {
                Some(first) => errors.push(AuthoringError::DuplicateFallback {
                    first,
                    duplicate: index,
                }),
                None => first_fallback = Some(index),
            }
            continue;
        };

        if let Some(&first) = declared.get(triggers) {
            errors.push(AuthoringError::DuplicateRule {
                triggers: triggers.to_vec(),
                first,
                duplicate: index,
            });
        } else {
            declared.insert(triggers, index);
        }
        concrete.push((index, triggers));
    }

    let mut conflicts: BTreeMap<Vec<&str>, (usize, usize)> = BTreeMap::new();
    for (n, &(first, left)) in concrete.iter().enumerate() {
        for &(second, right) in &concrete[n + 1..] {
            let split = setcmp::partition(left, right);
            if split.is_crossing() {
                conflicts.entry(split.common).or_insert((first, second));
            }
        }
    }

    let declared: BTreeSet<Vec<&str>> = declared
        .keys()
        .map(|names| names.iter().map(String::as_str).collect())
        .collect();

    for (conflict, (first, second)) in conflicts {
        if declared.contains(&conflict) {
            continue;
        }
        log::debug!(
            "rules #{} and #{} both cover a change of {:?}",
            first + 1,
            second + 1,
            conflict
        );
        errors.push(AuthoringError::AmbiguousRules {
            conflict: conflict.into_iter().map(String::from).collect(),
            first,
            second,
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NameSet;

    fn rule(triggers: &[&str]) -> UpdateRule {
        UpdateRule::new(NameSet::of(triggers.iter().copied()), NameSet::Unset, "cmd")
    }

    fn fallback() -> UpdateRule {
        UpdateRule::new(NameSet::Unset, NameSet::Unset, "cmd")
    }

    #[test]
    fn test_crossing_rules_are_ambiguous() {
        let errors = check(&[rule(&["a", "b"]), rule(&["b", "c"])]);
        assert_eq!(
            errors,
            vec![AuthoringError::AmbiguousRules {
                conflict: vec!["b".into()],
                first: 0,
                second: 1,
            }]
        );
    }

    #[test]
    fn test_declared_conflict_key_resolves_ambiguity() {
        let errors = check(&[rule(&["a", "b"]), rule(&["b", "c"]), rule(&["b"])]);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_nested_and_disjoint_rules_are_fine() {
        assert!(check(&[rule(&["a", "b", "c"]), rule(&["a", "b"]), rule(&["a"])]).is_empty());
        assert!(check(&[rule(&["a"]), rule(&["b"]), fallback()]).is_empty());
    }

    #[test]
    fn test_identical_triggers_are_duplicates() {
        let errors = check(&[rule(&["b", "a"]), rule(&["c"]), rule(&["a", "b", "a"])]);
        assert_eq!(
            errors,
            vec![AuthoringError::DuplicateRule {
                triggers: vec!["a".into(), "b".into()],
                first: 0,
                duplicate: 2,
            }]
        );
    }

    #[test]
    fn test_empty_trigger_sets_are_duplicates() {
        let empty = || UpdateRule::new(NameSet::Empty, NameSet::Unset, "cmd");
        let errors = check(&[empty(), empty()]);
        assert!(matches!(
            errors.as_slice(),
            [AuthoringError::DuplicateRule { first: 0, duplicate: 1, .. }]
        ));
    }

    #[test]
    fn test_second_fallback_is_rejected() {
        let errors = check(&[fallback(), rule(&["a"]), fallback(), fallback()]);
        assert_eq!(
            errors,
            vec![
                AuthoringError::DuplicateFallback {
                    first: 0,
                    duplicate: 2
                },
                AuthoringError::DuplicateFallback {
                    first: 0,
                    duplicate: 3
                },
            ]
        );
    }

    #[test]
    fn test_each_conflict_key_reported_once() {
        let errors = check(&[rule(&["a", "b"]), rule(&["b", "c"]), rule(&["b", "d"])]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            AuthoringError::AmbiguousRules { conflict, first: 0, second: 1 } if conflict == &["b"]
        ));
    }

    #[test]
    fn test_errors_are_ordered() {
        let errors = check(&[
            rule(&["x", "y"]),
            rule(&["y", "z"]),
            rule(&["a", "b"]),
            rule(&["b", "c"]),
            rule(&["x", "y"]),
        ]);
        let kinds: Vec<_> = errors
            .iter()
            .map(|e| match e {
                AuthoringError::DuplicateRule { .. } => "dup".to_string(),
                AuthoringError::AmbiguousRules { conflict, .. } => conflict.join(","),
                other => other.to_string(),
            })
            .collect();
        assert_eq!(kinds, ["dup", "b", "y"]);
    }
}
