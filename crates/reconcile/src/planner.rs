//! Plan building - what an apply would do, without running anything

use crate::invalidation::{self, OutputDecision, OutputPlan, StaleReason};
use crate::matcher::Selection;
use crate::rules::Declaration;
use crate::types::{InstanceState, Snapshot, VarMap};

/// Action an apply will take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedAction {
    /// No instance yet
    Create,
    /// Nothing to run for the inputs
    NoOp,
    /// Run the update rule at index `rule`
    Update { rule: usize },
    /// Destroy the instance, then create it again
    Replace,
}

impl PlannedAction {
    fn from_selection(selection: &Selection<'_>) -> Self {
        match selection {
            Selection::NoOp => Self::NoOp,
            Selection::Rule { index, .. } => Self::Update { rule: *index },
            Selection::NoMatch => Self::Replace,
        }
    }
}

/// Predicted outcome of applying a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub action: PlannedAction,
    /// Inputs that differ from the prior state
    pub changed: Vec<String>,
    /// Proposed inputs and predicted outputs (unknown where stale)
    pub proposed: Snapshot,
    /// Per-output decisions in read rule order
    pub outputs: Vec<OutputPlan>,
}

impl Plan {
    pub fn requires_replace(&self) -> bool {
        self.action == PlannedAction::Replace
    }

    /// Names of outputs the apply has to fetch again
    pub fn stale_outputs(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .filter(|o| o.decision.is_stale())
            .map(|o| o.name.as_str())
    }

    /// Whether applying the plan would run any command at all
    pub fn has_changes(&self) -> bool {
        self.action != PlannedAction::NoOp || self.stale_outputs().next().is_some()
    }
}

/// Build the plan for moving `prior` to `inputs`
pub fn plan(declaration: &Declaration, prior: Option<&InstanceState>, inputs: &VarMap) -> Plan {
    let reads = declaration.rules.reads();

    let Some(prior) = prior else {
        let outputs: Vec<_> = reads
            .iter()
            .map(|read| OutputPlan {
                name: read.name.clone(),
                decision: OutputDecision::Unknown(StaleReason::NoPriorValue),
            })
            .collect();
        return Plan {
            action: PlannedAction::Create,
            changed: inputs.keys().cloned().collect(),
            proposed: Snapshot::new(inputs.clone(), invalidation::to_values(&outputs)),
            outputs,
        };
    };

    let resolution = declaration.rules.resolve(prior.inputs(), inputs);
    let outputs =
        invalidation::plan_outputs(&resolution.selection, reads, prior.outputs(), &prior.reads);
    let action = PlannedAction::from_selection(&resolution.selection);

    log::debug!(
        "planned {:?} for {}, {} output(s) stale",
        action,
        prior.id,
        outputs.iter().filter(|o| o.decision.is_stale()).count()
    );

    Plan {
        action,
        changed: resolution.changed.into_vec(),
        proposed: Snapshot::new(inputs.clone(), invalidation::to_values(&outputs)),
        outputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;
    use crate::types::{NameSet, ReadRule, UpdateRule, Value};

    fn vars(pairs: &[(&str, &str)]) -> VarMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::known(*v)))
            .collect()
    }

    fn declaration() -> Declaration {
        let rules = RuleSet::new(
            vec![
                UpdateRule::new(NameSet::of(["b"]), NameSet::of(["size"]), "resize"),
                UpdateRule::new(NameSet::of(["c"]), NameSet::Empty, "touch"),
            ],
            vec![ReadRule::new("size", "stat size"), ReadRule::new("path", "echo path")],
        )
        .unwrap();
        Declaration::new(Some("create".into()), Some("destroy".into()), rules)
    }

    fn state(inputs: VarMap) -> InstanceState {
        let decl = declaration();
        InstanceState {
            id: "id".into(),
            snapshot: Snapshot::new(inputs, vars(&[("size", "10"), ("path", "/p")])),
            reads: decl.rules.reads().to_vec(),
        }
    }

    #[test]
    fn test_plan_create() {
        let plan = plan(&declaration(), None, &vars(&[("a", "1")]));
        assert_eq!(plan.action, PlannedAction::Create);
        assert_eq!(plan.changed, ["a"]);
        assert!(plan.proposed.outputs.values().all(Value::is_unknown));
        assert!(plan.has_changes());
    }

    #[test]
    fn test_plan_noop() {
        let inputs = vars(&[("a", "1"), ("b", "2")]);
        let plan = plan(&declaration(), Some(&state(inputs.clone())), &inputs);

        assert_eq!(plan.action, PlannedAction::NoOp);
        assert!(plan.changed.is_empty());
        assert!(!plan.has_changes());
        assert_eq!(plan.proposed.outputs["size"], Value::known("10"));
    }

    #[test]
    fn test_plan_update_invalidates_named_output() {
        let prior = state(vars(&[("a", "1"), ("b", "2")]));
        let plan = plan(&declaration(), Some(&prior), &vars(&[("a", "1"), ("b", "3")]));

        assert_eq!(plan.action, PlannedAction::Update { rule: 0 });
        assert_eq!(plan.stale_outputs().collect::<Vec<_>>(), ["size"]);
        assert_eq!(plan.proposed.outputs["path"], Value::known("/p"));
        assert!(!plan.requires_replace());
    }

    #[test]
    fn test_plan_replace() {
        let prior = state(vars(&[("a", "1"), ("b", "2")]));
        let plan = plan(&declaration(), Some(&prior), &vars(&[("a", "9"), ("b", "2")]));

        assert!(plan.requires_replace());
        assert_eq!(plan.changed, ["a"]);
        assert_eq!(plan.stale_outputs().count(), 2);
    }

    #[test]
    fn test_plan_noop_with_changed_read_command() {
        let inputs = vars(&[("c", "1")]);
        let mut prior = state(inputs.clone());
        prior.reads[1].cmd = "pwd".into();

        let plan = plan(&declaration(), Some(&prior), &inputs);
        assert_eq!(plan.action, PlannedAction::NoOp);
        assert_eq!(plan.stale_outputs().collect::<Vec<_>>(), ["path"]);
        assert!(plan.has_changes());
    }
}
