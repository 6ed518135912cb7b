//! Lifecycle phases of one resource instance
//!
//! Commands run strictly one after another. The first failure aborts the
//! phase; commands that already succeeded are not undone, so a later read has
//! to cope with a partially applied instance.

use crate::bindings::{BindingPrefix, Bindings};
use crate::context::{CommandExecutor, IdGenerator};
use crate::error::{Error, Result};
use crate::planner::{self, Plan, PlannedAction};
use crate::rules::Declaration;
use crate::types::{InstanceState, ReadRule, Snapshot, Value, VarMap};
use std::fmt::Display;

/// Drives one declaration through create, read, update and delete
pub struct Reconciler<'d, E> {
    declaration: &'d Declaration,
    executor: E,
}

impl<'d, E: CommandExecutor> Reconciler<'d, E> {
    pub fn new(declaration: &'d Declaration, executor: E) -> Self {
        Self {
            declaration,
            executor,
        }
    }

    /// Establish the executor lazily; failure aborts before any command runs
    pub fn connect<F, Err>(declaration: &'d Declaration, connect: F) -> Result<Self>
    where
        F: FnOnce() -> std::result::Result<E, Err>,
        Err: Display,
    {
        let executor = connect().map_err(|e| Error::Connection(e.to_string()))?;
        Ok(Self::new(declaration, executor))
    }

    pub fn declaration(&self) -> &Declaration {
        self.declaration
    }

    /// Predict what an apply of `inputs` would do
    pub fn plan(&self, prior: Option<&InstanceState>, inputs: &VarMap) -> Plan {
        planner::plan(self.declaration, prior, inputs)
    }

    /// Create a new instance and fetch all of its outputs
    pub fn create(&self, inputs: &VarMap, ids: &dyn IdGenerator) -> Result<InstanceState> {
        log::info!("creating instance");

        if let Some(cmd) = &self.declaration.create {
            let bindings = Bindings::builder()
                .with(BindingPrefix::Input, inputs)
                .build();
            run_command(&self.executor, cmd, &bindings)?;
        }

        let reads = self.declaration.rules.reads();
        let outputs = self.fetch(reads.iter(), inputs, &VarMap::new())?;

        let id = ids.generate();
        log::info!("created instance {}", id);
        Ok(InstanceState {
            id,
            snapshot: Snapshot::new(inputs.clone(), outputs),
            reads: reads.to_vec(),
        })
    }

    /// Fetch every recorded output again; inputs are left untouched
    pub fn read(&self, state: &InstanceState) -> Result<InstanceState> {
        log::info!("reading instance {}", state.id);

        let outputs = self.fetch(state.reads.iter(), state.inputs(), state.outputs())?;
        Ok(InstanceState {
            id: state.id.clone(),
            snapshot: Snapshot::new(state.inputs().clone(), outputs),
            reads: state.reads.clone(),
        })
    }

    /// Update `prior` in place to `inputs`
    ///
    /// Fails with [`Error::ReplaceRequired`] when no update rule covers the
    /// changed inputs.
    pub fn update(&self, prior: &InstanceState, inputs: &VarMap) -> Result<InstanceState> {
        let plan = self.plan(Some(prior), inputs);
        self.update_with(prior, &plan)
    }

    fn update_with(&self, prior: &InstanceState, plan: &Plan) -> Result<InstanceState> {
        let inputs = &plan.proposed.inputs;
        log::info!("updating instance {}", prior.id);

        match plan.action {
            PlannedAction::Update { rule } => {
                let rule = &self.declaration.rules.updates()[rule];
                let bindings = Bindings::builder()
                    .with(BindingPrefix::Input, inputs)
                    .with(BindingPrefix::Previous, prior.inputs())
                    .with(BindingPrefix::State, prior.outputs())
                    .build();
                run_command(&self.executor, &rule.cmd, &bindings)?;
            }
            PlannedAction::NoOp => log::debug!("no update rule to run"),
            PlannedAction::Create | PlannedAction::Replace => {
                return Err(Error::ReplaceRequired {
                    changed: plan.changed.clone(),
                });
            }
        }

        let stale = plan
            .stale_outputs()
            .filter_map(|name| self.declaration.rules.read(name));
        let mut outputs = self.fetch(stale, inputs, prior.outputs())?;
        for output in &plan.outputs {
            outputs
                .entry(output.name.clone())
                .or_insert_with(|| output.decision.value());
        }

        Ok(InstanceState {
            id: prior.id.clone(),
            snapshot: Snapshot::new(inputs.clone(), outputs),
            reads: self.declaration.rules.reads().to_vec(),
        })
    }

    /// Run the destroy command; the caller stops tracking the instance
    pub fn delete(&self, state: &InstanceState) -> Result<()> {
        log::info!("deleting instance {}", state.id);

        if let Some(cmd) = &self.declaration.destroy {
            let bindings = Bindings::builder()
                .with(BindingPrefix::Input, state.inputs())
                .with(BindingPrefix::State, state.outputs())
                .build();
            run_command(&self.executor, cmd, &bindings)?;
        }
        Ok(())
    }

    /// Carry out a plan built against `prior`
    pub fn apply(
        &self,
        prior: Option<&InstanceState>,
        plan: &Plan,
        ids: &dyn IdGenerator,
    ) -> Result<InstanceState> {
        match (plan.action, prior) {
            (PlannedAction::Create, Some(prior)) => Err(Error::InstanceExists {
                id: prior.id.clone(),
            }),
            (_, None) => self.create(&plan.proposed.inputs, ids),
            (PlannedAction::Replace, Some(prior)) => {
                self.delete(prior)?;
                self.create(&plan.proposed.inputs, ids)
            }
            (PlannedAction::NoOp | PlannedAction::Update { .. }, Some(prior)) => {
                self.update_with(prior, plan)
            }
        }
    }

    /// Run read rules with the bindings of one phase
    ///
    /// `STATE_` bindings are the outputs as they stood when the phase began.
    fn fetch<'r>(
        &self,
        reads: impl Iterator<Item = &'r ReadRule>,
        inputs: &VarMap,
        outputs: &VarMap,
    ) -> Result<VarMap> {
        let bindings = Bindings::builder()
            .with(BindingPrefix::Input, inputs)
            .with(BindingPrefix::State, outputs)
            .build();
        read_all(&self.executor, reads, &bindings)
    }
}

/// Run each read rule in order and collect its stdout verbatim
pub(crate) fn read_all<'r, E: CommandExecutor>(
    executor: &E,
    reads: impl Iterator<Item = &'r ReadRule>,
    bindings: &Bindings,
) -> Result<VarMap> {
    let mut outputs = VarMap::new();
    for read in reads {
        let stdout = run_command(executor, &read.cmd, bindings)?;
        outputs.insert(read.name.clone(), Value::Known(stdout));
    }
    Ok(outputs)
}

/// Run one command, turning a failure into [`Error::Command`]
pub(crate) fn run_command<E: CommandExecutor>(
    executor: &E,
    command: &str,
    bindings: &Bindings,
) -> Result<String> {
    log::debug!("running `{}` with {} binding(s)", command, bindings.len());
    let output = executor.execute(command, bindings);

    if let Some(failure) = output.failure {
        return Err(Error::Command {
            command: command.to_string(),
            failure,
            combined: output.combined,
        });
    }

    if !output.stdout.is_empty() {
        log::info!("{}", output.stdout.trim_end());
    }
    if !output.stderr.is_empty() {
        log::warn!("{}", output.stderr.trim_end());
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecFailure;
    use crate::rules::RuleSet;
    use crate::types::{CommandOutput, NameSet, UpdateRule};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// Records every command and answers from a script
    #[derive(Default)]
    struct RecordingExecutor {
        calls: RefCell<Vec<(String, Bindings)>>,
        replies: HashMap<String, CommandOutput>,
    }

    impl RecordingExecutor {
        fn reply(mut self, command: &str, output: CommandOutput) -> Self {
            self.replies.insert(command.to_string(), output);
            self
        }

        fn commands(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(c, _)| c.clone()).collect()
        }

        fn bindings_of(&self, command: &str) -> Bindings {
            self.calls
                .borrow()
                .iter()
                .find(|(c, _)| c == command)
                .map(|(_, b)| b.clone())
                .expect("command was run")
        }
    }

    impl CommandExecutor for RecordingExecutor {
        fn execute(&self, command: &str, bindings: &Bindings) -> CommandOutput {
            self.calls
                .borrow_mut()
                .push((command.to_string(), bindings.clone()));
            self.replies
                .get(command)
                .cloned()
                .unwrap_or_else(|| CommandOutput::from_stdout(format!("{command}-out")))
        }
    }

    struct SequentialIds(Cell<u32>);

    impl IdGenerator for SequentialIds {
        fn generate(&self) -> String {
            let next = self.0.get() + 1;
            self.0.set(next);
            format!("id-{next}")
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> VarMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::known(*v)))
            .collect()
    }

    fn declaration() -> Declaration {
        let rules = RuleSet::new(
            vec![
                UpdateRule::new(NameSet::of(["size"]), NameSet::of(["used"]), "resize"),
                UpdateRule::new(NameSet::of(["label"]), NameSet::Empty, "relabel"),
            ],
            vec![ReadRule::new("used", "read-used"), ReadRule::new("uuid", "read-uuid")],
        )
        .unwrap();
        Declaration::new(Some("mkfs".into()), Some("wipe".into()), rules)
    }

    fn created(decl: &Declaration) -> InstanceState {
        let executor = RecordingExecutor::default();
        Reconciler::new(decl, &executor)
            .create(&vars(&[("size", "1"), ("label", "a")]), &SequentialIds(Cell::new(0)))
            .unwrap()
    }

    #[test]
    fn test_create_runs_create_then_reads() {
        let decl = declaration();
        let executor = RecordingExecutor::default();
        let ids = SequentialIds(Cell::new(0));

        let state = Reconciler::new(&decl, &executor)
            .create(&vars(&[("size", "1")]), &ids)
            .unwrap();

        assert_eq!(executor.commands(), ["mkfs", "read-used", "read-uuid"]);
        assert_eq!(state.id, "id-1");
        assert_eq!(state.outputs()["uuid"], Value::known("read-uuid-out"));
        assert_eq!(state.reads, decl.rules.reads());
        assert_eq!(executor.bindings_of("mkfs").get("INPUT_size"), Some("1"));
    }

    #[test]
    fn test_update_reruns_only_invalidated_reads() {
        let decl = declaration();
        let prior = created(&decl);
        let executor =
            RecordingExecutor::default().reply("read-used", CommandOutput::from_stdout("42\n"));

        let state = Reconciler::new(&decl, &executor)
            .update(&prior, &vars(&[("size", "2"), ("label", "a")]))
            .unwrap();

        assert_eq!(executor.commands(), ["resize", "read-used"]);
        assert_eq!(state.id, prior.id);
        assert_eq!(state.outputs()["used"], Value::known("42\n"));
        assert_eq!(state.outputs()["uuid"], prior.outputs()["uuid"]);

        let bindings = executor.bindings_of("resize");
        assert_eq!(bindings.get("INPUT_size"), Some("2"));
        assert_eq!(bindings.get("PREVIOUS_size"), Some("1"));
        assert_eq!(bindings.get("STATE_used"), Some("read-used-out"));
    }

    #[test]
    fn test_update_with_empty_invalidation_reads_nothing() {
        let decl = declaration();
        let prior = created(&decl);
        let executor = RecordingExecutor::default();

        let state = Reconciler::new(&decl, &executor)
            .update(&prior, &vars(&[("size", "1"), ("label", "b")]))
            .unwrap();

        assert_eq!(executor.commands(), ["relabel"]);
        assert_eq!(state.outputs(), prior.outputs());
        assert_eq!(state.inputs()["label"], Value::known("b"));
    }

    #[test]
    fn test_uncovered_update_requires_replace() {
        let decl = declaration();
        let prior = created(&decl);
        let executor = RecordingExecutor::default();

        let err = Reconciler::new(&decl, &executor)
            .update(&prior, &vars(&[("size", "2"), ("label", "b")]))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::ReplaceRequired { ref changed } if changed == &["label", "size"]
        ));
        assert!(executor.commands().is_empty());
    }

    #[test]
    fn test_failure_aborts_phase() {
        let decl = declaration();
        let executor = RecordingExecutor::default().reply(
            "read-used",
            CommandOutput::failed(ExecFailure::Exit(2), "no such device"),
        );

        let err = Reconciler::new(&decl, &executor)
            .create(&vars(&[("size", "1")]), &SequentialIds(Cell::new(0)))
            .unwrap_err();

        assert_eq!(executor.commands(), ["mkfs", "read-used"]);
        match err {
            Error::Command {
                command,
                failure,
                combined,
            } => {
                assert_eq!(command, "read-used");
                assert_eq!(failure, ExecFailure::Exit(2));
                assert_eq!(combined, "no such device");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_uses_recorded_rules_and_keeps_inputs() {
        let decl = declaration();
        let mut prior = created(&decl);
        prior.reads.truncate(1);
        let executor = RecordingExecutor::default();

        let state = Reconciler::new(&decl, &executor).read(&prior).unwrap();
        assert_eq!(executor.commands(), ["read-used"]);
        assert_eq!(state.inputs(), prior.inputs());
        assert_eq!(
            executor.bindings_of("read-used").get("STATE_used"),
            Some("read-used-out")
        );
    }

    #[test]
    fn test_delete_runs_destroy() {
        let decl = declaration();
        let prior = created(&decl);
        let executor = RecordingExecutor::default();

        Reconciler::new(&decl, &executor).delete(&prior).unwrap();
        assert_eq!(executor.commands(), ["wipe"]);
        assert_eq!(executor.bindings_of("wipe").get("STATE_uuid"), Some("read-uuid-out"));
    }

    #[test]
    fn test_apply_replace_deletes_then_creates() {
        let decl = declaration();
        let prior = created(&decl);
        let executor = RecordingExecutor::default();
        let ids = SequentialIds(Cell::new(5));
        let reconciler = Reconciler::new(&decl, &executor);

        let plan = reconciler.plan(Some(&prior), &vars(&[("size", "2"), ("label", "b")]));
        let state = reconciler.apply(Some(&prior), &plan, &ids).unwrap();

        assert_eq!(executor.commands(), ["wipe", "mkfs", "read-used", "read-uuid"]);
        assert_eq!(state.id, "id-6");
    }

    #[test]
    fn test_apply_noop_runs_nothing() {
        let decl = declaration();
        let prior = created(&decl);
        let executor = RecordingExecutor::default();
        let reconciler = Reconciler::new(&decl, &executor);

        let plan = reconciler.plan(Some(&prior), prior.inputs());
        let state = reconciler
            .apply(Some(&prior), &plan, &SequentialIds(Cell::new(0)))
            .unwrap();

        assert!(executor.commands().is_empty());
        assert_eq!(state, prior);
    }

    #[test]
    fn test_apply_create_refuses_existing_instance() {
        let decl = declaration();
        let prior = created(&decl);
        let executor = RecordingExecutor::default();
        let reconciler = Reconciler::new(&decl, &executor);

        let plan = reconciler.plan(None, prior.inputs());
        let err = reconciler
            .apply(Some(&prior), &plan, &SequentialIds(Cell::new(0)))
            .unwrap_err();

        assert!(matches!(err, Error::InstanceExists { ref id } if id == &prior.id));
        assert!(executor.commands().is_empty());
    }

    #[test]
    fn test_apply_noop_rereads_changed_fetch_command() {
        let decl = declaration();
        let mut prior = created(&decl);
        prior.reads[1].cmd = "read-uuid-v1".into();
        let executor =
            RecordingExecutor::default().reply("read-uuid", CommandOutput::from_stdout("fresh"));
        let reconciler = Reconciler::new(&decl, &executor);

        let plan = reconciler.plan(Some(&prior), prior.inputs());
        assert_eq!(plan.action, PlannedAction::NoOp);
        let state = reconciler
            .apply(Some(&prior), &plan, &SequentialIds(Cell::new(0)))
            .unwrap();

        assert_eq!(executor.commands(), ["read-uuid"]);
        assert_eq!(state.outputs()["uuid"], Value::known("fresh"));
        assert_eq!(state.outputs()["used"], prior.outputs()["used"]);
        assert_eq!(state.reads, decl.rules.reads());
        assert_eq!(state.id, prior.id);
    }

    #[test]
    fn test_connect_failure_runs_nothing() {
        let decl = declaration();
        let result = Reconciler::<RecordingExecutor>::connect(&decl, || Err("host unreachable"));
        assert!(matches!(result, Err(Error::Connection(msg)) if msg == "host unreachable"));
    }
}
