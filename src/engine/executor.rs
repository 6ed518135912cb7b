//! Apply flow - shows the plan, asks for confirmation, then runs it

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use reconcile::{CommandExecutor, IdGenerator, InstanceState, Plan, PlannedAction, Reconciler};

use super::differ::display_plan;

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't run anything, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Print the commands the plan will run
    pub show_commands: bool,
}

/// How an apply ended
#[derive(Debug)]
pub enum Outcome {
    /// The plan ran; this is the new state
    Applied(InstanceState),
    /// Nothing needed to run
    Unchanged,
    /// Dry run, or the user declined
    Skipped,
}

/// Confirmation source, so tests can answer without a terminal
pub trait ConfirmCallback {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Interactive prompt on the terminal
pub struct TerminalConfirm;

impl ConfirmCallback for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

/// Show `plan`, confirm it and run it
pub fn execute<E: CommandExecutor>(
    reconciler: &Reconciler<'_, E>,
    prior: Option<&InstanceState>,
    plan: &Plan,
    ids: &dyn IdGenerator,
    opts: &ExecuteOptions,
    confirm: &mut dyn ConfirmCallback,
) -> Result<Outcome> {
    display_plan(reconciler.declaration(), prior, plan, opts.show_commands);

    if !plan.has_changes() {
        return Ok(Outcome::Unchanged);
    }

    if opts.dry_run {
        eprintln!();
        eprintln!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(Outcome::Skipped);
    }

    let prompt = match plan.action {
        PlannedAction::Replace => "Destroy and recreate this instance?",
        _ => "Apply these changes?",
    };
    if !opts.yes && !confirm.confirm(prompt)? {
        eprintln!();
        eprintln!("  {} Aborted", "✗".red());
        return Ok(Outcome::Skipped);
    }

    let state = reconciler
        .apply(prior, plan, ids)
        .context("Apply failed")?;

    eprintln!();
    eprintln!("  {} Applied to instance {}", "✓".green().bold(), state.id);
    Ok(Outcome::Applied(state))
}

/// Confirm and run the destroy command
pub fn destroy<E: CommandExecutor>(
    reconciler: &Reconciler<'_, E>,
    state: &InstanceState,
    yes: bool,
    confirm: &mut dyn ConfirmCallback,
) -> Result<bool> {
    if !yes && !confirm.confirm(&format!("Destroy instance {}?", state.id))? {
        eprintln!("  {} Aborted", "✗".red());
        return Ok(false);
    }

    reconciler.delete(state).context("Destroy failed")?;
    eprintln!("  {} Destroyed instance {}", "✓".green().bold(), state.id);
    Ok(true)
}
