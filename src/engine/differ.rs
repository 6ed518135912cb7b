//! Plan display

use colored::Colorize;
use reconcile::matcher::differing_names;
use reconcile::{Declaration, InstanceState, OutputDecision, Plan, PlannedAction, Value, VarMap};

/// How one input moves between the prior state and the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputChange<'a> {
    Added { name: &'a str, to: &'a Value },
    Removed { name: &'a str, from: &'a Value },
    Modified { name: &'a str, from: &'a Value, to: &'a Value },
}

/// Input changes in name order
pub fn input_changes<'a>(prior: &'a VarMap, proposed: &'a VarMap) -> Vec<InputChange<'a>> {
    differing_names(prior, proposed)
        .iter()
        .filter_map(|name| {
            match (prior.get_key_value(name), proposed.get_key_value(name)) {
                (None, Some((name, to))) => Some(InputChange::Added { name, to }),
                (Some((name, from)), None) => Some(InputChange::Removed { name, from }),
                (Some((name, from)), Some((_, to))) => {
                    Some(InputChange::Modified { name, from, to })
                }
                (None, None) => None,
            }
        })
        .collect()
}

/// One line summary of the planned action
pub fn describe_action(plan: &Plan) -> String {
    match plan.action {
        PlannedAction::Create => "create".to_string(),
        PlannedAction::NoOp if plan.has_changes() => "refresh outputs".to_string(),
        PlannedAction::NoOp => "no changes".to_string(),
        PlannedAction::Update { rule } => format!("update in place (rule #{})", rule + 1),
        PlannedAction::Replace => "destroy and create again".to_string(),
    }
}

/// Commands an apply of `plan` runs, in order
pub fn planned_commands<'d>(
    declaration: &'d Declaration,
    prior: Option<&InstanceState>,
    plan: &Plan,
) -> Vec<&'d str> {
    let mut commands = Vec::new();
    match plan.action {
        PlannedAction::Create => commands.extend(declaration.create.as_deref()),
        PlannedAction::Replace => {
            if prior.is_some() {
                commands.extend(declaration.destroy.as_deref());
            }
            commands.extend(declaration.create.as_deref());
        }
        PlannedAction::Update { rule } => {
            commands.push(declaration.rules.updates()[rule].cmd.as_str());
        }
        PlannedAction::NoOp => {}
    }
    commands.extend(
        plan.stale_outputs()
            .filter_map(|name| declaration.rules.read(name))
            .map(|read| read.cmd.as_str()),
    );
    commands
}

/// Display a plan in a user-friendly format
///
/// With `show_commands` every command the apply will run is listed too.
pub fn display_plan(
    declaration: &Declaration,
    prior: Option<&InstanceState>,
    plan: &Plan,
    show_commands: bool,
) {
    if !plan.has_changes() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    let empty = VarMap::new();
    let prior_inputs = prior.map_or(&empty, InstanceState::inputs);

    println!();
    println!("┌─ {} ─────────────────────────────────────────┐", "Plan".bold());
    println!("│");
    println!("│ {} {}", "Action:".bold(), describe_action(plan));
    if let Some(prior) = prior {
        println!("│ {} {}", "Instance:".bold(), prior.id);
    }
    println!("│");

    let changes = input_changes(prior_inputs, &plan.proposed.inputs);
    if !changes.is_empty() {
        println!("│ {}", "Inputs".bold());
        for change in &changes {
            match change {
                InputChange::Added { name, to } => {
                    println!("│   {} {:<24} {}", "+".green(), name, to);
                }
                InputChange::Removed { name, from } => {
                    println!("│   {} {:<24} {}", "-".red(), name, from.to_string().dimmed());
                }
                InputChange::Modified { name, from, to } => {
                    println!(
                        "│   {} {:<24} {} → {}",
                        "~".yellow(),
                        name,
                        from.to_string().dimmed(),
                        to
                    );
                }
            }
        }
        println!("│");
    }

    if !plan.outputs.is_empty() {
        println!("│ {}", "Outputs".bold());
        for output in &plan.outputs {
            match &output.decision {
                OutputDecision::Unknown(reason) => {
                    println!(
                        "│   {} {:<24} {} {}",
                        "~".yellow(),
                        output.name,
                        Value::Unknown,
                        format!("({})", reason).dimmed()
                    );
                }
                OutputDecision::Retain(_) => {
                    println!("│     {:<24} {}", output.name, "unchanged".dimmed());
                }
            }
        }
        println!("│");
    }

    if show_commands {
        let commands = planned_commands(declaration, prior, plan);
        if !commands.is_empty() {
            println!("│ {}", "Commands".bold());
            for cmd in commands {
                println!("│   {} {}", "$".dimmed(), cmd);
            }
            println!("│");
        }
    }

    let stale = plan.stale_outputs().count();
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} input change(s), {} output(s) fetched again",
        changes.len().to_string().bold(),
        stale.to_string().bold()
    );
    if plan.requires_replace() {
        println!(
            "│ {} No update rule covers [{}]; the instance will be replaced",
            "⚠".yellow(),
            plan.changed.join(", ")
        );
    }
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display the outputs of a state or query
pub fn display_outputs(outputs: &VarMap) {
    if outputs.is_empty() {
        println!("  {}", "(no outputs)".dimmed());
        return;
    }
    for (name, value) in outputs {
        println!("  {:<24} {}", name.bold(), value);
    }
}
