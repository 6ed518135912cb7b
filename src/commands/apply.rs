use anyhow::Result;
use reconcile::{RandomId, Reconciler};
use shellkit::SessionRegistry;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::commands::open_shell;
use crate::config;
use crate::engine::{self, ExecuteOptions, Outcome, TerminalConfirm};
use crate::state;
use crate::ui;

/// Plan, confirm and apply a declaration, then emit the new state
pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let loaded = config::load(&args.decl.declaration)?;
    let prior = state::load_optional(args.state.as_deref())?;

    let registry = SessionRegistry::new();
    let reconciler = Reconciler::connect(&loaded.declaration, || {
        open_shell(&registry, &loaded.connection)
    })?;

    let plan = reconciler.plan(prior.as_ref(), &loaded.inputs);
    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        show_commands: ctx.verbose > 0,
    };

    let outcome = engine::execute(
        &reconciler,
        prior.as_ref(),
        &plan,
        &RandomId,
        &opts,
        &mut TerminalConfirm,
    );
    registry.shutdown();

    match outcome? {
        Outcome::Applied(new_state) => state::write(&new_state, args.output.as_deref()),
        Outcome::Unchanged => {
            if !ctx.quiet {
                ui::dim("Instance already matches the declaration");
            }
            Ok(())
        }
        Outcome::Skipped => Ok(()),
    }
}
