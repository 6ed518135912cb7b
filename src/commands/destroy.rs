use anyhow::Result;
use reconcile::Reconciler;
use shellkit::SessionRegistry;

use crate::Context;
use crate::cli::DestroyArgs;
use crate::commands::open_shell;
use crate::config;
use crate::engine::{self, TerminalConfirm};
use crate::state;
use crate::ui;

/// Run the destroy command of an instance
pub fn run(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    let loaded = config::load(&args.decl.declaration)?;
    let prior = state::load(&args.state)?;

    if loaded.declaration.destroy.is_none() && !ctx.quiet {
        ui::warn("No destroy command declared; the instance is only forgotten");
    }

    let registry = SessionRegistry::new();
    let reconciler = Reconciler::connect(&loaded.declaration, || {
        open_shell(&registry, &loaded.connection)
    })?;

    let destroyed = engine::destroy(&reconciler, &prior, args.yes, &mut TerminalConfirm);
    registry.shutdown();

    if destroyed? && !ctx.quiet {
        ui::dim(&format!(
            "State file {} no longer describes a live instance",
            args.state.display()
        ));
    }
    Ok(())
}
