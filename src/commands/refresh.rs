use anyhow::{Context as AnyhowContext, Result};
use reconcile::Reconciler;
use shellkit::SessionRegistry;

use crate::Context;
use crate::cli::RefreshArgs;
use crate::commands::open_shell;
use crate::config;
use crate::engine::differ::display_outputs;
use crate::state;
use crate::ui;

/// Fetch the outputs of an instance again and emit the refreshed state
pub fn run(ctx: &Context, args: &RefreshArgs) -> Result<()> {
    let loaded = config::load(&args.decl.declaration)?;
    let prior = state::load(&args.state)?;

    let registry = SessionRegistry::new();
    let reconciler = Reconciler::connect(&loaded.declaration, || {
        open_shell(&registry, &loaded.connection)
    })?;

    let refreshed = reconciler.read(&prior).context("Refresh failed");
    registry.shutdown();
    let refreshed = refreshed?;

    if !ctx.quiet {
        ui::section(&format!("Outputs of {}", refreshed.id));
        display_outputs(refreshed.outputs());
    }
    state::write(&refreshed, args.output.as_deref())
}
