use anyhow::{Context as AnyhowContext, Result};
use shellkit::SessionRegistry;
use std::path::Path;

use crate::Context;
use crate::commands::open_shell;
use crate::config;
use crate::engine::differ::display_outputs;

/// Run the read commands against the declared inputs and print the outputs
///
/// With `--quiet` the outputs are printed as JSON instead.
pub fn run(ctx: &Context, path: &Path) -> Result<()> {
    let loaded = config::load(path)?;

    let registry = SessionRegistry::new();
    let shell = open_shell(&registry, &loaded.connection)?;
    let outputs = reconcile::query(&shell, &loaded.inputs, loaded.declaration.rules.reads())
        .context("Query failed");
    registry.shutdown();
    let outputs = outputs?;

    if ctx.quiet {
        println!(
            "{}",
            serde_json::to_string_pretty(&outputs).context("Failed to serialize outputs")?
        );
    } else {
        display_outputs(&outputs);
    }
    Ok(())
}
