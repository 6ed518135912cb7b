use anyhow::Result;
use std::path::Path;

use crate::Context;
use crate::config::{self, ConfigFormat};
use crate::ui;

/// Load a declaration and run every check on it, without running commands
pub fn run(ctx: &Context, path: &Path) -> Result<()> {
    let format = ConfigFormat::from_path(path)?;
    let loaded = config::load(path)?;

    if ctx.quiet {
        return Ok(());
    }

    let rules = &loaded.declaration.rules;
    ui::success(&format!(
        "{} is valid ({})",
        path.display(),
        format.extension().to_uppercase()
    ));
    ui::kv("inputs", &loaded.inputs.len().to_string());
    ui::kv("update rules", &rules.updates().len().to_string());
    ui::kv("read rules", &rules.reads().len().to_string());
    ui::kv(
        "fallback",
        if rules.updates().iter().any(|r| r.is_fallback()) {
            "yes"
        } else {
            "no"
        },
    );
    Ok(())
}
