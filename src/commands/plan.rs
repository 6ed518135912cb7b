use anyhow::Result;

use crate::Context;
use crate::cli::PlanArgs;
use crate::config;
use crate::engine::differ::display_plan;
use crate::state;

/// Show what an apply would do; nothing is executed
pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let loaded = config::load(&args.decl.declaration)?;
    let prior = state::load_optional(args.state.as_deref())?;

    let plan = reconcile::plan(&loaded.declaration, prior.as_ref(), &loaded.inputs);
    log::debug!("Planned {:?}, changed inputs {:?}", plan.action, plan.changed);

    if !ctx.quiet {
        display_plan(&loaded.declaration, prior.as_ref(), &plan, ctx.verbose > 0);
    }
    Ok(())
}
