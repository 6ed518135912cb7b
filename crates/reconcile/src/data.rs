//! Read-only queries
//!
//! Runs read rules against inputs alone, with no instance behind them: nothing
//! is created or destroyed and no prior state is consulted.

use crate::bindings::{BindingPrefix, Bindings};
use crate::context::CommandExecutor;
use crate::driver;
use crate::error::Result;
use crate::types::{ReadRule, VarMap};

/// Run every read rule once with `INPUT_` bindings and collect the outputs
pub fn query<E: CommandExecutor>(
    executor: &E,
    inputs: &VarMap,
    reads: &[ReadRule],
) -> Result<VarMap> {
    log::info!("querying {} output(s)", reads.len());
    let bindings = Bindings::builder()
        .with(BindingPrefix::Input, inputs)
        .build();
    driver::read_all(executor, reads.iter(), &bindings)
}
