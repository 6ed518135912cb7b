// Lifecycle commands
pub mod apply;
pub mod destroy;
pub mod plan;
pub mod refresh;

// Read-only commands
pub mod query;
pub mod validate;

use shellkit::{Connection, SessionRegistry, Shell};
use std::sync::Arc;

/// Open the shell a declaration asks for
pub fn open_shell(
    registry: &SessionRegistry,
    connection: &Connection,
) -> shellkit::Result<Arc<dyn Shell>> {
    let shell = registry.get_or_connect(connection)?;
    log::info!("Running commands on {}", shell.describe());
    Ok(shell)
}
