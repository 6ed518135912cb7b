//! Instance state documents
//!
//! The state is a JSON rendering of [`InstanceState`]. It is read from a path
//! the user names and written either to stdout or to an explicit output path;
//! nothing is kept anywhere else.

use anyhow::{Context, Result};
use reconcile::InstanceState;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Load a state document
pub fn load(path: &Path) -> Result<InstanceState> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;

    let state: InstanceState = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

    log::debug!("Loaded state {} from {}", state.id, path.display());
    Ok(state)
}

/// Load a state document when a path was given
pub fn load_optional(path: Option<&Path>) -> Result<Option<InstanceState>> {
    path.map(load).transpose()
}

/// Write a state document to `output`, or to stdout without one
pub fn write(state: &InstanceState, output: Option<&Path>) -> Result<()> {
    let content = serde_json::to_string_pretty(state).context("Failed to serialize state")?;

    match output {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
            fs::write(path, format!("{content}\n"))
                .with_context(|| format!("Failed to write state file: {}", path.display()))?;
            log::debug!("Saved state to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{content}").context("Failed to write state")?;
        }
    }
    Ok(())
}
