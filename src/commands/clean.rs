//! Remove the .atlas/ workspace from a repository.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::workspace::Workspace;

/// Delete the workspace directory and everything in it. The repository
/// itself is never touched.
pub fn execute(repo: &Path) -> Result<()> {
    let workspace = Workspace::new(repo)?;

    if workspace.remove()? {
        println!(
            "{} Removed {}",
            "✓".green().bold(),
            format!("{}/", Workspace::DIR_NAME).dimmed()
        );
    } else {
        println!("Nothing to clean.");
    }

    Ok(())
}
