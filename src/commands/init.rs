//! Initialize the .atlas/ workspace inside a repository.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::workspace::Workspace;
use crate::LOGO;

/// Create the workspace directory tree and default configuration files.
///
/// # Arguments
/// * `repo` - Repository root to initialize
///
/// Idempotent: a second run keeps any files the user has edited.
pub fn execute(repo: &Path) -> Result<()> {
    let workspace = Workspace::new(repo)?;
    let already = workspace.exists();

    print_header();

    println!("\n{}", "Workspace".bold());
    println!("{}", "─".repeat(40).dimmed());

    let created = workspace.initialize()?;
    println!(
        "  {} Directory structure {} {}",
        "✓".green().bold(),
        if already { "verified" } else { "created" },
        format!("{}/", Workspace::DIR_NAME).dimmed()
    );

    for path in &created {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("  {} Default {} written", "✓".green().bold(), name.bold());
    }
    if created.is_empty() {
        println!("  {} Existing configuration kept", "─".dimmed());
    }

    print_summary(&workspace);
    Ok(())
}

fn print_header() {
    println!();
    println!("{}", LOGO.cyan().bold());
}

fn print_summary(workspace: &Workspace) {
    println!();
    println!("{}", "═".repeat(40).dimmed());
    println!(
        "{} Workspace ready at {}",
        "✓".green().bold(),
        workspace.root().display().to_string().cyan()
    );
    println!();
    println!("{}", "Next steps:".bold());
    println!("  {}  Crawl the repository", "atlas explore".cyan());
    println!("  {}  Preview a directory's prompt context", "atlas inspect".cyan());
    println!();
}
