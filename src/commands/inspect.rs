//! Preview the prompt context a directory would receive.
//!
//! Reads the stored snapshot record and accumulated knowledge, builds the
//! same capped context the explorer sends, and writes both the JSON payload
//! and a human-readable digest under .atlas/inspect/.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::context::{build_context, render_context_preview};
use crate::knowledge::KnowledgeStore;
use crate::logging::Logger;
use crate::models::DirectoryRecord;
use crate::workspace::{load_json, save_json, Workspace, WorkspaceError};

/// # Arguments
/// * `repo` - Repository root
/// * `path` - Repo-relative directory to inspect; defaults to the root
pub fn execute(repo: &Path, path: Option<String>) -> Result<()> {
    let workspace = Workspace::new(repo)?;
    let config = workspace.load_config()?;
    let rel = normalize_rel(path.as_deref().unwrap_or("."))?;

    let record_path = workspace.record_path(&rel);
    if !record_path.exists() {
        return Err(WorkspaceError::RecordMissing { rel }.into());
    }
    let record: DirectoryRecord = load_json(&record_path)?;

    let knowledge = KnowledgeStore::load(&workspace, &Logger::in_memory());
    let ancestors = knowledge.ancestor_chain(&rel);
    let payload = build_context(
        &record,
        &ancestors,
        &workspace.repo_name(),
        &config.caps.context,
    )?;
    let preview = render_context_preview(&record, &payload);

    let out_dir = workspace.inspect_dir(&rel);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    save_json(&out_dir.join("context.json"), &payload)?;
    fs::write(out_dir.join("preview.md"), &preview)
        .with_context(|| format!("Failed to write preview for '{rel}'"))?;

    println!("{preview}");
    println!(
        "{} Context written {}",
        "✓".green().bold(),
        out_dir.display().to_string().dimmed()
    );

    Ok(())
}

/// Normalize a user-supplied path to the repo-relative form records use.
/// Absolute paths and parent traversal are rejected.
fn normalize_rel(input: &str) -> Result<String> {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        return Ok(".".to_string());
    }
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    if trimmed.starts_with('/') || trimmed.contains('\\') {
        bail!("path must be relative to the repository root: '{input}'");
    }
    if trimmed
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        bail!("path must not contain '.' or '..' components: '{input}'");
    }
    Ok(trimmed.to_string())
}
