//! Skip/allow matching with gitignore-style pattern semantics.
//!
//! Patterns come from `.atlas/ignore` and `.atlas/allow`; a missing or
//! empty file is an empty list, never an error. The repository root is
//! never skipped.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};

pub struct IgnorePolicy {
    root: PathBuf,
    skip_symlinks: bool,
    ignore: Gitignore,
    allow: Gitignore,
    /// Literal ignore pattern lines, kept for `explain_skip`.
    ignore_lines: Vec<String>,
}

impl IgnorePolicy {
    pub fn load(
        root: &Path,
        ignore_file: &Path,
        allow_file: &Path,
        skip_symlinks: bool,
    ) -> Result<Self> {
        let ignore_lines = read_pattern_lines(ignore_file)?;
        let allow_lines = read_pattern_lines(allow_file)?;

        Ok(Self {
            root: root.to_path_buf(),
            skip_symlinks,
            ignore: build_matcher(root, &ignore_lines)?,
            allow: build_matcher(root, &allow_lines)?,
            ignore_lines,
        })
    }

    /// Policy with no patterns; used by tests and as a safe default.
    pub fn empty(root: &Path, skip_symlinks: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            skip_symlinks,
            ignore: Gitignore::empty(),
            allow: Gitignore::empty(),
            ignore_lines: Vec::new(),
        }
    }

    /// True when the scanner must not enter `path`: either the symlink
    /// policy applies, or an ignore pattern matches without an allow
    /// override. The root itself is never skipped.
    pub fn should_skip(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        if rel.as_os_str().is_empty() {
            return false;
        }
        if self.skip_symlinks && path.is_symlink() {
            return true;
        }
        let is_dir = path.is_dir();
        self.ignore.matched(rel, is_dir).is_ignore() && !self.allow.matched(rel, is_dir).is_ignore()
    }

    /// Human-readable reason for a skip, naming the first matching literal
    /// pattern line. Returns None when `path` is not skipped.
    pub fn explain_skip(&self, path: &Path) -> Option<String> {
        if !self.should_skip(path) {
            return None;
        }
        if self.skip_symlinks && path.is_symlink() {
            return Some("symlink target".to_string());
        }

        let rel = path.strip_prefix(&self.root).ok()?;
        let is_dir = path.is_dir();
        for line in &self.ignore_lines {
            if let Ok(single) = build_matcher(&self.root, std::slice::from_ref(line)) {
                if single.matched(rel, is_dir).is_ignore() {
                    return Some(format!("matched .atlas/ignore: '{line}'"));
                }
            }
        }
        Some("matched ignore rules".to_string())
    }
}

/// Pattern lines from a file; missing file means no patterns. Comments and
/// blank lines are dropped here so `explain_skip` only ever reports real
/// patterns.
fn read_pattern_lines(path: &Path) -> Result<Vec<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()))
        }
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

fn build_matcher(root: &Path, lines: &[String]) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    for line in lines {
        // Malformed patterns are dropped rather than failing the load.
        let _ = builder.add_line(None, line);
    }
    builder.build().context("Failed to build ignore matcher")
}
