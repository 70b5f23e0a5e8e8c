//! Marker rules: recognized build/CI/test/doc filenames and their matching.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::models::DirSamples;
use crate::workspace::{load_json, Workspace};

pub const SOURCE_BUILTIN: &str = "built-in";
pub const SOURCE_LEARNED: &str = "learned";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkerRule {
    /// Single filename glob, or a relative path glob when it contains `/`.
    pub pattern: String,
    pub category: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

fn default_weight() -> f64 {
    0.5
}

fn default_source() -> String {
    SOURCE_BUILTIN.to_string()
}

fn builtin(pattern: &str, category: &str, languages: &[&str], weight: f64) -> MarkerRule {
    MarkerRule {
        pattern: pattern.to_string(),
        category: category.to_string(),
        languages: languages.iter().map(|l| l.to_string()).collect(),
        weight,
        source: SOURCE_BUILTIN.to_string(),
        confidence: None,
    }
}

/// The fixed built-in rule registry.
pub fn seed_rules() -> Vec<MarkerRule> {
    vec![
        builtin("pyproject.toml", "build", &["python"], 0.9),
        builtin("go.mod", "build", &["go"], 0.9),
        builtin("Cargo.toml", "build", &["rust"], 0.9),
        builtin("package.json", "build", &["javascript", "typescript"], 0.8),
        builtin("CMakeLists.txt", "build", &["c", "c++"], 0.85),
        builtin("Makefile", "build", &[], 0.6),
        builtin("Dockerfile", "deploy", &[], 0.7),
        builtin("pom.xml", "build", &["java"], 0.8),
        builtin("build.gradle", "build", &["java", "kotlin"], 0.8),
        builtin(".github/workflows/", "ci", &[], 0.6),
        builtin("tox.ini", "test", &["python"], 0.6),
        builtin("pytest.ini", "test", &["python"], 0.6),
        builtin("mkdocs.yml", "docs", &[], 0.6),
        builtin("tsconfig.json", "build", &["typescript"], 0.7),
    ]
}

/// Built-in rules plus the learned cache when enabled.
pub fn active_rules(workspace: &Workspace, config: &RunConfig) -> Vec<MarkerRule> {
    let mut rules = seed_rules();
    if config.learning.use_learned_markers {
        rules.extend(load_learned(&workspace.learned_markers_path()));
    }
    rules
}

/// Learned cache entries; a missing or corrupted cache loads as empty.
pub fn load_learned(path: &Path) -> Vec<MarkerRule> {
    let mut rules: Vec<MarkerRule> = load_json(path).unwrap_or_default();
    for rule in &mut rules {
        rule.source = SOURCE_LEARNED.to_string();
    }
    rules
}

/// Matched marker names for one directory, deduplicated and sorted.
///
/// Single-segment patterns match immediate entry names via glob, so the
/// matched name is the entry name. Patterns containing a separator are
/// evaluated as a relative glob from the directory, presence-only, and the
/// matched name is the pattern itself.
pub fn detect_markers(dir: &Path, rules: &[MarkerRule]) -> Vec<String> {
    let entries = entry_names(dir);
    let mut matched: BTreeSet<String> = BTreeSet::new();

    for rule in rules {
        if rule.pattern.contains('/') {
            if path_pattern_present(dir, &rule.pattern) {
                matched.insert(rule.pattern.clone());
            }
        } else if let Ok(pattern) = glob::Pattern::new(&rule.pattern) {
            for name in &entries {
                if pattern.matches(name) {
                    matched.insert(name.clone());
                }
            }
        }
    }

    matched.into_iter().collect()
}

/// Marker weight for one matched name: the exact-pattern rule wins, else
/// the first glob rule that matches.
pub fn marker_weight(name: &str, rules: &[MarkerRule]) -> f64 {
    if let Some(rule) = rules.iter().find(|rule| rule.pattern == name) {
        return rule.weight;
    }
    for rule in rules {
        if rule.pattern.contains('/') {
            continue;
        }
        if let Ok(pattern) = glob::Pattern::new(&rule.pattern) {
            if pattern.matches(name) {
                return rule.weight;
            }
        }
    }
    0.0
}

/// Rebuild the capped sample lists with matched-marker basenames ordered
/// first, then alphabetical fill. `files` and `dirs` must be sorted entry
/// names; a cap of 0 means unlimited.
pub fn rebuild_samples(
    files: &[String],
    dirs: &[String],
    matched: &[String],
    max_dirs: usize,
    max_files: usize,
) -> DirSamples {
    let marker_basenames: Vec<String> = matched
        .iter()
        .map(|name| {
            name.trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(name)
                .to_string()
        })
        .collect();

    DirSamples {
        dirs: prioritized(dirs, &marker_basenames, max_dirs),
        files: prioritized(files, &marker_basenames, max_files),
    }
}

fn prioritized(names: &[String], first: &[String], cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in first {
        if names.contains(name) && !out.contains(name) {
            out.push(name.clone());
        }
    }
    for name in names {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    if cap > 0 {
        out.truncate(cap);
    }
    out
}

fn entry_names(dir: &Path) -> Vec<String> {
    let Ok(read) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = read
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn path_pattern_present(dir: &Path, pattern: &str) -> bool {
    let full = format!(
        "{}/{}",
        dir.display(),
        pattern.trim_end_matches('/')
    );
    match glob::glob(&full) {
        Ok(paths) => paths.filter_map(|p| p.ok()).next().is_some(),
        Err(_) => false,
    }
}
