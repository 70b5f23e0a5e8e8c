//! Persisted per-directory snapshot records.
//!
//! One record per directory, keyed by repo-relative path (`.` = root),
//! stored at `.atlas/snapshot/<rel>/record.json`. The scan pass creates
//! records; the marker and scoring enrichment passes overwrite their
//! fields wholesale, never partially.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryRecord {
    /// Repo-relative path; `.` is the repository root.
    pub path: String,
    pub depth: usize,
    pub counts: DirCounts,
    /// Extension → file count. Extensions are lower-cased; the leading dot
    /// is kept only for dotfiles with no other dot (`.gitignore`).
    #[serde(default)]
    pub ext_histogram: BTreeMap<String, u64>,
    /// Matched marker rule identifiers, deduplicated and sorted.
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(default)]
    pub samples: DirSamples,
    /// Immediate child directory names the scanner kept, sorted.
    #[serde(default)]
    pub siblings: Vec<String>,
    /// Child directory names the scanner refused to enter; disjoint from
    /// `siblings` when written by the scan pass.
    #[serde(default)]
    pub excluded_children: Vec<String>,
    #[serde(default)]
    pub is_symlink: bool,
    /// Set when the scanner saw but did not enter this directory
    /// (policy match, symlink policy, or unreadable listing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_reason: Option<String>,
    #[serde(default)]
    pub fingerprint: Fingerprint,
    /// Child name → deterministic relevance score, written by the scoring
    /// enrichment pass.
    #[serde(default)]
    pub deterministic_scoring: BTreeMap<String, ChildScore>,
}

impl DirectoryRecord {
    /// Record for a directory the scanner refuses to enter.
    pub fn skipped(path: String, depth: usize, reason: String, is_symlink: bool) -> Self {
        Self {
            path,
            depth,
            counts: DirCounts::default(),
            ext_histogram: BTreeMap::new(),
            markers: Vec::new(),
            samples: DirSamples::default(),
            siblings: Vec::new(),
            excluded_children: Vec::new(),
            is_symlink,
            ignored_reason: Some(reason),
            fingerprint: Fingerprint::default(),
            deterministic_scoring: BTreeMap::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == "."
    }

    pub fn excluded_set(&self) -> BTreeSet<&str> {
        self.excluded_children.iter().map(String::as_str).collect()
    }

    /// Sibling names safe to navigate into. Records loaded from disk may
    /// have been edited, so names also present in `excluded_children` are
    /// filtered out rather than trusted.
    pub fn eligible_children(&self) -> Vec<&str> {
        let excluded = self.excluded_set();
        self.siblings
            .iter()
            .map(String::as_str)
            .filter(|name| !excluded.contains(name))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirCounts {
    pub files: u64,
    pub dirs: u64,
}

/// Capped preview lists shown to the suggestion step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirSamples {
    #[serde(default)]
    pub dirs: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Staleness fingerprint: lets a re-scan decide whether a directory
/// changed without comparing whole records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fingerprint {
    /// Latest mtime among the directory and its immediate entries,
    /// ISO-8601 UTC with trailing `Z`.
    #[serde(default)]
    pub latest_modified_utc: String,
    #[serde(default)]
    pub total_entries: u64,
    /// SHA-256 over the sorted root-relative entry paths.
    #[serde(default)]
    pub name_hash: String,
}

/// Relevance score for one child directory. `score` is a relative ranking
/// with no fixed range; `reasons` are ordered explainability tokens such as
/// `marker:Cargo.toml`, `lang:rust(80%)`, `size:41`, `name:src`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChildScore {
    pub score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}
