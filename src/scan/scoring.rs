//! Deterministic child relevance scoring.
//!
//! Scores rank children for the context payload and serve as the sole
//! fallback navigation when the suggestion step is unusable. Only relative
//! ordering and the presence of reason tokens are contractual; the exact
//! constants are tunable.

use std::collections::BTreeMap;

use crate::models::{ChildScore, DirectoryRecord};

use super::languages;
use super::markers::{self, MarkerRule};

/// Share-weighted contribution of the dominant language.
const LANGUAGE_WEIGHT: f64 = 0.5;
/// Ceiling of the saturating size signal.
const SIZE_WEIGHT: f64 = 0.5;
/// Flat bonus for a recognized role name.
const NAME_ROLE_BONUS: f64 = 0.25;
/// At most this many marker reason tokens per child.
const MAX_MARKER_REASONS: usize = 3;

/// Directory names that conventionally signal a role worth visiting.
const ROLE_NAMES: &[&str] = &[
    "api", "app", "cli", "cmd", "core", "docs", "internal", "lib", "pkg", "server", "services",
    "src", "test", "tests", "tools",
];

/// Score every non-excluded child of `parent` that has a record.
///
/// Reason tokens are appended in a fixed order: `marker:`, `lang:`,
/// `size:`, `name:`.
pub fn score_children(
    parent: &DirectoryRecord,
    children: &BTreeMap<String, DirectoryRecord>,
    rules: &[MarkerRule],
    lang_map: &BTreeMap<String, String>,
    size_threshold: usize,
) -> BTreeMap<String, ChildScore> {
    let excluded = parent.excluded_set();
    let mut scores = BTreeMap::new();

    for name in &parent.siblings {
        if excluded.contains(name.as_str()) {
            continue;
        }
        let Some(child) = children.get(name) else {
            continue;
        };
        scores.insert(name.clone(), score_child(name, child, rules, lang_map, size_threshold));
    }

    scores
}

fn score_child(
    name: &str,
    child: &DirectoryRecord,
    rules: &[MarkerRule],
    lang_map: &BTreeMap<String, String>,
    size_threshold: usize,
) -> ChildScore {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    for (i, marker) in child.markers.iter().enumerate() {
        score += markers::marker_weight(marker, rules);
        if i < MAX_MARKER_REASONS {
            reasons.push(format!("marker:{marker}"));
        }
    }

    let langs = languages::aggregate_languages(&child.ext_histogram, lang_map);
    if let Some((language, count)) = langs.first() {
        let mapped_total: u64 = langs.iter().map(|(_, n)| n).sum();
        if mapped_total > 0 {
            let share = *count as f64 / mapped_total as f64;
            score += share * LANGUAGE_WEIGHT;
            reasons.push(format!("lang:{language}({:.0}%)", share * 100.0));
        }
    }

    let entries = child.counts.files + child.counts.dirs;
    if entries > 0 {
        score += SIZE_WEIGHT * entries as f64 / (entries as f64 + size_threshold.max(1) as f64);
        reasons.push(format!("size:{entries}"));
    }

    if ROLE_NAMES.contains(&name.to_lowercase().as_str()) {
        score += NAME_ROLE_BONUS;
        reasons.push(format!("name:{name}"));
    }

    ChildScore { score, reasons }
}

/// Ranked view of a score map: score descending, name ascending on ties.
pub fn rank(scores: &BTreeMap<String, ChildScore>) -> Vec<(&str, &ChildScore)> {
    let mut ranked: Vec<(&str, &ChildScore)> = scores
        .iter()
        .map(|(name, score)| (name.as_str(), score))
        .collect();
    ranked.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then_with(|| a.0.cmp(b.0)));
    ranked
}
