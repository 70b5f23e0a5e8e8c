//! One-shot marker and language learning passes.
//!
//! Each pass runs at most once per workspace: the learned cache file is
//! both the output and the gate. Candidates come from the snapshot, the
//! model filters them, and entries under the configured confidence are
//! discarded. Every failure here is soft; a run continues without learned
//! rules.

use std::collections::BTreeMap;
use std::fs;

use serde_json::json;

use crate::config::RunConfig;
use crate::logging::Logger;
use crate::models::DirectoryRecord;
use crate::policy::IgnorePolicy;
use crate::scan::languages::{self, LearnedLanguage};
use crate::scan::markers::{self, MarkerRule, SOURCE_LEARNED};
use crate::workspace::{save_json, Workspace};

use super::client::SuggestionClient;
use super::prompts::{self, LANGUAGE_LEARNING_TEMPLATE, MARKER_LEARNING_TEMPLATE};

/// Propose new marker rules from entry names no built-in rule matches.
/// Returns true when a cache file was written.
pub fn learn_markers_once(
    workspace: &Workspace,
    config: &RunConfig,
    policy: &IgnorePolicy,
    records: &BTreeMap<String, DirectoryRecord>,
    client: &SuggestionClient,
    logger: &Logger,
) -> bool {
    if !config.learning.learn_markers {
        return false;
    }
    let cache = workspace.learned_markers_path();
    if cache.exists() {
        logger.debug("learning", "marker cache present, skipping learning pass");
        return false;
    }

    let seed = markers::seed_rules();
    let histogram = name_histogram(workspace, policy, records);
    let candidates = top_candidates(
        histogram
            .into_iter()
            .filter(|(name, _)| markers::marker_weight(name, &seed) == 0.0),
        config.learning.markers.top_k_candidates,
    );
    if candidates.is_empty() {
        logger.info("learning", "no unmatched names to learn markers from");
        return false;
    }

    let payload = json!(candidates
        .iter()
        .map(|(name, count)| json!({"name": name, "count": count}))
        .collect::<Vec<_>>());
    let prompt = prompts::render(
        MARKER_LEARNING_TEMPLATE,
        &[("candidates", &payload.to_string())],
    );

    let Some(value) = client.request_learning(&prompt) else {
        return false;
    };
    let proposed: Vec<MarkerRule> = match serde_json::from_value(value) {
        Ok(rules) => rules,
        Err(err) => {
            logger.warn("learning", &format!("unusable marker proposals: {err}"));
            return false;
        }
    };

    let min_confidence = config.learning.markers.min_confidence;
    let kept: Vec<MarkerRule> = proposed
        .into_iter()
        .filter(|rule| !rule.pattern.trim().is_empty())
        .filter(|rule| rule.confidence.unwrap_or(0.0) >= min_confidence)
        .map(|mut rule| {
            rule.source = SOURCE_LEARNED.to_string();
            rule
        })
        .collect();

    match save_json(&cache, &kept) {
        Ok(()) => {
            logger.info(
                "learning",
                &format!("cached {} learned marker rules", kept.len()),
            );
            true
        }
        Err(err) => {
            logger.warn("learning", &format!("failed to cache marker rules: {err:#}"));
            false
        }
    }
}

/// Propose extension mappings for extensions the built-in table misses.
/// Returns true when a cache file was written.
pub fn learn_languages_once(
    workspace: &Workspace,
    config: &RunConfig,
    records: &BTreeMap<String, DirectoryRecord>,
    client: &SuggestionClient,
    logger: &Logger,
) -> bool {
    if !config.learning.learn_languages {
        return false;
    }
    let cache = workspace.learned_languages_path();
    if cache.exists() {
        logger.debug("learning", "language cache present, skipping learning pass");
        return false;
    }

    let seed = languages::seed_map();
    let mut histogram: BTreeMap<String, u64> = BTreeMap::new();
    for record in records.values().filter(|r| r.ignored_reason.is_none()) {
        for (ext, count) in &record.ext_histogram {
            if !seed.contains_key(ext) {
                *histogram.entry(ext.clone()).or_insert(0) += count;
            }
        }
    }
    let candidates = top_candidates(
        histogram.into_iter(),
        config.learning.languages.top_k_candidates,
    );
    if candidates.is_empty() {
        logger.info("learning", "no unmapped extensions to learn languages from");
        return false;
    }

    let payload = json!(candidates
        .iter()
        .map(|(ext, count)| json!({"ext": ext, "count": count}))
        .collect::<Vec<_>>());
    let prompt = prompts::render(
        LANGUAGE_LEARNING_TEMPLATE,
        &[("candidates", &payload.to_string())],
    );

    let Some(value) = client.request_learning(&prompt) else {
        return false;
    };
    let proposed: Vec<LearnedLanguage> = match serde_json::from_value(value) {
        Ok(entries) => entries,
        Err(err) => {
            logger.warn("learning", &format!("unusable language proposals: {err}"));
            return false;
        }
    };

    let min_confidence = config.learning.languages.min_confidence;
    let kept: Vec<LearnedLanguage> = proposed
        .into_iter()
        .filter(|entry| !entry.ext.trim().is_empty() && !entry.language.trim().is_empty())
        .filter(|entry| entry.confidence >= min_confidence)
        .map(|mut entry| {
            entry.ext = entry.ext.trim().to_lowercase();
            entry.language = entry.language.trim().to_lowercase();
            entry
        })
        .collect();

    match save_json(&cache, &kept) {
        Ok(()) => {
            logger.info(
                "learning",
                &format!("cached {} learned language mappings", kept.len()),
            );
            true
        }
        Err(err) => {
            logger.warn(
                "learning",
                &format!("failed to cache language mappings: {err:#}"),
            );
            false
        }
    }
}

/// Occurrence counts of entry names across all non-skipped records, with
/// policy-ignored entries and the workspace directory left out.
fn name_histogram(
    workspace: &Workspace,
    policy: &IgnorePolicy,
    records: &BTreeMap<String, DirectoryRecord>,
) -> BTreeMap<String, u64> {
    let mut histogram: BTreeMap<String, u64> = BTreeMap::new();
    for record in records.values().filter(|r| r.ignored_reason.is_none()) {
        let abs = workspace.resolve_rel(&record.path);
        let Ok(read) = fs::read_dir(&abs) else {
            continue;
        };
        for entry in read.filter_map(|entry| entry.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if record.is_root() && name == Workspace::DIR_NAME {
                continue;
            }
            if policy.should_skip(&entry.path()) {
                continue;
            }
            *histogram.entry(name).or_insert(0) += 1;
        }
    }
    histogram
}

/// Highest-count candidates first, names breaking ties. A cap of 0 keeps
/// everything.
fn top_candidates<I: Iterator<Item = (String, u64)>>(items: I, cap: usize) -> Vec<(String, u64)> {
    let mut candidates: Vec<(String, u64)> = items.collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if cap > 0 {
        candidates.truncate(cap);
    }
    candidates
}
