//! Navigation guardrail.
//!
//! Suggested children are untrusted input. Every name is validated against
//! the parent's record before it may enter the frontier, and an unusable
//! suggestion falls back to the deterministic score ranking so a run never
//! stalls on a bad response.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::DirectoryRecord;
use crate::policy::IgnorePolicy;

pub const REASON_INVALID_NAME: &str = "invalid name";
pub const REASON_NOT_IN_SIBLINGS: &str = "not in siblings";
pub const REASON_EXCLUDED: &str = "excluded by scanner";
pub const REASON_OVER_MAX_DEPTH: &str = "over max_depth";
pub const REASON_IGNORED: &str = "skipped by ignore rules";
pub const REASON_OVER_CAP: &str = "exceeded cap";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectedChild {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct NavDecision {
    /// Child names cleared for descent, in the order they will be queued.
    pub kept: Vec<String>,
    pub rejected: Vec<RejectedChild>,
    /// True when the deterministic ranking supplied `kept`.
    pub fallback_used: bool,
}

/// Validate a suggested descent list for `record`. `requested` of `None`
/// means the suggestion step produced nothing usable; an empty surviving
/// list falls back the same way while keeping the per-name rejections.
pub fn decide(
    requested: Option<&[String]>,
    record: &DirectoryRecord,
    policy: &IgnorePolicy,
    parent_abs: &Path,
    max_depth: usize,
    cap: usize,
) -> NavDecision {
    let Some(requested) = requested else {
        return NavDecision {
            kept: fallback(record, max_depth, cap),
            rejected: Vec::new(),
            fallback_used: true,
        };
    };

    let mut kept: Vec<String> = Vec::new();
    let mut rejected: Vec<RejectedChild> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    let take = effective_cap(cap);

    for name in requested {
        if seen.contains(&name.as_str()) {
            continue;
        }
        seen.push(name);

        match validate(name, record, policy, parent_abs, max_depth) {
            Some(reason) => rejected.push(RejectedChild {
                name: name.clone(),
                reason: reason.to_string(),
            }),
            None if kept.len() < take => kept.push(name.clone()),
            None => rejected.push(RejectedChild {
                name: name.clone(),
                reason: REASON_OVER_CAP.to_string(),
            }),
        }
    }

    if kept.is_empty() {
        return NavDecision {
            kept: fallback(record, max_depth, cap),
            rejected,
            fallback_used: true,
        };
    }

    NavDecision {
        kept,
        rejected,
        fallback_used: false,
    }
}

fn validate(
    name: &str,
    record: &DirectoryRecord,
    policy: &IgnorePolicy,
    parent_abs: &Path,
    max_depth: usize,
) -> Option<&'static str> {
    if !is_valid_name(name) {
        return Some(REASON_INVALID_NAME);
    }
    let is_sibling = record.siblings.iter().any(|s| s == name);
    let is_excluded = record.excluded_children.iter().any(|s| s == name);
    if !is_sibling && !is_excluded {
        return Some(REASON_NOT_IN_SIBLINGS);
    }
    if is_excluded {
        return Some(REASON_EXCLUDED);
    }
    if max_depth != 0 && record.depth + 1 > max_depth {
        return Some(REASON_OVER_MAX_DEPTH);
    }
    if policy.should_skip(&parent_abs.join(name)) {
        return Some(REASON_IGNORED);
    }
    None
}

/// A child name must be a single plain path segment.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.chars().any(char::is_whitespace)
}

/// Deterministic ranking of the eligible children: score descending, name
/// ascending, capped like a suggested list. Children past `max_depth` have
/// no records to process, so the fallback offers nothing there.
fn fallback(record: &DirectoryRecord, max_depth: usize, cap: usize) -> Vec<String> {
    if max_depth != 0 && record.depth + 1 > max_depth {
        return Vec::new();
    }
    let mut ranked: Vec<&str> = record.eligible_children();
    ranked.sort_by(|a, b| {
        let score_a = score_of(record, a);
        let score_b = score_of(record, b);
        score_b.total_cmp(&score_a).then_with(|| a.cmp(b))
    });
    ranked
        .into_iter()
        .take(effective_cap(cap))
        .map(String::from)
        .collect()
}

fn score_of(record: &DirectoryRecord, name: &str) -> f64 {
    record
        .deterministic_scoring
        .get(name)
        .map(|child| child.score)
        .unwrap_or(0.0)
}

fn effective_cap(cap: usize) -> usize {
    if cap == 0 {
        usize::MAX
    } else {
        cap
    }
}
