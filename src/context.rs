//! Context payload assembly.
//!
//! One payload per step, built only from stored state: the current record,
//! ancestor notes from the knowledge store, and the deterministic scores.
//! Every list is capped, and `context_meta` reports what the caps dropped
//! so the model knows the view is partial.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::ContextCaps;
use crate::knowledge::AncestorNote;
use crate::models::{ChildScore, DirectoryRecord};
use crate::scan::scoring;

#[derive(Debug, Serialize)]
pub struct ContextPayload {
    pub repo: String,
    /// Nearest ancestors, root-to-parent order preserved.
    pub ancestors: Vec<AncestorNote>,
    /// The record itself, minus the child lists surfaced as top-level
    /// sections below.
    pub current: serde_json::Value,
    pub siblings: Vec<String>,
    pub excluded_children: Vec<String>,
    pub deterministic_scoring: ScoringEnvelope,
    pub context_meta: ContextMeta,
}

#[derive(Debug, Serialize)]
pub struct ScoringEnvelope {
    pub children: BTreeMap<String, ChildScore>,
}

#[derive(Debug, Serialize)]
pub struct ContextMeta {
    pub included: SectionCounts,
    pub total: SectionCounts,
    pub caps: ContextCaps,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SectionCounts {
    pub ancestors: usize,
    pub siblings: usize,
    pub excluded_children: usize,
    pub scored_children: usize,
}

/// Assemble the payload for one directory. Caps of 0 mean unlimited; when
/// the ancestor cap bites, the nearest ancestors win over the root end of
/// the chain.
pub fn build_context(
    record: &DirectoryRecord,
    ancestors: &[AncestorNote],
    repo: &str,
    caps: &ContextCaps,
) -> Result<ContextPayload> {
    let mut current =
        serde_json::to_value(record).context("Failed to serialize directory record")?;
    if let Some(object) = current.as_object_mut() {
        object.remove("siblings");
        object.remove("excluded_children");
        object.remove("deterministic_scoring");
    }

    let total = SectionCounts {
        ancestors: ancestors.len(),
        siblings: record.siblings.len(),
        excluded_children: record.excluded_children.len(),
        scored_children: record.deterministic_scoring.len(),
    };

    let kept_ancestors = nearest(ancestors, caps.max_ancestors_in_prompt);
    let siblings = head(&record.siblings, caps.max_siblings_in_prompt);
    let excluded_children = head(&record.excluded_children, caps.max_siblings_in_prompt);
    let children = top_scored(
        &record.deterministic_scoring,
        caps.max_scored_children,
        caps.max_reasons_per_child,
    );

    let included = SectionCounts {
        ancestors: kept_ancestors.len(),
        siblings: siblings.len(),
        excluded_children: excluded_children.len(),
        scored_children: children.len(),
    };

    Ok(ContextPayload {
        repo: repo.to_string(),
        ancestors: kept_ancestors,
        current,
        siblings,
        excluded_children,
        deterministic_scoring: ScoringEnvelope { children },
        context_meta: ContextMeta {
            included,
            total,
            caps: *caps,
        },
    })
}

/// Plain-text digest of a payload for `atlas inspect`.
pub fn render_context_preview(record: &DirectoryRecord, payload: &ContextPayload) -> String {
    let meta = &payload.context_meta;
    let mut out = String::new();

    out.push_str(&format!("# Context preview: {}\n\n", record.path));
    out.push_str(&format!("- repo: {}\n", payload.repo));
    out.push_str(&format!("- depth: {}\n", record.depth));
    out.push_str(&format!(
        "- entries: {} files, {} dirs\n",
        record.counts.files, record.counts.dirs
    ));
    out.push_str(&format!("- markers: {}\n", joined_or(&record.markers, "none")));

    out.push_str(&format!(
        "\n## Ancestors ({} of {})\n\n",
        meta.included.ancestors, meta.total.ancestors
    ));
    if payload.ancestors.is_empty() {
        out.push_str("(the root has no ancestors)\n");
    } else {
        for note in &payload.ancestors {
            let summary = if note.summary.is_empty() {
                "(no notes yet)"
            } else {
                note.summary.as_str()
            };
            out.push_str(&format!("- {}: {}\n", note.path, summary));
        }
    }

    out.push_str(&format!(
        "\n## Siblings ({} of {})\n\n{}\n",
        meta.included.siblings,
        meta.total.siblings,
        joined_or(&payload.siblings, "(none)")
    ));
    out.push_str(&format!(
        "\n## Excluded children ({} of {})\n\n{}\n",
        meta.included.excluded_children,
        meta.total.excluded_children,
        joined_or(&payload.excluded_children, "(none)")
    ));

    out.push_str(&format!(
        "\n## Scored children ({} of {})\n\n",
        meta.included.scored_children, meta.total.scored_children
    ));
    let ranked = scoring::rank(&payload.deterministic_scoring.children);
    if ranked.is_empty() {
        out.push_str("(none)\n");
    } else {
        for (position, (name, score)) in ranked.iter().enumerate() {
            out.push_str(&format!(
                "{}. {}  score={:.3}  {}\n",
                position + 1,
                name,
                score.score,
                joined_or(&score.reasons, "no signals")
            ));
        }
    }

    out
}

fn joined_or(values: &[String], fallback: &str) -> String {
    if values.is_empty() {
        fallback.to_string()
    } else {
        values.join(", ")
    }
}

fn nearest(notes: &[AncestorNote], cap: usize) -> Vec<AncestorNote> {
    if cap == 0 || notes.len() <= cap {
        return notes.to_vec();
    }
    notes[notes.len() - cap..].to_vec()
}

fn head(values: &[String], cap: usize) -> Vec<String> {
    if cap == 0 || values.len() <= cap {
        return values.to_vec();
    }
    values[..cap].to_vec()
}

fn top_scored(
    scores: &BTreeMap<String, ChildScore>,
    max_children: usize,
    max_reasons: usize,
) -> BTreeMap<String, ChildScore> {
    let take = if max_children == 0 {
        scores.len()
    } else {
        max_children
    };
    scoring::rank(scores)
        .into_iter()
        .take(take)
        .map(|(name, score)| {
            let mut score = score.clone();
            if max_reasons != 0 && score.reasons.len() > max_reasons {
                score.reasons.truncate(max_reasons);
            }
            (name.to_string(), score)
        })
        .collect()
}
