//! Policy enforcement over parsed suggestion responses.
//!
//! The model's output is treated as untrusted even after it parses. Notes
//! about paths outside the current step are dropped, free-text fields are
//! trimmed to the configured policy caps, language names are normalized
//! against the local extension evidence, and confidence is knocked down
//! when a note was trimmed or carried no evidence at all.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::config::Policies;
use crate::models::{DirectoryRecord, Evidence, Inferred, NodeNote, SuggestionResponse};
use crate::scan::languages;

const EVIDENCE_KIND_POLICY: &str = "policy";
const EVIDENCE_TRIMMED: &str = "trimmed-to-policy-caps";
const EVIDENCE_MISSING: &str = "missing-evidence-punish";
/// Confidence ceiling after any policy trim.
const TRIMMED_CEILING: f64 = 0.7;
/// Confidence ceiling for a note that cited no evidence.
const MISSING_EVIDENCE_CEILING: f64 = 0.4;

pub struct SanitizeOutcome {
    pub response: SuggestionResponse,
    /// True when the current node's note lost content to a policy cap.
    pub trimmed: bool,
    /// `|`-joined tokens describing what happened to the current node.
    pub notes: String,
}

#[derive(Debug, Default, Clone, Copy)]
struct NodeTrim {
    summary: bool,
    languages: bool,
    tags: bool,
    evidence: bool,
}

impl NodeTrim {
    fn any(&self) -> bool {
        self.summary || self.languages || self.tags || self.evidence
    }
}

/// Sanitize one parsed response for the step at `record`. `ancestors` are
/// the repo-relative ancestor paths of the current node; notes may only
/// target the root, an ancestor, or the current node itself.
pub fn sanitize_response(
    response: &SuggestionResponse,
    record: &DirectoryRecord,
    ancestors: &[String],
    lang_map: &BTreeMap<String, String>,
    policies: &Policies,
) -> SanitizeOutcome {
    let mut allowed: BTreeSet<&str> = BTreeSet::new();
    allowed.insert(".");
    for ancestor in ancestors {
        allowed.insert(ancestor);
    }
    allowed.insert(&record.path);

    let aggregate_rank: BTreeMap<String, usize> =
        languages::aggregate_languages(&record.ext_histogram, lang_map)
            .into_iter()
            .enumerate()
            .map(|(rank, (language, _))| (language, rank))
            .collect();

    let mut nodes: BTreeMap<String, NodeNote> = BTreeMap::new();
    let mut dropped_any = false;
    let mut current_trim = NodeTrim::default();
    let mut current_missing = false;

    for (path, note) in &response.inferred.nodes {
        if !allowed.contains(path.as_str()) {
            dropped_any = true;
            continue;
        }
        let (sanitized, trim) = sanitize_node(note, &aggregate_rank, policies);
        if path == &record.path {
            current_trim = trim;
            current_missing = note.evidence.is_empty();
        }
        nodes.insert(path.clone(), sanitized);
    }

    let high_level_components = response
        .inferred
        .high_level_components
        .iter()
        .map(|component| {
            let mut component = component.clone();
            component.confidence = component.confidence.clamp(0.0, 1.0);
            component
        })
        .collect();

    let mut nav = response.nav.clone();
    // Single-level descent is an engine invariant, not a model choice.
    nav.descend_one_level_only = true;

    let mut notes: Vec<&str> = Vec::new();
    if current_trim.summary {
        notes.push("summary-trimmed");
    }
    if current_trim.languages {
        notes.push("languages-capped");
    }
    if current_trim.tags {
        notes.push("tags-capped");
    }
    if current_trim.evidence {
        notes.push("evidence-capped");
    }
    if current_missing {
        notes.push("missing-evidence");
    }
    if dropped_any {
        notes.push("unknown-paths-dropped");
    }

    SanitizeOutcome {
        response: SuggestionResponse {
            inferred: Inferred {
                high_level_components,
                nodes,
            },
            nav,
            open_questions_ranked: response.open_questions_ranked.clone(),
        },
        trimmed: current_trim.any(),
        notes: notes.join("|"),
    }
}

fn sanitize_node(
    note: &NodeNote,
    aggregate_rank: &BTreeMap<String, usize>,
    policies: &Policies,
) -> (NodeNote, NodeTrim) {
    let (summary, summary_trimmed) = trim_summary(&note.summary, policies);

    let mut seen_languages: Vec<String> = Vec::new();
    for raw in &note.languages {
        let canon = canon_language(raw);
        if !canon.is_empty() && !seen_languages.contains(&canon) {
            seen_languages.push(canon);
        }
    }
    seen_languages.sort_by(|a, b| {
        let rank_a = aggregate_rank.get(a).copied().unwrap_or(10_000);
        let rank_b = aggregate_rank.get(b).copied().unwrap_or(10_000);
        rank_a.cmp(&rank_b).then_with(|| a.cmp(b))
    });
    let mut languages = seen_languages;
    let languages_trimmed = cap_list(&mut languages, policies.max_languages_per_node);

    let mut tags: Vec<String> = Vec::new();
    for raw in &note.tags {
        let lower = raw.trim().to_lowercase();
        if !lower.is_empty() && !tags.contains(&lower) {
            tags.push(lower);
        }
    }
    let tags_trimmed = cap_list(&mut tags, policies.max_tags_per_node);

    let mut evidence: Vec<Evidence> = Vec::new();
    for item in &note.evidence {
        if !evidence.contains(item) {
            evidence.push(item.clone());
        }
    }
    let evidence_trimmed = cap_list(&mut evidence, policies.max_evidence_per_node);

    let trim = NodeTrim {
        summary: summary_trimmed,
        languages: languages_trimmed,
        tags: tags_trimmed,
        evidence: evidence_trimmed,
    };

    let mut confidence = note.confidence.clamp(0.0, 1.0);
    if trim.any() {
        confidence = confidence.min(TRIMMED_CEILING);
        evidence.push(Evidence::new(EVIDENCE_KIND_POLICY, EVIDENCE_TRIMMED));
    }
    if note.evidence.is_empty() {
        confidence = confidence.min(MISSING_EVIDENCE_CEILING);
        evidence.push(Evidence::new(EVIDENCE_KIND_POLICY, EVIDENCE_MISSING));
    }

    (
        NodeNote {
            summary,
            languages,
            tags,
            evidence,
            confidence,
        },
        trim,
    )
}

/// Sentence cap first, then the character cap with a word-boundary cut.
fn trim_summary(summary: &str, policies: &Policies) -> (String, bool) {
    let input = summary.trim();
    let mut trimmed = false;

    let mut out = if policies.max_summary_sentences != 0 {
        let sentences = split_sentences(input);
        if sentences.len() > policies.max_summary_sentences {
            trimmed = true;
            sentences[..policies.max_summary_sentences].join(" ")
        } else {
            input.to_string()
        }
    } else {
        input.to_string()
    };

    let max_chars = policies.max_summary_chars;
    if max_chars != 0 && out.chars().count() > max_chars {
        out = cut_on_word(&out, max_chars);
        out.push_str("...");
        trimmed = true;
    }

    (out, trimmed)
}

fn split_sentences(text: &str) -> Vec<&str> {
    let boundary = Regex::new(r"[.!?]\s+").expect("Invalid regex pattern");
    let mut sentences = Vec::new();
    let mut last = 0;
    for found in boundary.find_iter(text) {
        // The terminator char is ASCII, keep it with its sentence.
        let end = found.start() + 1;
        let sentence = text[last..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        last = found.end();
    }
    if last < text.len() {
        let tail = text[last..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }
    sentences
}

fn cut_on_word(text: &str, max_chars: usize) -> String {
    let hard: String = text.chars().take(max_chars).collect();
    match hard.rfind(' ') {
        Some(idx) if idx > 0 => hard[..idx].trim_end().to_string(),
        _ => hard,
    }
}

/// Fold common aliases into one canonical lowercase language name.
fn canon_language(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    match lower.as_str() {
        "js" | "node" | "nodejs" => "javascript".to_string(),
        "ts" => "typescript".to_string(),
        "cpp" | "c plus plus" => "c++".to_string(),
        "objective c" => "objective-c".to_string(),
        "bash" | "zsh" => "shell".to_string(),
        "py" => "python".to_string(),
        "golang" => "go".to_string(),
        _ => lower,
    }
}

fn cap_list<T>(list: &mut Vec<T>, cap: usize) -> bool {
    if cap != 0 && list.len() > cap {
        list.truncate(cap);
        true
    } else {
        false
    }
}
