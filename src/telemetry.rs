//! Per-step telemetry, crash checkpoints, and the end-of-run summary.
//!
//! Telemetry is append-only JSONL so a crash never corrupts earlier lines.
//! The checkpoint pair brackets the suggestion call of each step; after a
//! crash, a `before` without its `after` names the node that was in flight.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::nav::RejectedChild;

/// One line in `.atlas/telemetry.jsonl` per processed frontier node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTelemetry {
    pub run_id: String,
    pub step: u64,
    pub path: String,
    pub depth: usize,
    pub prompt_chars: usize,
    pub response_chars: usize,
    pub latency_ms: u64,
    pub json_valid: bool,
    pub nav_requested: usize,
    pub nav_kept: usize,
    #[serde(default)]
    pub nav_rejected: Vec<RejectedChild>,
    pub fallback_used: bool,
    pub sanitizer_trimmed: bool,
    #[serde(default)]
    pub sanitizer_notes: String,
    /// Languages of the current node after normalization, when a valid
    /// response carried any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm_languages: Option<Vec<String>>,
}

impl StepTelemetry {
    /// Line for a node that was consumed without a suggestion call, e.g. an
    /// ignored leaf or a record that failed to load.
    pub fn skipped(run_id: &str, step: u64, path: &str, depth: usize, note: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            step,
            path: path.to_string(),
            depth,
            prompt_chars: 0,
            response_chars: 0,
            latency_ms: 0,
            json_valid: false,
            nav_requested: 0,
            nav_kept: 0,
            nav_rejected: Vec::new(),
            fallback_used: false,
            sanitizer_trimmed: false,
            sanitizer_notes: note.to_string(),
            norm_languages: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointBefore {
    pub path: String,
    pub depth: usize,
    pub started_at_utc: String,
    pub prompt_chars: usize,
}

impl CheckpointBefore {
    pub fn now(path: &str, depth: usize, prompt_chars: usize) -> Self {
        Self {
            path: path.to_string(),
            depth,
            started_at_utc: timestamp(),
            prompt_chars,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointAfter {
    pub path: String,
    pub depth: usize,
    pub finished_at_utc: String,
    pub json_valid: bool,
    pub nav_kept: usize,
}

impl CheckpointAfter {
    pub fn now(path: &str, depth: usize, json_valid: bool, nav_kept: usize) -> Self {
        Self {
            path: path.to_string(),
            depth,
            finished_at_utc: timestamp(),
            json_valid,
            nav_kept,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Frontier ran dry.
    Exhausted,
    MaxNodes,
    MaxLlmCalls,
    Cancelled,
    Error,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StopReason::Exhausted => "exhausted",
            StopReason::MaxNodes => "max_nodes",
            StopReason::MaxLlmCalls => "max_llm_calls",
            StopReason::Cancelled => "cancelled",
            StopReason::Error => "error",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
    pub max_llm_calls: usize,
    pub nav_cap: usize,
}

/// Written to `.atlas/summary.json` at the end of every run, successful or
/// not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub visited: usize,
    pub descended: usize,
    pub llm_attempts: usize,
    pub duration_ms: u64,
    pub limits: SummaryLimits,
    pub timestamp_utc: String,
    pub model: String,
    pub stopped_by: StopReason,
}

pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
