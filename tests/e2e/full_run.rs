//! Full exploration runs with a cooperative scripted suggester
//!
//! The transport answers per path, so the run follows exactly the suggested
//! branches and leaves the rest of the tree untouched.

use atlas::frontier::Frontier;
use atlas::knowledge::KnowledgeStore;
use atlas::logging::Logger;
use atlas::telemetry::{RunSummary, StopReason};
use atlas::workspace::load_json;

use super::helpers::*;

fn root_reply() -> String {
    serde_json::json!({
        "inferred": {
            "high_level_components": [{
                "name": "core",
                "role": "application code",
                "dirs": ["src"],
                "evidence": [{"type": "marker", "value": "Cargo.toml"}],
                "confidence": 0.8
            }],
            "nodes": {
                ".": {
                    "summary": "A small polyglot fixture crate.",
                    "languages": ["rust", "javascript"],
                    "tags": ["fixture"],
                    "evidence": [{"type": "marker", "value": "Cargo.toml"}],
                    "confidence": 0.9
                }
            }
        },
        "nav": {
            "descend_into": ["src", "web"],
            "descend_one_level_only": true,
            "reasons": ["main code", "frontend"]
        },
        "open_questions_ranked": ["what builds the web assets?"]
    })
    .to_string()
}

fn routed_transport() -> Box<RouteTransport> {
    Box::new(
        RouteTransport::new(suggestion("unused", "Unused default.", &[]))
            .route(".", root_reply())
            .route("src", suggestion("src", "Rust sources.", &["api"]))
            .route("src/api", suggestion("src/api", "API handlers.", &[]))
            .route("web", suggestion("web", "Web frontend.", &[])),
    )
}

/// Test: the run visits exactly the suggested branches, in queue order
#[test]
fn test_routed_run_explores_suggested_paths() {
    let temp_dir = fixture_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());

    let summary = run_with(&workspace, &config, &policy, routed_transport());

    assert_eq!(summary.stopped_by, StopReason::Exhausted);
    assert_eq!(summary.visited, 4);
    assert_eq!(summary.descended, 3);
    assert_eq!(summary.llm_attempts, 4);

    let lines = telemetry(&workspace);
    let paths: Vec<&str> = lines.iter().map(|line| line.path.as_str()).collect();
    assert_eq!(paths, vec![".", "src", "src/api", "web"]);

    let root_line = &lines[0];
    assert!(root_line.json_valid);
    assert!(!root_line.fallback_used);
    assert_eq!(root_line.nav_requested, 2);
    assert_eq!(root_line.nav_kept, 2);
    assert!(root_line.nav_rejected.is_empty());
    assert!(!root_line.sanitizer_trimmed);
    // The local histogram has no evidence for either language, so the
    // sanitizer falls back to name order.
    assert_eq!(
        root_line.norm_languages.as_deref(),
        Some(["javascript".to_string(), "rust".to_string()].as_slice())
    );

    // Leaves fall back to the (empty) deterministic ranking.
    assert!(lines[2].fallback_used);
    assert_eq!(lines[2].nav_kept, 0);

    let frontier = Frontier::load(&workspace, &Logger::in_memory());
    for rel in [".", "src", "src/api", "web"] {
        assert!(frontier.is_visited(rel), "{rel} should be visited");
    }
    assert!(!frontier.is_visited("docs"));
    assert!(!frontier.is_visited("scripts"));
}

/// Test: knowledge, analysis, checkpoint, and summary artifacts accumulate
#[test]
fn test_artifacts_accumulate_across_the_run() {
    let temp_dir = fixture_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());

    let summary = run_with(&workspace, &config, &policy, routed_transport());

    let knowledge = KnowledgeStore::load(&workspace, &Logger::in_memory());
    let root = knowledge.node(".").expect("root note");
    assert_eq!(root.summary, "A small polyglot fixture crate.");
    assert!(knowledge.node("src").is_some());
    assert!(knowledge.node("src/api").is_some());
    assert!(knowledge.node("web").is_some());
    assert!(knowledge.node("docs").is_none());

    let components = knowledge.components();
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].name, "core");
    assert_eq!(components[0].dirs, vec!["src".to_string()]);

    for rel in [".", "src", "src/api", "web"] {
        let analysis: serde_json::Value =
            load_json(&workspace.analysis_path(rel)).expect("analysis file");
        assert!(analysis.get("inferred").is_some(), "{rel} analysis shape");
        assert_eq!(analysis["nav"]["descend_one_level_only"], true);
    }

    let stored: RunSummary = load_json(&workspace.summary_path()).expect("summary file");
    assert_eq!(stored.run_id, summary.run_id);
    for line in telemetry(&workspace) {
        assert_eq!(line.run_id, summary.run_id);
    }

    let checkpoint: serde_json::Value =
        load_json(&workspace.checkpoint_path()).expect("checkpoint file");
    assert_eq!(checkpoint["path"], "web");
    assert!(checkpoint.get("finished_at_utc").is_some());
}
