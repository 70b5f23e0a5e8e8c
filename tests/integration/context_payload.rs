//! Context payload assembly over real snapshot records
//!
//! The payload must carry the record's child sections at the top level,
//! honor every prompt cap, and report both included and total counts so the
//! suggestion side can see what was cut.

use atlas::context::{build_context, render_context_preview};
use atlas::knowledge::KnowledgeStore;
use atlas::logging::Logger;

use super::helpers::*;

/// Test: child sections move out of the record into the payload
#[test]
fn test_payload_separates_child_sections() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);
    let root = record(&workspace, ".");

    let payload = build_context(&root, &[], &workspace.repo_name(), &config.caps.context)
        .expect("Failed to build context");

    let current = payload.current.as_object().expect("current is an object");
    assert!(!current.contains_key("siblings"));
    assert!(!current.contains_key("excluded_children"));
    assert!(!current.contains_key("deterministic_scoring"));
    assert_eq!(current["path"], ".");

    assert_eq!(payload.siblings, root.siblings);
    assert_eq!(payload.excluded_children, root.excluded_children);
    assert_eq!(
        payload.deterministic_scoring.children.len(),
        root.deterministic_scoring.len()
    );
}

/// Test: caps trim every section and the meta reports both counts
#[test]
fn test_caps_trim_sections_and_meta_reports_totals() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);
    let root = record(&workspace, ".");

    let mut caps = config.caps.context;
    caps.max_siblings_in_prompt = 2;
    caps.max_scored_children = 1;
    caps.max_reasons_per_child = 1;

    let payload =
        build_context(&root, &[], &workspace.repo_name(), &caps).expect("Failed to build context");

    assert_eq!(payload.siblings, vec!["docs", "scripts"]);
    // The single kept child is the top-ranked one.
    assert!(payload.deterministic_scoring.children.contains_key("web"));
    assert_eq!(payload.deterministic_scoring.children.len(), 1);
    for score in payload.deterministic_scoring.children.values() {
        assert!(score.reasons.len() <= 1);
    }

    let meta = &payload.context_meta;
    assert_eq!(meta.included.siblings, 2);
    assert_eq!(meta.total.siblings, 4);
    assert_eq!(meta.included.scored_children, 1);
    assert_eq!(meta.total.scored_children, 4);
}

/// Test: the ancestor cap keeps the nearest ancestors in root-to-parent order
#[test]
fn test_ancestor_cap_keeps_nearest() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);
    let api = record(&workspace, "src/api");

    let knowledge = KnowledgeStore::load(&workspace, &Logger::in_memory());
    let chain = knowledge.ancestor_chain("src/api");
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].path, ".");
    assert_eq!(chain[1].path, "src");

    let mut caps = config.caps.context;
    caps.max_ancestors_in_prompt = 1;
    let payload = build_context(&api, &chain, &workspace.repo_name(), &caps)
        .expect("Failed to build context");

    assert_eq!(payload.ancestors.len(), 1);
    assert_eq!(payload.ancestors[0].path, "src");
    assert_eq!(payload.context_meta.total.ancestors, 2);
}

/// Test: the preview digest renders section counts and the score ranking
#[test]
fn test_preview_renders_counts_and_ranking() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);
    let root = record(&workspace, ".");

    let payload = build_context(&root, &[], &workspace.repo_name(), &config.caps.context)
        .expect("Failed to build context");
    let preview = render_context_preview(&root, &payload);

    assert!(preview.starts_with("# Context preview: .\n"));
    assert!(preview.contains("(the root has no ancestors)"));
    assert!(preview.contains("## Siblings (4 of 4)"));
    assert!(preview.contains("## Scored children (4 of 4)"));
    // The package.json marker puts web ahead of src's role-name bonus.
    assert!(preview.contains("1. web  score="));
    assert!(preview.contains("marker:package.json"));
}
