//! Snapshot invariants across scans and enrichment passes
//!
//! Every listed child must be accounted for (a full record, or a stub with a
//! reason), rescans of an unchanged tree must converge, and the fingerprint
//! must move exactly when a directory's own entry list moves.

use std::fs;

use atlas::logging::Logger;
use atlas::scan::languages::seed_map;
use atlas::scan::markers::seed_rules;
use atlas::scan::snapshot::Snapshotter;
use atlas::workspace::join_rel;

use super::helpers::*;

/// Test: every kept directory has a full record with the right shape
#[test]
fn test_scan_records_every_kept_directory() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);

    for rel in [".", "docs", "scripts", "src", "src/api", "web"] {
        let rec = record(&workspace, rel);
        assert_eq!(rec.path, rel);
        assert!(rec.ignored_reason.is_none(), "{rel} should not be ignored");
    }

    let root = record(&workspace, ".");
    assert_eq!(root.depth, 0);
    assert_eq!(root.counts.files, 2);
    assert_eq!(root.counts.dirs, 7);
    assert_eq!(root.siblings, vec!["docs", "scripts", "src", "web"]);
    assert_eq!(
        root.excluded_children,
        vec![".atlas", "node_modules", "target"]
    );
}

/// Test: excluded directories get stub records carrying the skip reason
#[test]
fn test_excluded_directories_get_stub_records() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);

    let workspace_stub = record(&workspace, ".atlas");
    assert_eq!(
        workspace_stub.ignored_reason.as_deref(),
        Some("workspace directory")
    );

    for rel in ["node_modules", "target"] {
        let stub = record(&workspace, rel);
        assert_eq!(stub.depth, 1);
        let reason = stub.ignored_reason.expect("stub must carry a reason");
        assert!(
            reason.contains("matched .atlas/ignore"),
            "unexpected reason for {rel}: {reason}"
        );
        assert!(stub.siblings.is_empty());
    }
}

/// Test: sibling and excluded lists always point at existing records
#[test]
fn test_child_lists_agree_with_stored_records() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);

    let snapshotter = Snapshotter::new(&workspace, &policy, &config, Logger::in_memory());
    let records = snapshotter
        .load_all_records()
        .expect("Failed to load records");

    for (rel, rec) in &records {
        if rec.ignored_reason.is_some() {
            continue;
        }
        for name in &rec.siblings {
            let child = &records[&join_rel(rel, name)];
            assert!(child.ignored_reason.is_none());
        }
        for name in &rec.excluded_children {
            let child = &records[&join_rel(rel, name)];
            assert!(child.ignored_reason.is_some());
        }
    }
}

/// Test: a second full pass over an unchanged tree produces identical records
#[test]
fn test_rescan_of_unchanged_tree_converges() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);

    let snapshotter = Snapshotter::new(&workspace, &policy, &config, Logger::in_memory());
    let first = snapshotter
        .load_all_records()
        .expect("Failed to load records");

    snapshot_all(&workspace, &config, &policy);
    let second = snapshotter
        .load_all_records()
        .expect("Failed to load records");

    assert_eq!(
        serde_json::to_value(&first).expect("serialize"),
        serde_json::to_value(&second).expect("serialize")
    );

    // With nothing changed, the scoring pass rewrites no records.
    let updated = snapshotter
        .enrich_scoring(&seed_rules(), &seed_map())
        .expect("Failed to enrich scoring");
    assert_eq!(updated, 0);
}

/// Test: adding a file moves its directory's fingerprint, not the root's
#[test]
fn test_fingerprint_tracks_entry_changes() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);

    let src_before = record(&workspace, "src").fingerprint;
    let root_before = record(&workspace, ".").fingerprint;

    fs::write(temp_dir.path().join("src/extra.rs"), "pub fn extra() {}\n")
        .expect("Failed to write file");
    snapshot_all(&workspace, &config, &policy);

    let src_after = record(&workspace, "src").fingerprint;
    let root_after = record(&workspace, ".").fingerprint;

    assert_ne!(src_before.name_hash, src_after.name_hash);
    assert_eq!(src_after.total_entries, src_before.total_entries + 1);
    // The root's own entry list did not change.
    assert_eq!(root_before.name_hash, root_after.name_hash);
}

/// Test: max_depth bounds which directories get records, not which are listed
#[test]
fn test_max_depth_stops_recording_not_listing() {
    let temp_dir = polyglot_repo();
    let (workspace, mut config, policy) = prepared(temp_dir.path());
    config.limits.max_depth = 1;

    let snapshotter = Snapshotter::new(&workspace, &policy, &config, Logger::in_memory());
    snapshotter.scan().expect("Failed to scan");

    let src = record(&workspace, "src");
    assert_eq!(src.siblings, vec!["api"]);
    assert!(!workspace.record_path("src/api").exists());
}

/// Test: marker enrichment fills markers and reorders samples
#[test]
fn test_marker_enrichment_surfaces_marker_files_first() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);

    let root = record(&workspace, ".");
    assert_eq!(root.markers, vec!["Cargo.toml"]);
    assert_eq!(root.samples.files, vec!["Cargo.toml", "README.md"]);

    let web = record(&workspace, "web");
    assert_eq!(web.markers, vec!["package.json"]);
    assert_eq!(web.samples.files[0], "package.json");
}

/// Test: scoring covers exactly the eligible children
#[test]
fn test_scoring_covers_eligible_children_only() {
    let temp_dir = polyglot_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());
    snapshot_all(&workspace, &config, &policy);

    let root = record(&workspace, ".");
    let scored: Vec<&String> = root.deterministic_scoring.keys().collect();
    assert_eq!(scored, vec!["docs", "scripts", "src", "web"]);

    let src_score = &root.deterministic_scoring["src"];
    assert!(src_score
        .reasons
        .iter()
        .any(|r| r.starts_with("lang:rust(")));
    assert!(src_score.reasons.contains(&"name:src".to_string()));

    let web_score = &root.deterministic_scoring["web"];
    assert!(web_score
        .reasons
        .contains(&"marker:package.json".to_string()));
    // The marker outweighs src's role-name bonus.
    assert!(web_score.score > src_score.score);
}
