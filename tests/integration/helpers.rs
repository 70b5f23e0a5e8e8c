//! Shared test helpers: a small polyglot fixture repository and a fully
//! prepared workspace over it.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use atlas::config::RunConfig;
use atlas::logging::Logger;
use atlas::models::DirectoryRecord;
use atlas::policy::IgnorePolicy;
use atlas::scan::languages::seed_map;
use atlas::scan::markers::seed_rules;
use atlas::scan::snapshot::Snapshotter;
use atlas::workspace::{load_json, Workspace};

/// Test helper: lay out a small polyglot repository.
///
/// `node_modules/` and `target/` are present on disk and excluded by the
/// default ignore template; everything else is visible to the scanner.
pub fn polyglot_repo() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let root = temp_dir.path();

    write(root, "README.md", "# Fixture\n");
    write(root, "Cargo.toml", "[package]\nname = \"fixture\"\n");
    write(root, "src/main.rs", "fn main() {}\n");
    write(root, "src/util.rs", "pub fn noop() {}\n");
    write(root, "src/api/handlers.rs", "pub fn handle() {}\n");
    write(root, "docs/guide.md", "# Guide\n");
    write(root, "web/package.json", "{\"name\": \"web\"}\n");
    write(root, "web/index.js", "console.log(1);\n");
    write(root, "scripts/run.sh", "#!/bin/sh\n");
    write(root, "node_modules/lodash.js", "module.exports = {};\n");
    write(root, "target/fixture.o", "\n");

    temp_dir
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(path, content).expect("Failed to write fixture file");
}

/// Test helper: initialize the workspace and load its default config and
/// ignore policy.
pub fn prepared(root: &Path) -> (Workspace, RunConfig, IgnorePolicy) {
    let workspace = Workspace::new(root).expect("Failed to open workspace");
    workspace
        .initialize()
        .expect("Failed to initialize workspace");
    let config = workspace.load_config().expect("Failed to load config");
    let policy = IgnorePolicy::load(
        workspace.repo_root(),
        &workspace.ignore_path(),
        &workspace.allow_path(),
        config.policies.skip_symlinks,
    )
    .expect("Failed to load ignore policy");
    (workspace, config, policy)
}

/// Test helper: run the three snapshot passes (scan, markers, scoring).
pub fn snapshot_all(workspace: &Workspace, config: &RunConfig, policy: &IgnorePolicy) {
    let snapshotter = Snapshotter::new(workspace, policy, config, Logger::in_memory());
    snapshotter.scan().expect("Failed to scan");
    snapshotter
        .enrich_markers(&seed_rules())
        .expect("Failed to enrich markers");
    snapshotter
        .enrich_scoring(&seed_rules(), &seed_map())
        .expect("Failed to enrich scoring");
}

/// Test helper: read one directory record back from the snapshot.
pub fn record(workspace: &Workspace, rel: &str) -> DirectoryRecord {
    load_json(&workspace.record_path(rel)).expect("Failed to load record")
}
