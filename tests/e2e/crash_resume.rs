//! Interrupted runs resume from the persisted frontier
//!
//! A run stopped by a node limit or a cancellation leaves the frontier,
//! knowledge, and telemetry on disk; the next run picks up the queue
//! without repeating finished work.

use atlas::cancel::CancelToken;
use atlas::frontier::Frontier;
use atlas::knowledge::KnowledgeStore;
use atlas::logging::Logger;
use atlas::telemetry::StopReason;
use atlas::workspace::load_json;

use super::helpers::*;

fn routed_transport() -> Box<RouteTransport> {
    Box::new(
        RouteTransport::new(suggestion("unused", "Unused default.", &[]))
            .route(".", suggestion(".", "Fixture root.", &["src", "web"]))
            .route("src", suggestion("src", "Rust sources.", &["api"]))
            .route("src/api", suggestion("src/api", "API handlers.", &[]))
            .route("web", suggestion("web", "Web frontend.", &[])),
    )
}

/// Test: a max_nodes stop leaves a queue the next run drains to the end
#[test]
fn test_node_limit_then_resume_covers_the_tree() {
    let temp_dir = fixture_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());

    let mut capped = config.clone();
    capped.limits.max_nodes = 2;
    let first = run_with(&workspace, &capped, &policy, routed_transport());

    assert_eq!(first.stopped_by, StopReason::MaxNodes);
    assert_eq!(first.visited, 2);

    {
        let frontier = Frontier::load(&workspace, &Logger::in_memory());
        assert!(frontier.is_visited("."));
        assert!(frontier.is_visited("src"));
        assert!(!frontier.is_visited("src/api"));
        assert_eq!(frontier.queue_len(), 2);
    }
    // The checkpoint names the last node the dead run finished.
    let checkpoint: serde_json::Value =
        load_json(&workspace.checkpoint_path()).expect("checkpoint file");
    assert_eq!(checkpoint["path"], "src");

    let second = run_with(&workspace, &config, &policy, routed_transport());

    assert_eq!(second.stopped_by, StopReason::Exhausted);
    assert_eq!(second.visited, 2);
    assert_ne!(first.run_id, second.run_id);

    let lines = telemetry(&workspace);
    let paths: Vec<&str> = lines.iter().map(|line| line.path.as_str()).collect();
    assert_eq!(paths, vec![".", "src", "src/api", "web"]);
    assert_eq!(lines[0].run_id, first.run_id);
    assert_eq!(lines[1].run_id, first.run_id);
    assert_eq!(lines[2].run_id, second.run_id);
    assert_eq!(lines[3].run_id, second.run_id);

    let frontier = Frontier::load(&workspace, &Logger::in_memory());
    assert_eq!(frontier.visited_len(), 4);
    assert_eq!(frontier.queue_len(), 0);
}

/// Test: knowledge written before the stop survives into the resumed run
#[test]
fn test_knowledge_from_the_first_run_persists() {
    let temp_dir = fixture_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());

    let mut capped = config.clone();
    capped.limits.max_nodes = 1;
    run_with(&workspace, &capped, &policy, routed_transport());

    {
        let knowledge = KnowledgeStore::load(&workspace, &Logger::in_memory());
        assert_eq!(knowledge.node(".").expect("root note").summary, "Fixture root.");
        assert!(knowledge.node("src").is_none());
    }

    run_with(&workspace, &config, &policy, routed_transport());

    let knowledge = KnowledgeStore::load(&workspace, &Logger::in_memory());
    assert_eq!(knowledge.node(".").expect("root note").summary, "Fixture root.");
    assert_eq!(knowledge.node("src").expect("src note").summary, "Rust sources.");
    assert!(knowledge.node("web").is_some());
}

/// Test: cancellation mid-run finishes the in-flight step, then stops
#[test]
fn test_cancellation_persists_the_step_in_flight() {
    let temp_dir = fixture_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());

    let token = CancelToken::new();
    let transport = Box::new(CancellingTransport {
        token: token.clone(),
        reply: suggestion(".", "Root before shutdown.", &["src", "web"]),
    });
    let summary = run_with_cancel(&workspace, &config, &policy, transport, token);

    assert_eq!(summary.stopped_by, StopReason::Cancelled);
    assert_eq!(summary.visited, 1);
    assert_eq!(summary.descended, 2);
    assert_eq!(summary.llm_attempts, 1);

    // The interrupted step is fully durable.
    let lines = telemetry(&workspace);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].path, ".");
    assert!(workspace.analysis_path(".").exists());
    let knowledge = KnowledgeStore::load(&workspace, &Logger::in_memory());
    assert_eq!(
        knowledge.node(".").expect("root note").summary,
        "Root before shutdown."
    );

    let frontier = Frontier::load(&workspace, &Logger::in_memory());
    assert!(frontier.is_visited("."));
    assert_eq!(frontier.queue_len(), 2);
}
