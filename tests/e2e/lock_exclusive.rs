//! One run at a time per workspace
//!
//! The run lock guards every mutating command. A losing acquire reports
//! who holds the lock; `--break-lock` recovers from a run that died
//! without releasing it.

use std::fs;
use std::process;

use atlas::lock::{LockError, LockInfo, RunLock};
use atlas::workspace::load_json;

use super::helpers::*;

/// Test: a second acquire on a live workspace names the current holder
#[test]
fn test_concurrent_acquire_is_refused_with_holder_info() {
    let temp_dir = fixture_repo();
    let (workspace, _config, _policy) = prepared(temp_dir.path());
    let lock_path = workspace.lock_path();

    let _held = RunLock::acquire(&lock_path, "explore", workspace.repo_root(), false)
        .expect("first acquire");
    assert!(lock_path.exists());

    let err = RunLock::acquire(&lock_path, "explore", workspace.repo_root(), false)
        .expect_err("second acquire must fail");
    match err.downcast_ref::<LockError>() {
        Some(LockError::Held(info)) => {
            assert_eq!(info.pid, process::id());
            assert_eq!(info.command, "explore");
        }
        None => panic!("expected LockError::Held, got {err:#}"),
    }
    assert!(err.to_string().contains("--break-lock"));
}

/// Test: dropping the lock handle releases the workspace for the next run
#[test]
fn test_drop_releases_the_workspace() {
    let temp_dir = fixture_repo();
    let (workspace, _config, _policy) = prepared(temp_dir.path());
    let lock_path = workspace.lock_path();

    {
        let _held = RunLock::acquire(&lock_path, "explore", workspace.repo_root(), false)
            .expect("first acquire");
    }
    assert!(!lock_path.exists());

    let _next = RunLock::acquire(&lock_path, "explore", workspace.repo_root(), false)
        .expect("reacquire after release");
    assert!(lock_path.exists());
}

/// Test: --break-lock steals the lock a dead run left behind
#[test]
fn test_break_lock_recovers_from_a_dead_run() {
    let temp_dir = fixture_repo();
    let (workspace, _config, _policy) = prepared(temp_dir.path());
    let lock_path = workspace.lock_path();

    let stale = serde_json::json!({
        "pid": 999_999,
        "host": "defunct-host",
        "started_at_utc": "2024-01-01T00:00:00Z",
        "command": "explore",
        "repo_root": workspace.repo_root().display().to_string()
    });
    fs::write(&lock_path, stale.to_string()).expect("write stale lock");

    let err = RunLock::acquire(&lock_path, "explore", workspace.repo_root(), false)
        .expect_err("stale lock still blocks without --break-lock");
    match err.downcast_ref::<LockError>() {
        Some(LockError::Held(info)) => assert_eq!(info.pid, 999_999),
        None => panic!("expected LockError::Held, got {err:#}"),
    }

    let _stolen = RunLock::acquire(&lock_path, "explore", workspace.repo_root(), true)
        .expect("break-lock acquire");
    let info: LockInfo = load_json(&lock_path).expect("lock body");
    assert_eq!(info.pid, process::id());
    assert_eq!(info.command, "explore");
}

/// Test: the lock never outlives a finished exploration run
#[test]
fn test_lock_is_clear_after_a_full_run() {
    let temp_dir = fixture_repo();
    let (workspace, config, policy) = prepared(temp_dir.path());

    {
        let _held = RunLock::acquire(
            &workspace.lock_path(),
            "explore",
            workspace.repo_root(),
            false,
        )
        .expect("acquire");
        run_with(
            &workspace,
            &config,
            &policy,
            Box::new(RepeatTransport {
                reply: suggestion(".", "Fixture root.", &[]),
            }),
        );
    }

    assert!(!workspace.lock_path().exists());
}
