//! Single-writer run lock.
//!
//! `explore` takes an exclusive lock on the workspace before mutating any
//! state. The lock file is created with `create_new`, so two concurrent
//! runs cannot both win, and its JSON body identifies the holder for the
//! error message a losing run prints.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::workspace::load_json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub host: String,
    pub started_at_utc: String,
    pub command: String,
    pub repo_root: String,
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error(
        "run lock already held (pid={}, host={}, started={}). Use --break-lock to override.",
        .0.pid,
        .0.host,
        .0.started_at_utc
    )]
    Held(LockInfo),
}

/// Held for the lifetime of a run; the lock file is removed on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock, or fail with [`LockError::Held`] naming the current
    /// holder. `break_lock` removes a leftover lock first, for the case
    /// where a previous run died without cleaning up.
    pub fn acquire(path: &Path, command: &str, repo_root: &Path, break_lock: bool) -> Result<Self> {
        if break_lock && path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to break lock {}", path.display()))?;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let info = LockInfo {
            pid: process::id(),
            host: hostname(),
            started_at_utc: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            command: command.to_string(),
            repo_root: repo_root.display().to_string(),
        };

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                let body = serde_json::to_string_pretty(&info)
                    .context("Failed to serialize lock info")?;
                file.write_all(body.as_bytes())
                    .and_then(|_| file.write_all(b"\n"))
                    .with_context(|| format!("Failed to write lock {}", path.display()))?;
                Ok(Self {
                    path: path.to_path_buf(),
                })
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(LockError::Held(read_holder(path)).into())
            }
            Err(err) => Err(err)
                .with_context(|| format!("Failed to create lock file {}", path.display())),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Holder info from an existing lock file. An unparseable file still
/// produces a usable error, just without real holder details.
fn read_holder(path: &Path) -> LockInfo {
    load_json(path).unwrap_or_else(|_| LockInfo {
        pid: 0,
        host: "unknown".to_string(),
        started_at_utc: "unknown".to_string(),
        command: String::new(),
        repo_root: String::new(),
    })
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}
