//! Crash-resumable traversal frontier.
//!
//! The queue and visited set are rewritten to `.atlas/frontier.json` after
//! every mutation, so a killed run resumes exactly where it stopped. A
//! corrupt file resets to a fresh frontier instead of failing the run.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::logging::Logger;
use crate::workspace::{load_json, save_json, Workspace};

#[derive(Debug, Serialize, Deserialize)]
struct FrontierState {
    #[serde(default)]
    queue: VecDeque<String>,
    /// Visit order, kept for humans reading the file.
    #[serde(default)]
    visited: Vec<String>,
}

impl FrontierState {
    fn fresh() -> Self {
        Self {
            queue: VecDeque::from(vec![".".to_string()]),
            visited: Vec::new(),
        }
    }
}

pub struct Frontier {
    path: PathBuf,
    state: FrontierState,
    visited: HashSet<String>,
}

impl Frontier {
    /// Load the persisted frontier, or start fresh at the repository root
    /// when the file is missing or unreadable.
    pub fn load(workspace: &Workspace, logger: &Logger) -> Self {
        let path = workspace.frontier_path();
        let state = if path.exists() {
            match load_json::<FrontierState>(&path) {
                Ok(state) => state,
                Err(err) => {
                    logger.warn("frontier", &format!("resetting frontier: {err:#}"));
                    FrontierState::fresh()
                }
            }
        } else {
            FrontierState::fresh()
        };
        let visited = state.visited.iter().cloned().collect();
        Self {
            path,
            state,
            visited,
        }
    }

    /// Drop all progress and queue the root again.
    pub fn reset(&mut self) -> Result<()> {
        self.state = FrontierState::fresh();
        self.visited.clear();
        self.persist()
    }

    /// Take the next node to process. The removal is persisted before the
    /// caller sees the node.
    pub fn pop_left(&mut self) -> Result<Option<String>> {
        let next = self.state.queue.pop_front();
        if next.is_some() {
            self.persist()?;
        }
        Ok(next)
    }

    /// Queue children for depth-first processing: they land at the front in
    /// the given order. Nodes already visited or already queued are skipped.
    pub fn push_many_left(&mut self, rels: &[String]) -> Result<usize> {
        let mut pushed = 0;
        for rel in rels.iter().rev() {
            if self.visited.contains(rel) || self.state.queue.contains(rel) {
                continue;
            }
            self.state.queue.push_front(rel.clone());
            pushed += 1;
        }
        if pushed > 0 {
            self.persist()?;
        }
        Ok(pushed)
    }

    pub fn mark_visited(&mut self, rel: &str) -> Result<()> {
        if self.visited.insert(rel.to_string()) {
            self.state.visited.push(rel.to_string());
            self.persist()?;
        }
        Ok(())
    }

    pub fn is_visited(&self, rel: &str) -> bool {
        self.visited.contains(rel)
    }

    pub fn queue_len(&self) -> usize {
        self.state.queue.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    fn persist(&self) -> Result<()> {
        save_json(&self.path, &self.state)
    }
}
