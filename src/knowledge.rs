//! Accumulated knowledge about the repository.
//!
//! Two JSON files under `.atlas/knowledge/` survive across runs: per-node
//! notes keyed by repo-relative path, and the high-level component list.
//! Node notes are replaced wholesale on re-visit; components merge so
//! evidence gathered in earlier runs is never lost.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::logging::Logger;
use crate::models::{Evidence, HighLevelComponent, SuggestionResponse};
use crate::workspace::{load_json, save_json, Workspace};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub path: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub confidence: f64,
    /// Step counter of the run that last touched this node.
    #[serde(default)]
    pub last_updated_step: u64,
}

/// One ancestor entry handed to the context builder. Unvisited ancestors
/// appear with empty notes so the chain always reflects the real path.
#[derive(Debug, Clone, Serialize)]
pub struct AncestorNote {
    pub path: String,
    pub summary: String,
    pub tags: Vec<String>,
}

pub struct KnowledgeStore {
    nodes_path: PathBuf,
    components_path: PathBuf,
    nodes: BTreeMap<String, KnowledgeNode>,
    components: Vec<HighLevelComponent>,
}

impl KnowledgeStore {
    /// Load both store files. Missing files start empty; corrupt files are
    /// logged and start empty rather than aborting a run.
    pub fn load(workspace: &Workspace, logger: &Logger) -> Self {
        let nodes_path = workspace.nodes_path();
        let components_path = workspace.components_path();

        let nodes = if nodes_path.exists() {
            match load_json(&nodes_path) {
                Ok(nodes) => nodes,
                Err(err) => {
                    logger.warn("knowledge", &format!("resetting node store: {err:#}"));
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        let components = if components_path.exists() {
            match load_json(&components_path) {
                Ok(components) => components,
                Err(err) => {
                    logger.warn("knowledge", &format!("resetting component store: {err:#}"));
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Self {
            nodes_path,
            components_path,
            nodes,
            components,
        }
    }

    /// Fold a validated suggestion into the store and return how many node
    /// notes were written. Notes replace any previous note for the same
    /// path; components merge by `(name, dirs)` identity.
    pub fn merge_response(&mut self, response: &SuggestionResponse, step: u64) -> usize {
        let mut updated = 0;

        for (path, note) in &response.inferred.nodes {
            let node = KnowledgeNode {
                path: path.clone(),
                summary: note.summary.trim().to_string(),
                languages: dedupe_lower(&note.languages),
                tags: dedupe_lower(&note.tags),
                evidence: dedupe_evidence(&note.evidence),
                confidence: note.confidence.clamp(0.0, 1.0),
                last_updated_step: step,
            };
            self.nodes.insert(path.clone(), node);
            updated += 1;
        }

        for component in &response.inferred.high_level_components {
            self.merge_component(component);
        }

        updated
    }

    fn merge_component(&mut self, incoming: &HighLevelComponent) {
        let identity = incoming.identity();
        match self
            .components
            .iter_mut()
            .find(|existing| existing.identity() == identity)
        {
            Some(existing) => {
                existing.role = incoming.role.clone();
                let mut seen: HashSet<Evidence> = existing.evidence.iter().cloned().collect();
                for evidence in &incoming.evidence {
                    if seen.insert(evidence.clone()) {
                        existing.evidence.push(evidence.clone());
                    }
                }
                existing.confidence = existing
                    .confidence
                    .max(incoming.confidence.clamp(0.0, 1.0));
            }
            None => {
                let mut component = incoming.clone();
                component.confidence = component.confidence.clamp(0.0, 1.0);
                component.evidence = dedupe_evidence(&component.evidence);
                self.components.push(component);
            }
        }
    }

    /// Notes for every ancestor of `rel`, root first, parent last. The
    /// current node itself is not part of the chain.
    pub fn ancestor_chain(&self, rel: &str) -> Vec<AncestorNote> {
        ancestor_rels(rel)
            .into_iter()
            .map(|path| match self.nodes.get(&path) {
                Some(node) => AncestorNote {
                    path,
                    summary: node.summary.clone(),
                    tags: node.tags.clone(),
                },
                None => AncestorNote {
                    path,
                    summary: String::new(),
                    tags: Vec::new(),
                },
            })
            .collect()
    }

    pub fn node(&self, rel: &str) -> Option<&KnowledgeNode> {
        self.nodes.get(rel)
    }

    pub fn nodes(&self) -> &BTreeMap<String, KnowledgeNode> {
        &self.nodes
    }

    pub fn components(&self) -> &[HighLevelComponent] {
        &self.components
    }

    pub fn persist(&self) -> Result<()> {
        save_json(&self.nodes_path, &self.nodes)?;
        save_json(&self.components_path, &self.components)?;
        Ok(())
    }
}

/// Ancestor paths of `rel`, root first. The root itself has none.
pub fn ancestor_rels(rel: &str) -> Vec<String> {
    if rel == "." {
        return Vec::new();
    }
    let mut chain = vec![".".to_string()];
    let parts: Vec<&str> = rel.split('/').collect();
    let mut prefix = String::new();
    for part in &parts[..parts.len() - 1] {
        if prefix.is_empty() {
            prefix.push_str(part);
        } else {
            prefix.push('/');
            prefix.push_str(part);
        }
        chain.push(prefix.clone());
    }
    chain
}

fn dedupe_lower(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let lower = value.trim().to_lowercase();
        if !lower.is_empty() && !out.contains(&lower) {
            out.push(lower);
        }
    }
    out
}

fn dedupe_evidence(values: &[Evidence]) -> Vec<Evidence> {
    let mut seen: HashSet<Evidence> = HashSet::new();
    let mut out: Vec<Evidence> = Vec::new();
    for evidence in values {
        if seen.insert(evidence.clone()) {
            out.push(evidence.clone());
        }
    }
    out
}
