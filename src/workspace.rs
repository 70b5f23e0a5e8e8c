//! The `.atlas/` workspace: path layout, initialization, and the atomic
//! JSON persistence helpers every store in the crate goes through.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::{RunConfig, DEFAULT_CONFIG_TEMPLATE};

/// Failures the CLI maps to exit code 2.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("repository path {} does not exist or is not a directory", path.display())]
    RepoNotFound { path: PathBuf },

    #[error("configuration missing at {}: run 'atlas init' first", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("no directory record for '{rel}': run 'atlas explore --refresh' first")]
    RecordMissing { rel: String },
}

const DEFAULT_IGNORE_TEMPLATE: &str = "\
# Directories atlas never descends into (gitignore-style patterns).
.git/
.atlas/
node_modules/
target/
dist/
build/
.venv/
venv/
__pycache__/
.idea/
.vscode/
";

const DEFAULT_ALLOW_TEMPLATE: &str = "\
# Patterns listed here override the ignore list above.
";

#[derive(Debug)]
pub struct Workspace {
    repo_root: PathBuf,
    root: PathBuf,
}

impl Workspace {
    pub const DIR_NAME: &'static str = ".atlas";

    pub fn new<P: AsRef<Path>>(repo: P) -> Result<Self> {
        let repo = repo.as_ref();
        if !repo.is_dir() {
            return Err(WorkspaceError::RepoNotFound {
                path: repo.to_path_buf(),
            }
            .into());
        }
        let repo_root = repo
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", repo.display()))?;
        let root = repo_root.join(Self::DIR_NAME);
        Ok(Self { repo_root, root })
    }

    /// Create the workspace directory tree and default files.
    ///
    /// Idempotent: existing files are never overwritten. Returns the paths
    /// that were newly created, for the command layer to report.
    pub fn initialize(&self) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();

        for dir in [
            self.root.clone(),
            self.snapshot_dir(),
            self.knowledge_dir(),
            self.analysis_dir(),
            self.checkpoints_dir(),
            self.logs_dir(),
            self.inspect_root(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        for (path, template) in [
            (self.config_path(), DEFAULT_CONFIG_TEMPLATE),
            (self.ignore_path(), DEFAULT_IGNORE_TEMPLATE),
            (self.allow_path(), DEFAULT_ALLOW_TEMPLATE),
        ] {
            if !path.exists() {
                fs::write(&path, template)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                created.push(path);
            }
        }

        Ok(created)
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Delete the workspace recursively. Returns false when there was
    /// nothing to remove.
    pub fn remove(&self) -> Result<bool> {
        if !self.root.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&self.root)
            .with_context(|| format!("Failed to remove {}", self.root.display()))?;
        Ok(true)
    }

    pub fn load_config(&self) -> Result<RunConfig> {
        let path = self.config_path();
        if !path.exists() {
            return Err(WorkspaceError::ConfigMissing { path }.into());
        }
        RunConfig::load(&path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Display name of the repository being explored.
    pub fn repo_name(&self) -> String {
        self.repo_root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "repository".to_string())
    }

    /// Absolute path of a repo-relative directory (`.` = the root itself).
    pub fn resolve_rel(&self, rel: &str) -> PathBuf {
        if rel == "." {
            self.repo_root.clone()
        } else {
            self.repo_root.join(rel)
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    pub fn ignore_path(&self) -> PathBuf {
        self.root.join("ignore")
    }

    pub fn allow_path(&self) -> PathBuf {
        self.root.join("allow")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.root.join("snapshot")
    }

    /// `snapshot/<rel>/record.json`; the root record lives directly under
    /// `snapshot/`.
    pub fn record_path(&self, rel: &str) -> PathBuf {
        if rel == "." {
            self.snapshot_dir().join("record.json")
        } else {
            self.snapshot_dir().join(rel).join("record.json")
        }
    }

    pub fn knowledge_dir(&self) -> PathBuf {
        self.root.join("knowledge")
    }

    pub fn nodes_path(&self) -> PathBuf {
        self.knowledge_dir().join("nodes.json")
    }

    pub fn components_path(&self) -> PathBuf {
        self.knowledge_dir().join("components.json")
    }

    pub fn frontier_path(&self) -> PathBuf {
        self.root.join("frontier.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join("run.lock")
    }

    pub fn telemetry_path(&self) -> PathBuf {
        self.root.join("telemetry.jsonl")
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoints_dir().join("last_step.json")
    }

    pub fn analysis_dir(&self) -> PathBuf {
        self.root.join("analysis")
    }

    pub fn analysis_path(&self, rel: &str) -> PathBuf {
        if rel == "." {
            self.analysis_dir().join("inferred.json")
        } else {
            self.analysis_dir().join(rel).join("inferred.json")
        }
    }

    pub fn learned_markers_path(&self) -> PathBuf {
        self.root.join("markers.learned.json")
    }

    pub fn learned_languages_path(&self) -> PathBuf {
        self.root.join("languages.learned.json")
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join("summary.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn log_path(&self) -> PathBuf {
        self.logs_dir().join("run.log")
    }

    fn inspect_root(&self) -> PathBuf {
        self.root.join("inspect")
    }

    pub fn inspect_dir(&self, rel: &str) -> PathBuf {
        if rel == "." {
            self.inspect_root()
        } else {
            self.inspect_root().join(rel)
        }
    }
}

/// Atomic complete-file JSON write: serialize into a temp file in the
/// destination directory, then rename over the target. A crash mid-write
/// never leaves a partial record behind.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    tmp.write_all(b"\n")
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to persist {}", path.display()))?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Join a child name onto a repo-relative path (`.` stands for the root).
pub fn join_rel(rel: &str, name: &str) -> String {
    if rel == "." {
        name.to_string()
    } else {
        format!("{rel}/{name}")
    }
}

/// Append one compact JSON object as a line to a JSONL file.
pub fn append_jsonl<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let line = serde_json::to_string(value).context("Failed to serialize telemetry line")?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writeln!(file, "{line}").with_context(|| format!("Failed to append to {}", path.display()))?;
    Ok(())
}
