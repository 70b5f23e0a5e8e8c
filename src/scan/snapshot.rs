//! Depth-bounded directory snapshotting.
//!
//! One scan produces one `record.json` per visited directory under
//! `.atlas/snapshot/`, mirroring the repository layout. Excluded children
//! still get a stub record carrying the skip reason, so later passes can
//! tell "never scanned" apart from "deliberately skipped".

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::config::RunConfig;
use crate::logging::Logger;
use crate::models::{DirCounts, DirectoryRecord, Fingerprint};
use crate::policy::IgnorePolicy;
use crate::workspace::{join_rel, load_json, save_json, Workspace};

use super::markers::{self, MarkerRule};
use super::scoring;

#[derive(Debug, Default)]
pub struct ScanStats {
    /// Directories with a full record.
    pub recorded: usize,
    /// Directories with a stub record and a skip reason.
    pub skipped: usize,
}

pub struct Snapshotter<'a> {
    workspace: &'a Workspace,
    policy: &'a IgnorePolicy,
    config: &'a RunConfig,
    logger: Logger,
}

impl<'a> Snapshotter<'a> {
    pub fn new(
        workspace: &'a Workspace,
        policy: &'a IgnorePolicy,
        config: &'a RunConfig,
        logger: Logger,
    ) -> Self {
        Self {
            workspace,
            policy,
            config,
            logger,
        }
    }

    /// Walk the repository from its root and write a record per directory.
    /// Children past `limits.max_depth` stay listed in their parent's
    /// `siblings` but get no record of their own (0 means unlimited).
    pub fn scan(&self) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        self.scan_dir(self.workspace.repo_root(), ".", 0, false, &mut stats)?;
        self.logger.info(
            "snapshot",
            &format!(
                "snapshot complete: {} directories recorded, {} skipped",
                stats.recorded, stats.skipped
            ),
        );
        Ok(stats)
    }

    fn scan_dir(
        &self,
        abs: &Path,
        rel: &str,
        depth: usize,
        is_symlink: bool,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let listing = match list_entries(abs) {
            Ok(entries) => entries,
            Err(err) => {
                self.logger
                    .warn("snapshot", &format!("cannot list {rel}: {err}"));
                let record = DirectoryRecord::skipped(
                    rel.to_string(),
                    depth,
                    format!("unreadable: {err}"),
                    is_symlink,
                );
                save_json(&self.workspace.record_path(rel), &record)?;
                stats.skipped += 1;
                return Ok(());
            }
        };

        let mut counts = DirCounts::default();
        let mut ext_histogram: BTreeMap<String, u64> = BTreeMap::new();
        let mut file_names: Vec<String> = Vec::new();
        let mut kept: Vec<&Entry> = Vec::new();
        let mut excluded: Vec<(&Entry, String)> = Vec::new();

        for entry in &listing {
            if entry.is_file {
                counts.files += 1;
                file_names.push(entry.name.clone());
                if let Some(ext) = file_extension(&entry.name) {
                    *ext_histogram.entry(ext).or_insert(0) += 1;
                }
            } else if entry.is_dir {
                counts.dirs += 1;
                let reason = if depth == 0 && entry.name == Workspace::DIR_NAME {
                    Some("workspace directory".to_string())
                } else {
                    self.policy.explain_skip(&abs.join(&entry.name))
                };
                match reason {
                    Some(reason) => excluded.push((entry, reason)),
                    None => kept.push(entry),
                }
            }
        }

        let siblings: Vec<String> = kept.iter().map(|entry| entry.name.clone()).collect();
        let samples = markers::rebuild_samples(
            &file_names,
            &siblings,
            &[],
            self.config.caps.samples.max_dirs,
            self.config.caps.samples.max_files,
        );

        let record = DirectoryRecord {
            path: rel.to_string(),
            depth,
            counts,
            ext_histogram,
            markers: Vec::new(),
            samples,
            siblings: siblings.clone(),
            excluded_children: excluded.iter().map(|(entry, _)| entry.name.clone()).collect(),
            is_symlink,
            ignored_reason: None,
            fingerprint: fingerprint(abs, rel, &listing),
            deterministic_scoring: BTreeMap::new(),
        };
        save_json(&self.workspace.record_path(rel), &record)?;
        stats.recorded += 1;
        self.logger.debug(
            "snapshot",
            &format!(
                "recorded {rel} ({} files, {} dirs)",
                record.counts.files, record.counts.dirs
            ),
        );

        for (entry, reason) in &excluded {
            let child_rel = join_rel(rel, &entry.name);
            let stub = DirectoryRecord::skipped(
                child_rel.clone(),
                depth + 1,
                reason.clone(),
                entry.is_symlink,
            );
            save_json(&self.workspace.record_path(&child_rel), &stub)?;
            stats.skipped += 1;
            self.logger
                .debug("snapshot", &format!("skipped {child_rel}: {reason}"));
        }

        let max_depth = self.config.limits.max_depth;
        if max_depth == 0 || depth + 1 <= max_depth {
            for entry in kept {
                let child_rel = join_rel(rel, &entry.name);
                self.scan_dir(
                    &abs.join(&entry.name),
                    &child_rel,
                    depth + 1,
                    entry.is_symlink,
                    stats,
                )?;
            }
        }

        Ok(())
    }

    /// Detect markers for every non-skipped record and rebuild its samples
    /// so matched marker files surface first. Rewrites each record.
    pub fn enrich_markers(&self, rules: &[MarkerRule]) -> Result<usize> {
        let records = self.load_all_records()?;
        let mut enriched = 0;

        for (rel, mut record) in records {
            if record.ignored_reason.is_some() {
                continue;
            }
            let abs = self.workspace.resolve_rel(&rel);
            record.markers = markers::detect_markers(&abs, rules);
            record.samples = markers::rebuild_samples(
                &list_file_names(&abs),
                &record.siblings,
                &record.markers,
                self.config.caps.samples.max_dirs,
                self.config.caps.samples.max_files,
            );
            save_json(&self.workspace.record_path(&rel), &record)?;
            enriched += 1;
        }

        Ok(enriched)
    }

    /// Recompute deterministic child scores from the stored records and
    /// rewrite only the records whose score map changed.
    pub fn enrich_scoring(
        &self,
        rules: &[MarkerRule],
        lang_map: &BTreeMap<String, String>,
    ) -> Result<usize> {
        let records = self.load_all_records()?;
        let mut updated = 0;

        for (rel, record) in &records {
            if record.ignored_reason.is_some() {
                continue;
            }
            let mut children: BTreeMap<String, DirectoryRecord> = BTreeMap::new();
            for name in &record.siblings {
                if let Some(child) = records.get(&join_rel(rel, name)) {
                    children.insert(name.clone(), child.clone());
                }
            }
            let scores = scoring::score_children(
                record,
                &children,
                rules,
                lang_map,
                self.config.scoring.size_threshold,
            );
            if scores != record.deterministic_scoring {
                let mut rewritten = record.clone();
                rewritten.deterministic_scoring = scores;
                save_json(&self.workspace.record_path(rel), &rewritten)?;
                updated += 1;
            }
        }

        Ok(updated)
    }

    /// Every stored record keyed by its repo-relative path.
    pub fn load_all_records(&self) -> Result<BTreeMap<String, DirectoryRecord>> {
        let mut records = BTreeMap::new();
        let snapshot = self.workspace.snapshot_dir();
        if snapshot.exists() {
            collect_records(&snapshot, &mut records)?;
        }
        Ok(records)
    }
}

struct Entry {
    name: String,
    is_file: bool,
    is_dir: bool,
    is_symlink: bool,
    modified: Option<SystemTime>,
}

/// Sorted listing with symlinks classified by their target; dangling links
/// count as neither file nor directory. Unreadable single entries are
/// dropped, only a failed `read_dir` is an error.
fn list_entries(dir: &Path) -> std::io::Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = Vec::new();
    for item in fs::read_dir(dir)?.filter_map(|item| item.ok()) {
        let Ok(file_type) = item.file_type() else {
            continue;
        };
        let is_symlink = file_type.is_symlink();
        let (is_file, is_dir) = if is_symlink {
            match fs::metadata(item.path()) {
                Ok(meta) => (meta.is_file(), meta.is_dir()),
                Err(_) => (false, false),
            }
        } else {
            (file_type.is_file(), file_type.is_dir())
        };
        entries.push(Entry {
            name: item.file_name().to_string_lossy().to_string(),
            is_file,
            is_dir,
            is_symlink,
            modified: item.metadata().ok().and_then(|meta| meta.modified().ok()),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn list_file_names(dir: &Path) -> Vec<String> {
    let Ok(read) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = read
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Change detector for a single directory: a content hash over the sorted
/// entry paths plus the newest modification time seen on the directory or
/// any direct entry.
fn fingerprint(dir: &Path, rel: &str, entries: &[Entry]) -> Fingerprint {
    let mut paths: Vec<String> = entries
        .iter()
        .map(|entry| join_rel(rel, &entry.name))
        .collect();
    paths.sort();

    let mut hasher = Sha256::new();
    hasher.update(paths.join("\n").as_bytes());
    let name_hash = hex::encode(hasher.finalize());

    let mut latest = fs::metadata(dir).ok().and_then(|meta| meta.modified().ok());
    for entry in entries {
        match (latest, entry.modified) {
            (Some(current), Some(modified)) if modified > current => latest = Some(modified),
            (None, Some(modified)) => latest = Some(modified),
            _ => {}
        }
    }
    let latest = latest.unwrap_or(SystemTime::UNIX_EPOCH);

    Fingerprint {
        latest_modified_utc: DateTime::<Utc>::from(latest)
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string(),
        total_entries: entries.len() as u64,
        name_hash,
    }
}

/// Extension key for the histogram. Bare dotfiles keep their leading dot
/// (`.gitignore` maps to itself), everything else maps to its final suffix,
/// lowercased. Extensionless names produce no key.
pub fn file_extension(name: &str) -> Option<String> {
    if let Some(rest) = name.strip_prefix('.') {
        if !rest.contains('.') {
            return Some(name.to_lowercase());
        }
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_lowercase()),
        _ => None,
    }
}

fn collect_records(dir: &Path, records: &mut BTreeMap<String, DirectoryRecord>) -> Result<()> {
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok())
    {
        let path = entry.path();
        if path.is_dir() {
            collect_records(&path, records)?;
        } else if entry.file_name() == "record.json" {
            let record: DirectoryRecord = load_json(&path)?;
            records.insert(record.path.clone(), record);
        }
    }
    Ok(())
}
