//! Run the exploration loop: snapshot, learning passes, then the
//! frontier-driven crawl.
//!
//! Holds the run lock for the whole invocation so two explorations never
//! interleave writes inside the same workspace.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::cancel::{install_ctrlc_handler, CancelToken};
use crate::explorer::Explorer;
use crate::frontier::Frontier;
use crate::lock::RunLock;
use crate::logging::Logger;
use crate::policy::IgnorePolicy;
use crate::scan::snapshot::Snapshotter;
use crate::scan::{languages, markers};
use crate::suggest::learning::{learn_languages_once, learn_markers_once};
use crate::suggest::{HttpTransport, SuggestionClient};
use crate::workspace::Workspace;

/// # Arguments
/// * `repo` - Repository root
/// * `refresh` - Rebuild the snapshot and restart the frontier from the root
/// * `break_lock` - Remove a leftover lock from a crashed run first
pub fn execute(repo: &Path, refresh: bool, break_lock: bool) -> Result<()> {
    let workspace = Workspace::new(repo)?;
    let config = workspace.load_config()?;
    let logger = Logger::to_file(&workspace.log_path())?;

    let _lock = RunLock::acquire(
        &workspace.lock_path(),
        "explore",
        workspace.repo_root(),
        break_lock,
    )?;

    let cancel = CancelToken::new();
    install_ctrlc_handler(&cancel)?;

    let policy = IgnorePolicy::load(
        workspace.repo_root(),
        &workspace.ignore_path(),
        &workspace.allow_path(),
        config.policies.skip_symlinks,
    )?;

    println!("\n{}", "Snapshot".bold());
    println!("{}", "─".repeat(40).dimmed());

    let snapshotter = Snapshotter::new(&workspace, &policy, &config, logger.clone());
    let rebuild = refresh || !workspace.record_path(".").exists();
    if rebuild {
        let stats = snapshotter.scan()?;
        let rules = markers::active_rules(&workspace, &config);
        let marked = snapshotter.enrich_markers(&rules)?;
        let lang_map = languages::active_map(&workspace, &config);
        let scored = snapshotter.enrich_scoring(&rules, &lang_map)?;
        Frontier::load(&workspace, &logger).reset()?;

        println!(
            "  {} Scanned {} directories ({} skipped)",
            "✓".green().bold(),
            stats.recorded,
            stats.skipped
        );
        println!(
            "  {} Markers on {} records, scores on {}",
            "✓".green().bold(),
            marked,
            scored
        );
        if refresh {
            println!("  {} Frontier restarted at the root", "✓".green().bold());
        }
    } else {
        println!("  {} Existing snapshot kept", "─".dimmed());
    }

    let transport = HttpTransport::from_config(&config)?;
    let client = SuggestionClient::new(Box::new(transport), logger.clone());

    if config.learning.learn_markers || config.learning.learn_languages {
        let records = snapshotter.load_all_records()?;
        let new_markers =
            learn_markers_once(&workspace, &config, &policy, &records, &client, &logger);
        let new_languages =
            learn_languages_once(&workspace, &config, &records, &client, &logger);

        // A freshly written cache only shapes this run if the enrichment
        // passes see it; they are idempotent, so re-run them.
        if (new_markers && config.learning.use_learned_markers)
            || (new_languages && config.learning.use_learned_languages)
        {
            let rules = markers::active_rules(&workspace, &config);
            let lang_map = languages::active_map(&workspace, &config);
            snapshotter.enrich_markers(&rules)?;
            snapshotter.enrich_scoring(&rules, &lang_map)?;
            println!("  {} Learned rules applied to snapshot", "✓".green().bold());
        }
    }

    println!("\n{}", "Exploration".bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "  model {}  max_depth {}  max_nodes {}  max_llm_calls {}",
        config.model.cyan(),
        config.limits.max_depth,
        config.limits.max_nodes,
        config.limits.max_llm_calls
    );

    let explorer = Explorer::new(&workspace, &config, &policy, &client, logger.clone(), cancel);
    let summary = explorer.run()?;

    println!();
    println!("{}", "═".repeat(40).dimmed());
    println!(
        "{} Run {} stopped: {}",
        "✓".green().bold(),
        summary.run_id.dimmed(),
        summary.stopped_by.to_string().bold()
    );
    println!(
        "  visited {}  descended into {}  suggestion attempts {}  in {} ms",
        summary.visited, summary.descended, summary.llm_attempts, summary.duration_ms
    );
    println!(
        "  summary {}",
        workspace.summary_path().display().to_string().dimmed()
    );
    println!(
        "  telemetry {}",
        workspace.telemetry_path().display().to_string().dimmed()
    );

    Ok(())
}
