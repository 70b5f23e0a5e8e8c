//! The exploration run loop.
//!
//! One frontier node per step: load its record, build the capped context,
//! ask the suggestion client, sanitize, persist what was learned, let the
//! guardrail pick the children, and append telemetry. All durable state is
//! written through the workspace helpers, so a kill at any point leaves a
//! resumable run behind.

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::config::RunConfig;
use crate::context::build_context;
use crate::frontier::Frontier;
use crate::knowledge::KnowledgeStore;
use crate::logging::Logger;
use crate::models::DirectoryRecord;
use crate::nav;
use crate::policy::IgnorePolicy;
use crate::scan::languages;
use crate::suggest::{sanitize, SuggestionClient};
use crate::telemetry::{
    self, CheckpointAfter, CheckpointBefore, RunSummary, StepTelemetry, StopReason, SummaryLimits,
};
use crate::workspace::{append_jsonl, join_rel, load_json, save_json, Workspace};

#[derive(Debug, Default)]
struct Counters {
    visited: usize,
    descended: usize,
    attempts: usize,
    step: u64,
}

pub struct Explorer<'a> {
    workspace: &'a Workspace,
    config: &'a RunConfig,
    policy: &'a IgnorePolicy,
    client: &'a SuggestionClient,
    logger: Logger,
    cancel: CancelToken,
}

impl<'a> Explorer<'a> {
    pub fn new(
        workspace: &'a Workspace,
        config: &'a RunConfig,
        policy: &'a IgnorePolicy,
        client: &'a SuggestionClient,
        logger: Logger,
        cancel: CancelToken,
    ) -> Self {
        Self {
            workspace,
            config,
            policy,
            client,
            logger,
            cancel,
        }
    }

    /// Drive the frontier until a stop condition fires. The run summary is
    /// written on every exit path, including errors.
    pub fn run(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        self.logger.info(
            "explorer",
            &format!(
                "run {run_id} starting (max_depth={}, max_nodes={}, max_llm_calls={})",
                self.config.limits.max_depth,
                self.config.limits.max_nodes,
                self.config.limits.max_llm_calls
            ),
        );

        let mut frontier = Frontier::load(self.workspace, &self.logger);
        let mut knowledge = KnowledgeStore::load(self.workspace, &self.logger);
        let mut counters = Counters::default();

        let result = self.run_loop(&run_id, &mut frontier, &mut knowledge, &mut counters);
        let stopped_by = match &result {
            Ok(reason) => *reason,
            Err(_) => StopReason::Error,
        };

        let summary = RunSummary {
            run_id: run_id.clone(),
            visited: counters.visited,
            descended: counters.descended,
            llm_attempts: counters.attempts,
            duration_ms: started.elapsed().as_millis() as u64,
            limits: SummaryLimits {
                max_depth: self.config.limits.max_depth,
                max_nodes: self.config.limits.max_nodes,
                max_llm_calls: self.config.limits.max_llm_calls,
                nav_cap: self.config.caps.nav.max_children_per_step,
            },
            timestamp_utc: telemetry::timestamp(),
            model: self.config.model.clone(),
            stopped_by,
        };
        if let Err(err) = save_json(&self.workspace.summary_path(), &summary) {
            self.logger
                .warn("explorer", &format!("failed to write run summary: {err:#}"));
        }
        self.logger.info(
            "explorer",
            &format!(
                "run {run_id} stopped: {stopped_by} ({} visited, {} descended, {} llm attempts)",
                counters.visited, counters.descended, counters.attempts
            ),
        );

        result?;
        Ok(summary)
    }

    fn run_loop(
        &self,
        run_id: &str,
        frontier: &mut Frontier,
        knowledge: &mut KnowledgeStore,
        counters: &mut Counters,
    ) -> Result<StopReason> {
        let lang_map = languages::active_map(self.workspace, self.config);

        loop {
            if self.cancel.is_cancelled() {
                self.logger
                    .warn("explorer", "cancellation requested, stopping");
                return Ok(StopReason::Cancelled);
            }
            let limits = &self.config.limits;
            if limits.max_nodes != 0 && counters.visited >= limits.max_nodes {
                return Ok(StopReason::MaxNodes);
            }
            if limits.max_llm_calls != 0 && counters.attempts >= limits.max_llm_calls {
                return Ok(StopReason::MaxLlmCalls);
            }
            let Some(rel) = frontier.pop_left()? else {
                return Ok(StopReason::Exhausted);
            };
            self.process_step(run_id, &rel, frontier, knowledge, counters, &lang_map)?;
        }
    }

    fn process_step(
        &self,
        run_id: &str,
        rel: &str,
        frontier: &mut Frontier,
        knowledge: &mut KnowledgeStore,
        counters: &mut Counters,
        lang_map: &BTreeMap<String, String>,
    ) -> Result<()> {
        if frontier.is_visited(rel) {
            return Ok(());
        }
        counters.step += 1;
        let step = counters.step;

        let abs = match self.workspace.resolve_rel(rel).canonicalize() {
            Ok(path) if path.starts_with(self.workspace.repo_root()) && path.is_dir() => path,
            _ => {
                self.logger.warn(
                    "explorer",
                    &format!("skipping {rel}: not a directory inside the repository"),
                );
                return self.consume(run_id, rel, 0, "missing or outside repository", frontier, counters);
            }
        };

        let record: DirectoryRecord = match load_json(&self.workspace.record_path(rel)) {
            Ok(record) => record,
            Err(err) => {
                self.logger
                    .warn("explorer", &format!("no usable record for {rel}: {err:#}"));
                return self.consume(run_id, rel, 0, "record missing or unreadable", frontier, counters);
            }
        };

        if let Some(reason) = record.ignored_reason.clone() {
            self.logger.info("explorer", &format!("leaf {rel}: {reason}"));
            return self.consume(
                run_id,
                rel,
                record.depth,
                &format!("skipped: {reason}"),
                frontier,
                counters,
            );
        }

        let ancestors = knowledge.ancestor_chain(rel);
        let payload = build_context(
            &record,
            &ancestors,
            &self.workspace.repo_name(),
            &self.config.caps.context,
        )?;
        let context_json =
            serde_json::to_string_pretty(&payload).context("Failed to serialize context payload")?;
        let prompt_chars = context_json.chars().count();

        save_json(
            &self.workspace.checkpoint_path(),
            &CheckpointBefore::now(rel, record.depth, prompt_chars),
        )?;

        let requested_at = Instant::now();
        let outcome = self.client.request(&context_json);
        let latency_ms = requested_at.elapsed().as_millis() as u64;
        counters.attempts += outcome.attempts as usize;

        let ancestor_paths: Vec<String> =
            ancestors.iter().map(|note| note.path.clone()).collect();
        let sanitized = outcome.response.as_ref().map(|response| {
            sanitize::sanitize_response(
                response,
                &record,
                &ancestor_paths,
                lang_map,
                &self.config.policies,
            )
        });

        match &sanitized {
            Some(clean) => save_json(&self.workspace.analysis_path(rel), &clean.response)?,
            None => save_json(
                &self.workspace.analysis_path(rel),
                &serde_json::json!({ "raw": outcome.raw }),
            )?,
        }

        if let Some(clean) = &sanitized {
            let merged = knowledge.merge_response(&clean.response, step);
            knowledge.persist()?;
            self.logger
                .debug("explorer", &format!("merged {merged} node notes for {rel}"));
        }

        let requested = sanitized
            .as_ref()
            .map(|clean| clean.response.nav.descend_into.as_slice());
        let decision = nav::decide(
            requested,
            &record,
            self.policy,
            &abs,
            self.config.limits.max_depth,
            self.config.caps.nav.max_children_per_step,
        );
        if decision.fallback_used {
            self.logger.info(
                "explorer",
                &format!(
                    "deterministic fallback at {rel} kept {} children",
                    decision.kept.len()
                ),
            );
        }

        let queued: Vec<String> = decision
            .kept
            .iter()
            .map(|name| join_rel(rel, name))
            .collect();
        let pushed = frontier.push_many_left(&queued)?;
        counters.descended += pushed;

        let norm_languages = sanitized.as_ref().and_then(|clean| {
            clean
                .response
                .inferred
                .nodes
                .get(rel)
                .map(|node| node.languages.clone())
        });

        let line = StepTelemetry {
            run_id: run_id.to_string(),
            step,
            path: rel.to_string(),
            depth: record.depth,
            prompt_chars,
            response_chars: outcome.raw.chars().count(),
            latency_ms,
            json_valid: outcome.response.is_some(),
            nav_requested: requested.map(|names| names.len()).unwrap_or(0),
            nav_kept: decision.kept.len(),
            nav_rejected: decision.rejected.clone(),
            fallback_used: decision.fallback_used,
            sanitizer_trimmed: sanitized.as_ref().map(|clean| clean.trimmed).unwrap_or(false),
            sanitizer_notes: sanitized
                .as_ref()
                .map(|clean| clean.notes.clone())
                .unwrap_or_default(),
            norm_languages,
        };
        append_jsonl(&self.workspace.telemetry_path(), &line)?;

        save_json(
            &self.workspace.checkpoint_path(),
            &CheckpointAfter::now(rel, record.depth, line.json_valid, decision.kept.len()),
        )?;

        frontier.mark_visited(rel)?;
        counters.visited += 1;
        Ok(())
    }

    /// Consume a frontier node without a suggestion call, leaving a
    /// telemetry line saying why.
    fn consume(
        &self,
        run_id: &str,
        rel: &str,
        depth: usize,
        note: &str,
        frontier: &mut Frontier,
        counters: &mut Counters,
    ) -> Result<()> {
        append_jsonl(
            &self.workspace.telemetry_path(),
            &StepTelemetry::skipped(run_id, counters.step, rel, depth, note),
        )?;
        frontier.mark_visited(rel)?;
        counters.visited += 1;
        Ok(())
    }
}
