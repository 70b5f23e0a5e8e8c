//! Shared test infrastructure: fixture repositories, scripted suggestion
//! transports, and a one-call runner for the exploration loop. The network
//! is never touched.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Result};
use tempfile::TempDir;

use atlas::cancel::CancelToken;
use atlas::config::RunConfig;
use atlas::explorer::Explorer;
use atlas::logging::Logger;
use atlas::models::ChatMessage;
use atlas::policy::IgnorePolicy;
use atlas::scan::languages::seed_map;
use atlas::scan::markers::seed_rules;
use atlas::scan::snapshot::Snapshotter;
use atlas::suggest::{SuggestionClient, SuggestionTransport};
use atlas::telemetry::{RunSummary, StepTelemetry};
use atlas::workspace::Workspace;

/// Test helper: lay out a small polyglot repository.
pub fn fixture_repo() -> TempDir {
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

    temp_dir
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    fs::write(path, content).expect("Failed to write fixture file");
}

/// Test helper: initialize the workspace and build the full snapshot.
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

    let snapshotter = Snapshotter::new(&workspace, &policy, &config, Logger::in_memory());
    snapshotter.scan().expect("Failed to scan");
    snapshotter
        .enrich_markers(&seed_rules())
        .expect("Failed to enrich markers");
    snapshotter
        .enrich_scoring(&seed_rules(), &seed_map())
        .expect("Failed to enrich scoring");

    (workspace, config, policy)
}

/// Test helper: run one exploration over the workspace with a transport.
pub fn run_with(
    workspace: &Workspace,
    config: &RunConfig,
    policy: &IgnorePolicy,
    transport: Box<dyn SuggestionTransport>,
) -> RunSummary {
    run_with_cancel(workspace, config, policy, transport, CancelToken::new())
}

/// Test helper: same as [`run_with`], with a caller-held cancel token.
pub fn run_with_cancel(
    workspace: &Workspace,
    config: &RunConfig,
    policy: &IgnorePolicy,
    transport: Box<dyn SuggestionTransport>,
    cancel: CancelToken,
) -> RunSummary {
    let client = SuggestionClient::new(transport, Logger::in_memory());
    Explorer::new(
        workspace,
        config,
        policy,
        &client,
        Logger::in_memory(),
        cancel,
    )
    .run()
    .expect("Exploration run failed")
}

/// Test helper: parsed telemetry lines in append order.
pub fn telemetry(workspace: &Workspace) -> Vec<StepTelemetry> {
    let raw = fs::read_to_string(workspace.telemetry_path()).expect("Failed to read telemetry");
    raw.lines()
        .map(|line| serde_json::from_str(line).expect("Failed to parse telemetry line"))
        .collect()
}

/// Test helper: a well-formed suggestion naming `children` for descent.
pub fn suggestion(path: &str, summary: &str, children: &[&str]) -> String {
    serde_json::json!({
        "inferred": {
            "high_level_components": [],
            "nodes": {
                path: {
                    "summary": summary,
                    "languages": ["rust"],
                    "tags": ["code"],
                    "evidence": [{"type": "marker", "value": "Cargo.toml"}],
                    "confidence": 0.7
                }
            }
        },
        "nav": {
            "descend_into": children,
            "descend_one_level_only": true,
            "reasons": ["scripted"]
        },
        "open_questions_ranked": []
    })
    .to_string()
}

/// Scripted transport: always the same reply.
pub struct RepeatTransport {
    pub reply: String,
}

impl SuggestionTransport for RepeatTransport {
    fn send(&self, _messages: &[ChatMessage]) -> Result<String> {
        Ok(self.reply.clone())
    }
}

/// Scripted transport: every send fails, like a network outage.
pub struct FailingTransport;

impl SuggestionTransport for FailingTransport {
    fn send(&self, _messages: &[ChatMessage]) -> Result<String> {
        bail!("connection refused")
    }
}

/// Scripted transport: pops queued replies in order, then repeats a default.
pub struct ScriptTransport {
    replies: Mutex<Vec<String>>,
    default: String,
}

impl ScriptTransport {
    pub fn new(mut replies: Vec<String>, default: String) -> Self {
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            default,
        }
    }
}

impl SuggestionTransport for ScriptTransport {
    fn send(&self, _messages: &[ChatMessage]) -> Result<String> {
        let mut replies = self.replies.lock().expect("script poisoned");
        Ok(replies.pop().unwrap_or_else(|| self.default.clone()))
    }
}

/// Scripted transport: picks its reply by the current path inside the
/// context payload, so each directory can steer its own navigation.
pub struct RouteTransport {
    routes: Vec<(String, String)>,
    default: String,
}

impl RouteTransport {
    pub fn new(default: String) -> Self {
        Self {
            routes: Vec::new(),
            default,
        }
    }

    pub fn route(mut self, path: &str, reply: String) -> Self {
        self.routes.push((path.to_string(), reply));
        self
    }
}

impl SuggestionTransport for RouteTransport {
    fn send(&self, messages: &[ChatMessage]) -> Result<String> {
        let path = messages
            .iter()
            .find(|message| message.role == "user")
            .and_then(|message| current_path(&message.content))
            .unwrap_or_default();
        for (route, reply) in &self.routes {
            if *route == path {
                return Ok(reply.clone());
            }
        }
        Ok(self.default.clone())
    }
}

/// The context JSON sits between prose in the user message; parse the
/// first complete JSON value and read `current.path` out of it.
fn current_path(content: &str) -> Option<String> {
    let start = content.find('{')?;
    let mut stream =
        serde_json::Deserializer::from_str(&content[start..]).into_iter::<serde_json::Value>();
    let value = stream.next()?.ok()?;
    Some(value.pointer("/current/path")?.as_str()?.to_string())
}

/// Scripted transport: trips the cancel token on every send, so the step
/// in flight becomes the run's last.
pub struct CancellingTransport {
    pub token: CancelToken,
    pub reply: String,
}

impl SuggestionTransport for CancellingTransport {
    fn send(&self, _messages: &[ChatMessage]) -> Result<String> {
        self.token.cancel();
        Ok(self.reply.clone())
    }
}
