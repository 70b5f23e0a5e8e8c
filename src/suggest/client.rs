//! Suggestion client with a single JSON repair round.
//!
//! The transport is a trait so runs can be driven by the real HTTP
//! endpoint or by scripted responses in tests. A reply that fails to parse
//! gets exactly one repair attempt; after that the caller falls back to
//! deterministic navigation.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::logging::Logger;
use crate::models::{ChatMessage, SuggestionResponse};

use super::prompts::{self, SYSTEM_PROMPT, USER_TEMPLATE};

/// Follow-up user message for the repair round.
pub const REPAIR_MESSAGE: &str =
    "Fix JSON ONLY; keep the same content and schema. No prose, no markdown.";

pub trait SuggestionTransport {
    fn send(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// What one suggestion request produced. `raw` is the last reply body and
/// is persisted even when parsing failed, so bad replies can be inspected.
pub struct SuggestionOutcome {
    pub response: Option<SuggestionResponse>,
    pub raw: String,
    pub attempts: u32,
}

pub struct SuggestionClient {
    transport: Box<dyn SuggestionTransport>,
    logger: Logger,
}

impl SuggestionClient {
    pub fn new(transport: Box<dyn SuggestionTransport>, logger: Logger) -> Self {
        Self { transport, logger }
    }

    /// One suggestion exchange for a serialized context payload.
    pub fn request(&self, context_json: &str) -> SuggestionOutcome {
        let mut messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(prompts::render(
                USER_TEMPLATE,
                &[("context_json", context_json)],
            )),
        ];

        let raw = match self.transport.send(&messages) {
            Ok(raw) => raw,
            Err(err) => {
                self.logger
                    .warn("suggest", &format!("suggestion request failed: {err:#}"));
                return SuggestionOutcome {
                    response: None,
                    raw: String::new(),
                    attempts: 1,
                };
            }
        };

        match parse_response(&raw) {
            Ok(response) => SuggestionOutcome {
                response: Some(response),
                raw,
                attempts: 1,
            },
            Err(err) => {
                self.logger.warn(
                    "suggest",
                    &format!("invalid suggestion JSON, trying one repair: {err:#}"),
                );
                messages.push(ChatMessage::assistant(raw.as_str()));
                messages.push(ChatMessage::user(REPAIR_MESSAGE));
                self.repair(&messages, raw)
            }
        }
    }

    fn repair(&self, messages: &[ChatMessage], first_raw: String) -> SuggestionOutcome {
        match self.transport.send(messages) {
            Ok(second) => match parse_response(&second) {
                Ok(response) => SuggestionOutcome {
                    response: Some(response),
                    raw: second,
                    attempts: 2,
                },
                Err(err) => {
                    self.logger
                        .warn("suggest", &format!("repair attempt still invalid: {err:#}"));
                    SuggestionOutcome {
                        response: None,
                        raw: second,
                        attempts: 2,
                    }
                }
            },
            Err(err) => {
                self.logger
                    .warn("suggest", &format!("repair request failed: {err:#}"));
                SuggestionOutcome {
                    response: None,
                    raw: first_raw,
                    attempts: 2,
                }
            }
        }
    }

    /// Single-shot learning call. Only a bare JSON array is accepted; any
    /// other reply is discarded.
    pub fn request_learning(&self, prompt: &str) -> Option<Value> {
        let messages = vec![ChatMessage::user(prompt)];
        let raw = match self.transport.send(&messages) {
            Ok(raw) => raw,
            Err(err) => {
                self.logger
                    .warn("suggest", &format!("learning request failed: {err:#}"));
                return None;
            }
        };
        match serde_json::from_str::<Value>(strip_fences(&raw)) {
            Ok(value) if value.is_array() => Some(value),
            Ok(_) => {
                self.logger
                    .warn("suggest", "learning reply was not a JSON array");
                None
            }
            Err(err) => {
                self.logger
                    .warn("suggest", &format!("learning reply was not JSON: {err}"));
                None
            }
        }
    }
}

/// Parse a reply into the suggestion schema, tolerating markdown fences
/// around the JSON.
pub fn parse_response(raw: &str) -> Result<SuggestionResponse> {
    serde_json::from_str(strip_fences(raw))
        .context("Suggestion reply does not match the expected schema")
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}
