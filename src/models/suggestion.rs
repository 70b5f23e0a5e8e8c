//! Wire types for the suggestion step: chat messages out, a structured
//! (but untrusted) response back.
//!
//! A response that deserializes into [`SuggestionResponse`] is schema-valid;
//! everything beyond shape is the sanitizer's problem.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// OpenAI-style role/content message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// The validated response shape. `inferred` and `nav` must be present;
/// everything inside them is defaulted so sparse answers still parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionResponse {
    pub inferred: Inferred,
    pub nav: Nav,
    #[serde(default)]
    pub open_questions_ranked: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Inferred {
    #[serde(default)]
    pub high_level_components: Vec<HighLevelComponent>,
    /// Per-path notes, keyed by repo-relative path.
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeNote>,
}

/// A named architectural component spanning one or more directories.
/// Identity for merging is `(name, sorted dirs)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighLevelComponent {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub dirs: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub confidence: f64,
}

impl HighLevelComponent {
    /// Merge key: name plus the sorted directory set.
    pub fn identity(&self) -> (String, Vec<String>) {
        let mut dirs = self.dirs.clone();
        dirs.sort();
        (self.name.clone(), dirs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeNote {
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
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl Evidence {
    pub fn new<K: Into<String>, V: Into<String>>(kind: K, value: V) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Nav {
    #[serde(default)]
    pub descend_into: Vec<String>,
    #[serde(default)]
    pub descend_one_level_only: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
}
