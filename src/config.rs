//! Run configuration loaded from `.atlas/config.yaml`.
//!
//! Every field carries a serde default so a partial or empty file is valid;
//! `atlas init` writes the commented template below.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default configuration written by `atlas init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# atlas run configuration
# Any omitted field falls back to its built-in default.

# Suggestion endpoint (OpenAI-style chat completions).
model: gpt-5-nano
endpoint: https://api.openai.com/v1/chat/completions
# Name of the environment variable holding the API key.
api_key_env: ATLAS_API_KEY

# Hard limits for one run. 0 means unlimited.
limits:
  max_depth: 3
  max_nodes: 200
  max_llm_calls: 300

# Caps on derived lists. 0 means unlimited.
caps:
  samples:
    max_dirs: 10
    max_files: 10
  nav:
    max_children_per_step: 4
  context:
    max_ancestors_in_prompt: 6
    max_siblings_in_prompt: 20
    max_scored_children: 10
    max_reasons_per_child: 4

# Bounds applied to untrusted suggestion output before it is merged.
policies:
  skip_symlinks: true
  max_summary_chars: 400
  max_summary_sentences: 3
  max_languages_per_node: 5
  max_tags_per_node: 8
  max_evidence_per_node: 6

scoring:
  size_threshold: 20

# Optional marker/language learning. Caches are written once and reused.
learning:
  learn_markers: false
  learn_languages: false
  use_learned_markers: false
  use_learned_languages: false
  markers:
    top_k_candidates: 30
    min_confidence: 0.7
  languages:
    top_k_candidates: 20
    min_confidence: 0.7
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub model: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub limits: Limits,
    pub caps: Caps,
    pub policies: Policies,
    pub scoring: Scoring,
    pub learning: Learning,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5-nano".to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key_env: "ATLAS_API_KEY".to_string(),
            limits: Limits::default(),
            caps: Caps::default(),
            policies: Policies::default(),
            scoring: Scoring::default(),
            learning: Learning::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Hard limits for one run; 0 means unlimited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_depth: usize,
    pub max_nodes: usize,
    pub max_llm_calls: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_nodes: 200,
            max_llm_calls: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Caps {
    pub samples: SampleCaps,
    pub nav: NavCaps,
    pub context: ContextCaps,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleCaps {
    pub max_dirs: usize,
    pub max_files: usize,
}

impl Default for SampleCaps {
    fn default() -> Self {
        Self {
            max_dirs: 10,
            max_files: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NavCaps {
    pub max_children_per_step: usize,
}

impl Default for NavCaps {
    fn default() -> Self {
        Self {
            max_children_per_step: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextCaps {
    pub max_ancestors_in_prompt: usize,
    pub max_siblings_in_prompt: usize,
    pub max_scored_children: usize,
    pub max_reasons_per_child: usize,
}

impl Default for ContextCaps {
    fn default() -> Self {
        Self {
            max_ancestors_in_prompt: 6,
            max_siblings_in_prompt: 20,
            max_scored_children: 10,
            max_reasons_per_child: 4,
        }
    }
}

/// Bounds applied to untrusted suggestion output before merge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Policies {
    pub skip_symlinks: bool,
    pub max_summary_chars: usize,
    pub max_summary_sentences: usize,
    pub max_languages_per_node: usize,
    pub max_tags_per_node: usize,
    pub max_evidence_per_node: usize,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            skip_symlinks: true,
            max_summary_chars: 400,
            max_summary_sentences: 3,
            max_languages_per_node: 5,
            max_tags_per_node: 8,
            max_evidence_per_node: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Scoring {
    pub size_threshold: usize,
}

impl Default for Scoring {
    fn default() -> Self {
        Self { size_threshold: 20 }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Learning {
    pub learn_markers: bool,
    pub learn_languages: bool,
    pub use_learned_markers: bool,
    pub use_learned_languages: bool,
    pub markers: LearningCaps,
    pub languages: LearningCaps,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningCaps {
    pub top_k_candidates: usize,
    pub min_confidence: f64,
}

impl Default for LearningCaps {
    fn default() -> Self {
        Self {
            top_k_candidates: 30,
            min_confidence: 0.7,
        }
    }
}
