//! Extension-to-language mapping and per-directory language aggregation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::workspace::{load_json, Workspace};

/// One learned extension mapping, cached as a plain JSON array entry in
/// `.atlas/languages.learned.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearnedLanguage {
    pub ext: String,
    pub language: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Built-in extension → language table.
pub fn seed_map() -> BTreeMap<String, String> {
    let entries: &[(&str, &str)] = &[
        ("py", "python"),
        ("rs", "rust"),
        ("go", "go"),
        ("ts", "typescript"),
        ("tsx", "typescript"),
        ("js", "javascript"),
        ("jsx", "javascript"),
        ("cpp", "c++"),
        ("cxx", "c++"),
        ("cc", "c++"),
        ("hpp", "c++"),
        ("hxx", "c++"),
        ("hh", "c++"),
        ("c", "c"),
        ("h", "c"),
        ("kt", "kotlin"),
        ("java", "java"),
        ("rb", "ruby"),
        ("php", "php"),
        ("swift", "swift"),
        ("m", "objective-c"),
        ("mm", "objective-c++"),
        ("jl", "julia"),
        ("sh", "shell"),
        ("ps1", "powershell"),
        ("bat", "batch"),
        ("pl", "perl"),
        ("r", "r"),
        ("scala", "scala"),
        ("hs", "haskell"),
        ("lua", "lua"),
        ("dart", "dart"),
        ("sql", "sql"),
        ("proto", "protobuf"),
        ("qml", "qml"),
        ("tf", "hcl"),
    ];
    entries
        .iter()
        .map(|(ext, lang)| (ext.to_string(), lang.to_string()))
        .collect()
}

/// Seed table plus the learned cache when enabled; learned entries
/// override seed entries for the same extension.
pub fn active_map(workspace: &Workspace, config: &RunConfig) -> BTreeMap<String, String> {
    let mut map = seed_map();
    if config.learning.use_learned_languages {
        for learned in load_learned(&workspace.learned_languages_path()) {
            map.insert(learned.ext.to_lowercase(), learned.language.to_lowercase());
        }
    }
    map
}

/// Learned cache entries; a missing or corrupted cache loads as empty.
pub fn load_learned(path: &Path) -> Vec<LearnedLanguage> {
    load_json(path).unwrap_or_default()
}

/// Aggregate an extension histogram into `(language, file count)` pairs,
/// sorted by count descending then name ascending. Unmapped extensions
/// (including unmapped dotfile keys) do not count.
pub fn aggregate_languages(
    histogram: &BTreeMap<String, u64>,
    map: &BTreeMap<String, String>,
) -> Vec<(String, u64)> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for (ext, n) in histogram {
        if let Some(language) = map.get(ext) {
            *counts.entry(language.clone()).or_insert(0) += n;
        }
    }
    let mut out: Vec<(String, u64)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}
