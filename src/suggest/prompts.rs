//! Prompt templates for the suggestion and learning calls.

/// System message for the per-directory suggestion call. The response
/// schema here is the one `models::SuggestionResponse` parses.
pub const SYSTEM_PROMPT: &str = "\
You analyze one directory of a software repository at a time and help build a map of what the project contains.

You receive a JSON context object describing the current directory: its record (entry counts, extension histogram, marker files, sampled names), notes on its ancestors, its sibling directories, excluded children, and deterministically scored children.

Respond with a single JSON object and nothing else. No prose, no markdown fences. The object must have exactly this shape:

{
  \"inferred\": {
    \"high_level_components\": [
      {\"name\": str, \"role\": str, \"dirs\": [str], \"evidence\": [{\"type\": str, \"value\": str}], \"confidence\": float}
    ],
    \"nodes\": {
      \"<repo-relative path>\": {\"summary\": str, \"languages\": [str], \"tags\": [str], \"evidence\": [{\"type\": str, \"value\": str}], \"confidence\": float}
    }
  },
  \"nav\": {\"descend_into\": [str], \"descend_one_level_only\": true, \"reasons\": [str]},
  \"open_questions_ranked\": [str]
}

Rules:
- Always write a nodes entry for the current directory. Only use paths that appear in the context.
- descend_into may only name direct children listed in the context, ordered by priority. Name a few at most.
- Ground every claim in evidence taken from the context: markers, extensions, samples, or scores.
- confidence is a float in [0, 1].";

/// User message wrapper around the serialized context payload.
pub const USER_TEMPLATE: &str = "\
Context for the current directory:

{{context_json}}

Analyze this directory and reply with the JSON object described in your instructions.";

pub const MARKER_LEARNING_TEMPLATE: &str = "\
These file and directory names occur in one repository, with occurrence counts, and no built-in marker rule matches them:

{{candidates}}

Select the names that are meaningful project markers, meaning files whose presence identifies a build system, framework, toolchain, or CI setup. Respond ONLY with a JSON array, no prose and no markdown:

[{\"pattern\": str, \"category\": str, \"languages\": [str], \"weight\": float, \"confidence\": float}]

weight is the navigation value of the marker in [0, 1]. confidence is how sure you are the name is a real marker, in [0, 1]. Return [] if none qualify.";

pub const LANGUAGE_LEARNING_TEMPLATE: &str = "\
These file extensions occur in one repository, with occurrence counts, and no built-in language mapping covers them:

{{candidates}}

Map the extensions that clearly belong to a programming or configuration language. Respond ONLY with a JSON array, no prose and no markdown:

[{\"ext\": str, \"language\": str, \"confidence\": float}]

Use lowercase language names. Return [] if none qualify.";

/// Replace `{{key}}` placeholders. Unknown placeholders are left alone so a
/// template mismatch is visible in the rendered prompt.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}
