//! The untrusted suggestion step: transport, parsing, repair, policy
//! sanitation, and the optional learning passes.

pub mod client;
pub mod http;
pub mod learning;
pub mod prompts;
pub mod sanitize;

pub use client::{SuggestionClient, SuggestionOutcome, SuggestionTransport};
pub use http::HttpTransport;
pub use sanitize::{sanitize_response, SanitizeOutcome};
