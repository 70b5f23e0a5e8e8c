pub mod record;
pub mod suggestion;

pub use record::{ChildScore, DirCounts, DirSamples, DirectoryRecord, Fingerprint};
pub use suggestion::{
    ChatMessage, Evidence, HighLevelComponent, Inferred, Nav, NodeNote, SuggestionResponse,
};
