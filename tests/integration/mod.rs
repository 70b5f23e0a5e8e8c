//! Integration tests for the snapshot, frontier, and context layers
//!
//! These tests exercise whole components over real fixture repositories:
//! snapshot invariants across rescans, crash-safe frontier persistence, and
//! the capped context payload the explorer sends.

pub mod context_payload;
pub mod helpers;
pub mod snapshot_invariants;
