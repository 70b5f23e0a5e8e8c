//! CLI command implementations.

pub mod clean;
pub mod explore;
pub mod init;
pub mod inspect;
