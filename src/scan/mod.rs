pub mod languages;
pub mod markers;
pub mod scoring;
pub mod snapshot;
