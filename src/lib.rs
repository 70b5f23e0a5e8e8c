pub mod cancel;
pub mod commands;
pub mod config;
pub mod context;
pub mod explorer;
pub mod frontier;
pub mod knowledge;
pub mod lock;
pub mod logging;
pub mod models;
pub mod nav;
pub mod policy;
pub mod scan;
pub mod suggest;
pub mod telemetry;
pub mod workspace;

/// ASCII art logo for the atlas CLI
pub const LOGO: &str = "\
  ┌─┐┌┬┐┬  ┌─┐┌─┐
  ├─┤ │ │  ├─┤└─┐
  ┴ ┴ ┴ ┴─┘┴ ┴└─┘";
