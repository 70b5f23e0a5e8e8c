use std::path::PathBuf;
use std::process;

use atlas::commands::{clean, explore, init, inspect};
use atlas::workspace::WorkspaceError;
use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Directed repository exploration CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Repository root to operate on
    #[arg(long, global = true, default_value = ".", value_name = "PATH")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the .atlas/ workspace in a repository
    Init,

    /// Remove the .atlas/ workspace
    Clean,

    /// Crawl the repository one directory per step, guided by suggestions
    Explore {
        /// Rebuild the snapshot and restart the frontier from the root
        #[arg(long)]
        refresh: bool,

        /// Remove a leftover lock from a crashed run before starting
        #[arg(long)]
        break_lock: bool,
    },

    /// Preview the prompt context for one directory without crawling
    Inspect {
        /// Repo-relative directory (defaults to the repository root)
        path: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => init::execute(&cli.repo),
        Commands::Clean => clean::execute(&cli.repo),
        Commands::Explore {
            refresh,
            break_lock,
        } => explore::execute(&cli.repo, refresh, break_lock),
        Commands::Inspect { path } => inspect::execute(&cli.repo, path),
    };

    if let Err(err) = result {
        eprintln!("{} {err:?}", "Error:".red().bold());
        process::exit(exit_code(&err));
    }
}

/// Missing workspace pieces are usage-class failures (2); everything else,
/// including a held run lock, is a runtime failure (1).
fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<WorkspaceError>().is_some() {
        2
    } else {
        1
    }
}
