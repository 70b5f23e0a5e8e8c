//! Run logging: an explicit handle passed to each component at construction.
//!
//! Every line is written to the workspace log file; `info` and above are
//! mirrored on the console. Tests use the in-memory constructor so output
//! can be asserted without touching stdout or the filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

enum Sink {
    File(File),
    Memory(Vec<String>),
}

/// Cheap-to-clone logging handle; all clones share one sink.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<Mutex<Sink>>,
    console: bool,
}

impl Logger {
    /// Open (or create) an append-only log file, creating parent directories.
    pub fn to_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        Ok(Self {
            sink: Arc::new(Mutex::new(Sink::File(file))),
            console: true,
        })
    }

    /// Capturing logger for tests: no console output, lines kept in memory.
    pub fn in_memory() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Memory(Vec::new()))),
            console: false,
        }
    }

    pub fn debug(&self, component: &str, message: &str) {
        self.write(Level::Debug, component, message);
    }

    pub fn info(&self, component: &str, message: &str) {
        self.write(Level::Info, component, message);
    }

    pub fn warn(&self, component: &str, message: &str) {
        self.write(Level::Warn, component, message);
    }

    pub fn error(&self, component: &str, message: &str) {
        self.write(Level::Error, component, message);
    }

    /// Captured lines from an in-memory logger; empty for file loggers.
    pub fn captured(&self) -> Vec<String> {
        match self.sink.lock() {
            Ok(guard) => match &*guard {
                Sink::Memory(lines) => lines.clone(),
                Sink::File(_) => Vec::new(),
            },
            Err(_) => Vec::new(),
        }
    }

    fn write(&self, level: Level, component: &str, message: &str) {
        let line = format!(
            "{} {:5} [{component}] {message}",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            level.label(),
        );

        if let Ok(mut guard) = self.sink.lock() {
            match &mut *guard {
                Sink::File(file) => {
                    let _ = writeln!(file, "{line}");
                }
                Sink::Memory(lines) => lines.push(line),
            }
        }

        if self.console {
            let tag = format!("[{component}]");
            match level {
                Level::Debug => {}
                Level::Info => println!("{} {message}", tag.dimmed()),
                Level::Warn => eprintln!("{} {message}", tag.yellow().bold()),
                Level::Error => eprintln!("{} {message}", tag.red().bold()),
            }
        }
    }
}
