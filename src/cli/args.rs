//! Command-line arguments of the `cafebabe` driver.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, ValueEnum};
use simplelog::LevelFilter;
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "cafebabe",
    version,
    about = "Parses CafeBabe sources, reduces them to an AST and binds their declarations."
)]
pub struct CafeArgs {
    /// Print the optimized AST of each file.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the time spent in each phase.
    #[arg(short, long)]
    pub bench: bool,

    /// Print the symbol table of each file.
    #[arg(short, long)]
    pub symbols: bool,

    /// Print the optimized AST of each file as JSON.
    #[arg(long)]
    pub json: bool,

    /// Use the PEG grammar in FILE instead of the built-in CafeBabe grammar.
    #[arg(long, value_name = "FILE")]
    pub grammar: Option<PathBuf>,

    /// Load compiler settings from a YAML file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Start matching from RULE instead of the grammar's first rule.
    #[arg(long, value_name = "RULE")]
    pub start: Option<String>,

    /// Diagnostic log verbosity.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Source files, or directories to search for `.cb` files.
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
