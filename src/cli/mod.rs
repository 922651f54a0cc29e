//! The CafeBabe command-line driver.
//!
//! Compiles the grammar once, then runs every input file through the pipeline. A failing
//! file does not stop the batch; the exit code reports the worst outcome seen.

use std::ffi::OsString;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use termcolor::{ColorChoice, StandardStream, WriteColor};
use walkdir::WalkDir;

use crate::cli::args::{CafeArgs, LogLevel};
use crate::config::Config;
use crate::errors::{print_error, CafeError, SourceContext};
use crate::language::CAFEBABE_GRAMMAR;
use crate::pipeline::Compiler;

pub mod args;
pub mod output;

pub const EXIT_OK: i32 = 0;
pub const EXIT_PARSE_FAILURE: i32 = -1;
pub const EXIT_IO_FAILURE: i32 = -2;
pub const EXIT_USAGE: i32 = -100;
pub const EXIT_GRAMMAR_FAILURE: i32 = -200;

/// Extension of CafeBabe sources found when walking directories.
pub const SOURCE_EXTENSION: &str = "cb";

/// The main entry point for the CLI. Returns the process exit code.
pub fn run() -> i32 {
    run_from(std::env::args_os())
}

pub fn run_from<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.len() < 2 {
        return usage();
    }

    let args = match CafeArgs::try_parse_from(&args) {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_OK,
                _ => EXIT_IO_FAILURE,
            };
        }
    };
    if args.files.is_empty() {
        return usage();
    }

    init_logging(args.log_level);
    let choice = if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut stdout = StandardStream::stdout(choice);
    execute(&args, &mut stdout).unwrap_or_else(|err| {
        log::error!("unable to write output: {err}");
        EXIT_IO_FAILURE
    })
}

fn usage() -> i32 {
    let _ = CafeArgs::command().print_help();
    println!();
    EXIT_USAGE
}

fn init_logging(level: LogLevel) {
    let _ = simplelog::TermLogger::init(
        level.filter(),
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    );
}

/// Runs the batch described by `args`, writing results to `out`.
pub fn execute(args: &CafeArgs, out: &mut dyn WriteColor) -> io::Result<i32> {
    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(err) => {
                print_error(err);
                return Ok(EXIT_IO_FAILURE);
            }
        },
        None => Config::default(),
    };
    if let Some(start) = &args.start {
        config.start_rule = Some(start.clone());
    }

    let grammar_text = match &args.grammar {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                print_error(CafeError::Io {
                    path: path.clone(),
                    source,
                });
                return Ok(EXIT_IO_FAILURE);
            }
        },
        None => CAFEBABE_GRAMMAR.to_string(),
    };

    let compiler = match Compiler::new(&grammar_text, config) {
        Ok(compiler) => compiler,
        Err(err) => {
            print_error(err);
            output::print_abort(out)?;
            return Ok(EXIT_GRAMMAR_FAILURE);
        }
    };
    if args.bench {
        output::timing(out, "Loading grammar", compiler.load_time())?;
    }

    let mut io_failed = false;
    let mut parse_failed = false;
    for path in collect_inputs(&args.files, &mut io_failed) {
        let name = path.display().to_string();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(source) => {
                print_error(CafeError::Io { path, source });
                io_failed = true;
                continue;
            }
        };
        let source = SourceContext::from_file(name.as_str(), content);

        let unit = match compiler.compile_unit(&source) {
            Ok(unit) => unit,
            Err(error) => {
                output::print_parse_failure(out, &name, &error)?;
                print_error(error);
                parse_failed = true;
                continue;
            }
        };

        if args.bench {
            output::timing(out, &format!("{name} parsing"), unit.timings.parse)?;
            output::timing(out, &format!("{name} AST optimization"), unit.timings.optimize)?;
            output::timing(out, &format!("{name} symbol binding"), unit.timings.bind)?;
        }
        if args.verbose {
            output::print_ast(out, &name, &unit.ast)?;
        }
        if args.json {
            output::print_json(out, &unit.ast)?;
        }
        if args.symbols {
            output::print_symbols(out, &name, &unit.binding.table)?;
        }
    }

    Ok(if io_failed {
        EXIT_IO_FAILURE
    } else if parse_failed {
        EXIT_PARSE_FAILURE
    } else {
        EXIT_OK
    })
}

/// Expands directories into the `.cb` files below them, in path order. Plain files are kept
/// as given, whatever their extension.
fn collect_inputs(inputs: &[PathBuf], io_failed: &mut bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(input) {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_source(entry.path()) => {
                    found.push(entry.into_path());
                }
                Ok(_) => {}
                Err(err) => {
                    log::error!("unable to walk {}: {err}", input.display());
                    *io_failed = true;
                }
            }
        }
        found.sort();
        files.extend(found);
    }
    files
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == SOURCE_EXTENSION)
}
