//! Handles all user-facing output for the CLI.
//!
//! Every function writes to a [`WriteColor`] sink, so the driver can target a terminal and
//! tests can target a buffer.

use std::io::{self, Write};
use std::time::Duration;

use termcolor::{Color, ColorSpec, WriteColor};

use crate::ast::{render, SyntaxTree};
use crate::errors::ParseError;
use crate::symbols::SymbolTable;

// ============================================================================
// HEADINGS AND TIMINGS
// ============================================================================

fn colored_line(out: &mut dyn WriteColor, color: Color, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{text}")?;
    out.reset()?;
    writeln!(out)
}

pub fn heading(out: &mut dyn WriteColor, text: &str) -> io::Result<()> {
    colored_line(out, Color::Cyan, text)
}

/// `"<label> <n>us"`.
pub fn timing(out: &mut dyn WriteColor, label: &str, elapsed: Duration) -> io::Result<()> {
    writeln!(out, "{label} {}us", elapsed.as_micros())
}

// ============================================================================
// COMPILATION RESULTS
// ============================================================================

pub fn print_ast(out: &mut dyn WriteColor, file: &str, tree: &SyntaxTree) -> io::Result<()> {
    heading(out, &format!("--- {file} ---"))?;
    write!(out, "{}", render(tree.root()))
}

pub fn print_json(out: &mut dyn WriteColor, tree: &SyntaxTree) -> io::Result<()> {
    let text = serde_json::to_string_pretty(tree).map_err(io::Error::from)?;
    writeln!(out, "{text}")
}

/// Dumps the global scope, one `[Name] Kind (defined at L:C)` line per symbol.
pub fn print_symbols(out: &mut dyn WriteColor, file: &str, table: &SymbolTable) -> io::Result<()> {
    heading(out, &format!("--- {file} symbols ---"))?;
    if let Some(global) = table.scope(table.global()) {
        write!(out, "{global}")?;
    }
    Ok(())
}

pub fn print_parse_failure(
    out: &mut dyn WriteColor,
    file: &str,
    error: &ParseError,
) -> io::Result<()> {
    for diagnostic in &error.diagnostics {
        colored_line(out, Color::Red, &format!("{file} error at {diagnostic}"))?;
    }
    Ok(())
}

pub fn print_abort(out: &mut dyn WriteColor) -> io::Result<()> {
    colored_line(out, Color::Red, "Unable to proceed, exiting")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SyntaxDiagnostic;
    use termcolor::NoColor;

    #[test]
    fn parse_failures_name_file_and_position() {
        let error = ParseError::new(vec![SyntaxDiagnostic {
            line: 2,
            column: 5,
            offset: 9,
            message: "syntax error, unexpected end of input.".to_string(),
        }]);
        let mut out = NoColor::new(Vec::new());
        print_parse_failure(&mut out, "a.cb", &error).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(
            text,
            "a.cb error at 2:5::syntax error, unexpected end of input.\n"
        );
    }

    #[test]
    fn timings_are_in_microseconds() {
        let mut out = NoColor::new(Vec::new());
        timing(&mut out, "a.cb parsing", Duration::from_micros(42)).unwrap();
        assert_eq!(String::from_utf8(out.into_inner()).unwrap(), "a.cb parsing 42us\n");
    }
}
