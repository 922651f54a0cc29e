//! CafeBabe error handling.
//!
//! Three failure families reach the user: grammar errors (fatal, raised before any input is
//! parsed), parse errors (per input file, carrying every diagnostic the matcher logged) and
//! the I/O and configuration failures of the driver. Duplicate symbols are not errors: the
//! symbol table reports them as a `false` return.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Names a piece of source text for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

// ============================================================================
// GRAMMAR ERRORS
// ============================================================================

/// A grammar that cannot be turned into a rule registry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Error in grammar at {line}:{column}::{message}")]
#[diagnostic(
    code(cafebabe::grammar),
    help("the grammar must compile before any input can be parsed")
)]
pub struct GrammarError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl GrammarError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

// ============================================================================
// PARSE ERRORS
// ============================================================================

/// One `(line, column, message)` entry of the matcher's error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxDiagnostic {
    pub line: usize,
    pub column: usize,
    /// Byte offset of the reported position.
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for SyntaxDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}::{}", self.line, self.column, self.message)
    }
}

/// Input text that does not match the grammar. No tree is produced.
#[derive(Debug)]
pub struct ParseError {
    pub diagnostics: Vec<SyntaxDiagnostic>,
    source: Option<Arc<NamedSource<String>>>,
}

impl ParseError {
    pub fn new(diagnostics: Vec<SyntaxDiagnostic>) -> Self {
        Self {
            diagnostics,
            source: None,
        }
    }

    /// Attaches the offending source so miette can render a snippet.
    pub fn with_source(mut self, source: &SourceContext) -> Self {
        self.source = Some(source.to_named_source());
        self
    }

    /// The terminal diagnostic, reported last by the matcher.
    pub fn primary(&self) -> Option<&SyntaxDiagnostic> {
        self.diagnostics.last()
    }
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primary() {
            Some(diag) => write!(f, "parse error at {diag}"),
            None => write!(f, "parse error"),
        }
    }
}

impl Diagnostic for ParseError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("cafebabe::parse"))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        if self.diagnostics.len() > 1 {
            return Some(Box::new(format!(
                "{} diagnostics were logged while matching",
                self.diagnostics.len()
            )));
        }
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.source.as_ref()?;
        let diag = self.primary()?;
        let span = SourceSpan::from(diag.offset..diag.offset);
        Some(Box::new(
            vec![LabeledSpan::new_with_span(Some(diag.message.clone()), span)].into_iter(),
        ))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source
            .as_deref()
            .map(|source| source as &dyn miette::SourceCode)
    }
}

// ============================================================================
// DRIVER ERRORS
// ============================================================================

/// Driver failures outside of matching: grammar, configuration and file access.
#[derive(Debug, Error, Diagnostic)]
pub enum CafeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),

    #[error("unable to open {}", path.display())]
    #[diagnostic(code(cafebabe::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}", path.display())]
    #[diagnostic(code(cafebabe::config), help("see Config for the accepted keys"))]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown start rule '{0}'")]
    #[diagnostic(code(cafebabe::grammar))]
    UnknownStartRule(String),
}

/// Prints an error with full miette diagnostics.
pub fn print_error(error: impl Diagnostic + Send + Sync + 'static) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
