pub use crate::errors::{CafeError, GrammarError, ParseError, SourceContext, SyntaxDiagnostic};
pub use crate::pipeline::{CompilationUnit, Compiler, PhaseTimings};

pub mod ast;
pub mod cli;
pub mod config;
pub mod errors;
pub mod grammar;
pub mod language;
pub mod matcher;
pub mod pipeline;
pub mod symbols;
pub mod walk;
