//! Compilation pipeline: parse, reduce, bind.
//!
//! A [`Compiler`] owns one compiled grammar and the configuration that goes with it, and runs
//! any number of independent compilation units against them.

use std::time::{Duration, Instant};

use crate::ast::{collapse, optimize, SyntaxTree};
use crate::config::Config;
use crate::errors::{CafeError, ParseError, SourceContext};
use crate::grammar::{compile, Grammar, RuleId};
use crate::language::CAFEBABE_GRAMMAR;
use crate::matcher::Matcher;
use crate::symbols::{bind, Binding, BindingRules};

/// Wall-clock time spent in each phase of one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub parse: Duration,
    pub optimize: Duration,
    pub bind: Duration,
}

/// Everything produced for one source file.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub name: String,
    /// Tree as matched, before any reduction.
    pub raw: SyntaxTree,
    /// Collapsed and filtered tree.
    pub ast: SyntaxTree,
    pub binding: Binding,
    pub timings: PhaseTimings,
}

pub struct Compiler {
    grammar: Grammar,
    start: RuleId,
    config: Config,
    binding_rules: BindingRules,
    load_time: Duration,
}

impl Compiler {
    /// Compiles `grammar_text` and resolves the configured start rule.
    pub fn new(grammar_text: &str, config: Config) -> Result<Self, CafeError> {
        let started = Instant::now();
        let grammar = compile(grammar_text)?;
        let load_time = started.elapsed();

        let start = match &config.start_rule {
            Some(name) => grammar
                .rule_id(name)
                .ok_or_else(|| CafeError::UnknownStartRule(name.clone()))?,
            None => grammar.start_rule(),
        };
        log::debug!(
            "grammar loaded: {} rules, start rule '{}'",
            grammar.len(),
            grammar.rule(start).name
        );

        let binding_rules = config.binding_rules();
        Ok(Self {
            grammar,
            start,
            config,
            binding_rules,
            load_time,
        })
    }

    /// A compiler for the built-in CafeBabe grammar.
    pub fn cafebabe(config: Config) -> Result<Self, CafeError> {
        Self::new(CAFEBABE_GRAMMAR, config)
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Time taken to compile the grammar.
    pub fn load_time(&self) -> Duration {
        self.load_time
    }

    /// Matches `source` against the start rule.
    pub fn parse(&self, source: &SourceContext) -> Result<SyntaxTree, ParseError> {
        Matcher::with_options(&self.grammar, self.config.match_options())
            .match_id(self.start, &source.content)
            .map_err(|error| error.with_source(source))
    }

    /// Collapses single-child chains, then filters with the configured policy.
    pub fn reduce(&self, raw: &SyntaxTree) -> SyntaxTree {
        let collapsed = collapse(raw.root());
        optimize(
            collapsed.root(),
            self.config.root_unsafe,
            &self.config.policy,
        )
    }

    pub fn bind(&self, ast: &SyntaxTree) -> Binding {
        bind(ast, &self.binding_rules)
    }

    /// Runs every phase on `source`. No tree is produced when matching fails.
    pub fn compile_unit(&self, source: &SourceContext) -> Result<CompilationUnit, ParseError> {
        let started = Instant::now();
        let raw = self.parse(source)?;
        let parsed = Instant::now();
        let ast = self.reduce(&raw);
        let optimized = Instant::now();
        let binding = self.bind(&ast);
        let bound = Instant::now();

        log::debug!(
            "{}: {} raw nodes, {} after reduction, {} duplicate declarations",
            source.name,
            raw.len(),
            ast.len(),
            binding.duplicates.len()
        );

        Ok(CompilationUnit {
            name: source.name.clone(),
            raw,
            ast,
            binding,
            timings: PhaseTimings {
                parse: parsed - started,
                optimize: optimized - parsed,
                bind: bound - optimized,
            },
        })
    }
}
