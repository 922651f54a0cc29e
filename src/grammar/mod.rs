//! PEG grammar registry.
//!
//! A compiled [`Grammar`] is a name-indexed table of [`RuleDef`]s. Rule bodies are trees of
//! [`Rule`] operators, but the grammar as a whole is a graph: [`Rule::RuleRef`] points back into
//! the table by [`RuleId`], so rules may refer to themselves and to each other in any order.
//!
//! ## Usage Workflow
//! ```rust
//! use cafebabe::grammar::compile;
//! let grammar = compile("Sum <- Num ('+' Num)*\nNum <- < [0-9]+ >").unwrap();
//! assert_eq!(grammar.start_rule(), grammar.rule_id("Sum").unwrap());
//! assert!(grammar.rule(grammar.rule_id("Num").unwrap()).is_token);
//! ```
//!
//! ## Registry Invariant
//! The registry is immutable once [`compile`] returns. Every `RuleRef` in it resolves to a
//! defined rule, and no rule can reach itself without consuming input.

use std::collections::HashMap;
use std::fmt;

pub mod analysis;
mod compiler;
mod meta;

pub use compiler::compile;

/// Name of the directive rule that enables implicit whitespace skipping.
pub const WHITESPACE_DIRECTIVE: &str = "%whitespace";

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Dense index of a rule in its grammar, assigned at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A set of character ranges, optionally negated (`[^...]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    ranges: Vec<(char, char)>,
    negated: bool,
}

impl CharClass {
    pub fn new(ranges: Vec<(char, char)>, negated: bool) -> Self {
        Self { ranges, negated }
    }

    pub fn matches(&self, c: char) -> bool {
        let inside = self
            .ranges
            .iter()
            .any(|&(low, high)| low <= c && c <= high);
        inside != self.negated
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

/// A PEG operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Sequence(Vec<Rule>),
    Choice(Vec<Rule>),
    ZeroOrMore(Box<Rule>),
    OneOrMore(Box<Rule>),
    Optional(Box<Rule>),
    AndLookahead(Box<Rule>),
    NotLookahead(Box<Rule>),
    Literal(String),
    CharClass(CharClass),
    AnyChar,
    RuleRef(RuleId),
    /// `< e >`: the matched text becomes the enclosing node's token.
    Capture(Box<Rule>),
    /// `~e`: match `e` but drop the nodes it produces.
    Ignore(Box<Rule>),
}

impl Rule {
    /// Calls `f` on every operator of this expression, outermost first.
    pub fn visit(&self, f: &mut impl FnMut(&Rule)) {
        f(self);
        match self {
            Rule::Sequence(items) | Rule::Choice(items) => {
                for item in items {
                    item.visit(f);
                }
            }
            Rule::ZeroOrMore(inner)
            | Rule::OneOrMore(inner)
            | Rule::Optional(inner)
            | Rule::AndLookahead(inner)
            | Rule::NotLookahead(inner)
            | Rule::Capture(inner)
            | Rule::Ignore(inner) => inner.visit(f),
            Rule::Literal(_) | Rule::CharClass(_) | Rule::AnyChar | Rule::RuleRef(_) => {}
        }
    }
}

/// A named rule of the registry.
#[derive(Debug, Clone)]
pub struct RuleDef {
    pub name: String,
    pub body: Rule,
    /// Written `~Name <- ...`: matches, but never yields a node.
    pub ignored: bool,
    /// Body has a capture or references no other rule; such rules yield leaf nodes.
    pub is_token: bool,
    /// Body can succeed without consuming input.
    pub nullable: bool,
    pub line: usize,
    pub column: usize,
}

/// The compiled rule registry.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<RuleDef>,
    index: HashMap<String, RuleId>,
    start: RuleId,
    whitespace: Option<RuleId>,
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl Grammar {
    pub(crate) fn new(
        rules: Vec<RuleDef>,
        index: HashMap<String, RuleId>,
        start: RuleId,
    ) -> Self {
        let whitespace = index.get(WHITESPACE_DIRECTIVE).copied();
        Self {
            rules,
            index,
            start,
            whitespace,
        }
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    pub fn rule(&self, id: RuleId) -> &RuleDef {
        &self.rules[id.index()]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &RuleDef)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, def)| (RuleId::from_index(index), def))
    }

    /// Rule names in definition order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|def| def.name.as_str())
    }

    /// The first rule defined in the grammar text.
    pub fn start_rule(&self) -> RuleId {
        self.start
    }

    /// The `%whitespace` rule, when the grammar defines one.
    pub fn whitespace(&self) -> Option<RuleId> {
        self.whitespace
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Renders `rule` in PEG notation, resolving references to names.
    pub fn display<'g>(&'g self, rule: &'g Rule) -> RuleDisplay<'g> {
        RuleDisplay {
            grammar: self,
            rule,
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for def in &self.rules {
            let marker = if def.ignored { "~" } else { "" };
            writeln!(f, "{marker}{} <- {}", def.name, self.display(&def.body))?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// PEG notation rendering
// ----------------------------------------------------------------------------

/// [`Rule`] paired with its grammar for display.
pub struct RuleDisplay<'g> {
    grammar: &'g Grammar,
    rule: &'g Rule,
}

impl fmt::Display for RuleDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rule(f, self.grammar, self.rule, false)
    }
}

fn write_rule(f: &mut fmt::Formatter<'_>, g: &Grammar, rule: &Rule, nested: bool) -> fmt::Result {
    match rule {
        Rule::Sequence(items) => {
            if nested && items.len() != 1 {
                write!(f, "(")?;
            }
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write_rule(f, g, item, true)?;
            }
            if nested && items.len() != 1 {
                write!(f, ")")?;
            }
            Ok(())
        }
        Rule::Choice(items) => {
            if nested {
                write!(f, "(")?;
            }
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " / ")?;
                }
                write_rule(f, g, item, false)?;
            }
            if nested {
                write!(f, ")")?;
            }
            Ok(())
        }
        Rule::ZeroOrMore(inner) => write_postfix(f, g, inner, '*'),
        Rule::OneOrMore(inner) => write_postfix(f, g, inner, '+'),
        Rule::Optional(inner) => write_postfix(f, g, inner, '?'),
        Rule::AndLookahead(inner) => {
            write!(f, "&")?;
            write_rule(f, g, inner, true)
        }
        Rule::NotLookahead(inner) => {
            write!(f, "!")?;
            write_rule(f, g, inner, true)
        }
        Rule::Ignore(inner) => {
            write!(f, "~")?;
            write_rule(f, g, inner, true)
        }
        Rule::Capture(inner) => {
            write!(f, "< ")?;
            write_rule(f, g, inner, false)?;
            write!(f, " >")
        }
        Rule::Literal(text) => write!(f, "'{}'", escape(text)),
        Rule::CharClass(class) => write_class(f, class),
        Rule::AnyChar => write!(f, "."),
        Rule::RuleRef(id) => write!(f, "{}", g.rule(*id).name),
    }
}

fn write_postfix(f: &mut fmt::Formatter<'_>, g: &Grammar, inner: &Rule, op: char) -> fmt::Result {
    write_rule(f, g, inner, true)?;
    write!(f, "{op}")
}

pub(crate) fn write_class(f: &mut impl fmt::Write, class: &CharClass) -> fmt::Result {
    write!(f, "[")?;
    if class.negated {
        write!(f, "^")?;
    }
    for &(low, high) in &class.ranges {
        if low == high {
            write!(f, "{}", escape_class_char(low))?;
        } else {
            write!(f, "{}-{}", escape_class_char(low), escape_class_char(high))?;
        }
    }
    write!(f, "]")
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_class_char(c: char) -> String {
    match c {
        ']' | '-' | '^' => format!("\\{c}"),
        _ => escape(&c.to_string()),
    }
}
