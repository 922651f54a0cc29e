//! # Packrat Matcher
//!
//! Runs a compiled [`Grammar`] against input text and builds a [`SyntaxTree`].
//!
//! ## Evaluation model
//! Every operator is evaluated recursively against a [`ParseCursor`]. Named rule applications
//! go through a memo table keyed by `(rule, offset, mode)`, so each rule runs at most once per
//! position and context, and matching stays linear in the input. The mode separates
//! applications that record expectations from those under a token rule, a capture, a
//! negative lookahead or the whitespace rule, which record none. Nodes produced while matching live in a
//! scratch arena; the tree handed back is a deep copy of what the start rule reached.
//!
//! ## Node construction
//! - token rules (a capture, or no rule references) yield leaves carrying their token;
//! - other rules yield a node whose children are the nodes of their sub-matches;
//! - ignored rules (`~Name`) and `~e` sub-expressions yield nothing.
//!
//! ## Failure reporting
//! Only the overall failure is reported. It names the farthest offset any alternative reached
//! together with what was expected there. Expectations are not collected inside token rules,
//! negative lookaheads or the whitespace rule; a failing token rule reports its own name.
//!
//! ## Depth
//! Evaluation recurses once per active rule application, so nesting in the input costs call
//! stack. [`MatchOptions::max_depth`] bounds the number of applications active at once
//! (1000 by default). Input nesting past the bound
//! fails the match with a `nesting too deep` diagnostic instead of overflowing the stack.
//! A bound of 0 disables the check.

use std::collections::HashSet;

use crate::ast::{AstNode, NodeArena, NodeId, SyntaxTree};
use crate::errors::{ParseError, SyntaxDiagnostic};
use crate::grammar::{Grammar, Rule, RuleDef, RuleId};

mod cursor;
pub mod memo;

pub use cursor::ParseCursor;
pub use memo::{MatchMode, MemoEntry, MemoKey, MemoTable};

// ============================================================================
// PUBLIC API
// ============================================================================

/// Matching switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Memoize rule applications. Turning this off changes running time, never results.
    pub packrat: bool,
    /// Most rule applications active at once; 0 for no limit.
    pub max_depth: usize,
}

pub const DEFAULT_MAX_DEPTH: usize = 1000;

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            packrat: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Matches input against one grammar. Holds no per-input state and can be reused.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'g> {
    grammar: &'g Grammar,
    options: MatchOptions,
}

impl<'g> Matcher<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_options(grammar, MatchOptions::default())
    }

    pub fn with_options(grammar: &'g Grammar, options: MatchOptions) -> Self {
        Self { grammar, options }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Matches `text` from the grammar's first rule.
    pub fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        self.match_id(self.grammar.start_rule(), text)
    }

    /// Matches `text` from the rule named `start`.
    pub fn match_rule(&self, start: &str, text: &str) -> Result<SyntaxTree, ParseError> {
        let mut log = Vec::new();
        self.match_with_log(start, text, &mut log)
            .ok_or_else(|| ParseError::new(log))
    }

    /// Matches `text` from the rule named `start`, appending diagnostics to `log` on failure.
    pub fn match_with_log(
        &self,
        start: &str,
        text: &str,
        log: &mut Vec<SyntaxDiagnostic>,
    ) -> Option<SyntaxTree> {
        let Some(id) = self.grammar.rule_id(start) else {
            log.push(SyntaxDiagnostic {
                line: 1,
                column: 1,
                offset: 0,
                message: format!("'{start}' is not defined."),
            });
            return None;
        };
        State::new(self.grammar, text, self.options).run(id, log)
    }

    /// Matches `text` from the rule `start`.
    pub fn match_id(&self, start: RuleId, text: &str) -> Result<SyntaxTree, ParseError> {
        let mut log = Vec::new();
        State::new(self.grammar, text, self.options)
            .run(start, &mut log)
            .ok_or_else(|| ParseError::new(log))
    }
}

/// Matches `text` against `grammar` from the rule named `start`, with memoization on.
pub fn match_rule(grammar: &Grammar, start: &str, text: &str) -> Result<SyntaxTree, ParseError> {
    Matcher::new(grammar).match_rule(start, text)
}

// ============================================================================
// MATCH STATE
// ============================================================================

/// Nodes and captures produced by the rule application currently being evaluated.
#[derive(Debug, Default)]
struct Frame {
    children: Vec<NodeId>,
    /// `(start, length)` of each capture, in completion order.
    captures: Vec<(ParseCursor, usize)>,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    children: usize,
    captures: usize,
}

/// Farthest position any failure reached, and what would have been accepted there.
#[derive(Debug, Default)]
struct Farthest {
    offset: usize,
    expected: Vec<String>,
}

impl Farthest {
    fn record(&mut self, offset: usize, expected: Option<String>) {
        if offset > self.offset {
            self.offset = offset;
            self.expected.clear();
        } else if offset < self.offset {
            return;
        }
        if let Some(expected) = expected {
            if !self.expected.contains(&expected) {
                self.expected.push(expected);
            }
        }
    }
}

struct State<'g, 's> {
    grammar: &'g Grammar,
    text: &'s str,
    options: MatchOptions,
    memo: MemoTable,
    arena: NodeArena,
    /// Rule applications in progress; re-entering one fails instead of looping.
    active: HashSet<MemoKey>,
    frame: Frame,
    saved: Vec<Frame>,
    farthest: Farthest,
    /// Rule applications currently on the call stack.
    depth: usize,
    /// Where `max_depth` was exceeded. Once set, every application fails.
    too_deep: Option<ParseCursor>,
    /// Rule bodies evaluated, memo hits excluded.
    invocations: usize,
    in_whitespace: bool,
    token_depth: usize,
    capture_depth: usize,
    negation_depth: usize,
}

impl<'g, 's> State<'g, 's> {
    fn new(grammar: &'g Grammar, text: &'s str, options: MatchOptions) -> Self {
        Self {
            grammar,
            text,
            options,
            memo: MemoTable::new(),
            arena: NodeArena::default(),
            active: HashSet::new(),
            frame: Frame::default(),
            saved: Vec::new(),
            farthest: Farthest::default(),
            depth: 0,
            too_deep: None,
            invocations: 0,
            in_whitespace: false,
            token_depth: 0,
            capture_depth: 0,
            negation_depth: 0,
        }
    }

    fn run(mut self, start: RuleId, log: &mut Vec<SyntaxDiagnostic>) -> Option<SyntaxTree> {
        let begin = self.skip_whitespace(ParseCursor::start());
        let outcome = self.apply(start, begin);
        log::debug!(
            "matched '{}' over {} bytes: {} rule invocations, {} memo entries, {} memo hits, {} scratch nodes",
            self.grammar.rule(start).name,
            self.text.len(),
            self.invocations,
            self.memo.len(),
            self.memo.hits(),
            self.arena.len()
        );

        if let Some(at) = self.too_deep {
            log.push(SyntaxDiagnostic {
                line: at.line,
                column: at.column,
                offset: at.offset,
                message: format!(
                    "nesting too deep, more than {} rule applications are active.",
                    self.options.max_depth
                ),
            });
            return None;
        }

        match outcome {
            Some((end, Some(root))) if end.at_end(self.text) => Some(self.arena.into_tree(root)),
            Some((end, None)) if end.at_end(self.text) => {
                log.push(SyntaxDiagnostic {
                    line: begin.line,
                    column: begin.column,
                    offset: begin.offset,
                    message: format!("'{}' yields no node.", self.grammar.rule(start).name),
                });
                None
            }
            Some((end, _)) => {
                self.farthest
                    .record(end.offset, Some("end of input".to_string()));
                log.push(self.failure());
                None
            }
            None => {
                log.push(self.failure());
                None
            }
        }
    }

    fn failure(&self) -> SyntaxDiagnostic {
        let offset = self.farthest.offset.min(self.text.len());
        let position = ParseCursor::start().advance(self.text, offset);
        let unexpected = match self.text[offset..].chars().next() {
            Some(c) => format!("'{}'", crate::grammar::escape(&c.to_string())),
            None => "end of input".to_string(),
        };
        let mut message = format!("syntax error, unexpected {unexpected}");
        if !self.farthest.expected.is_empty() {
            message.push_str(", expecting ");
            message.push_str(&self.farthest.expected.join(", "));
        }
        message.push('.');
        SyntaxDiagnostic {
            line: position.line,
            column: position.column,
            offset,
            message,
        }
    }

    // ------------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------------

    fn mark(&self) -> Mark {
        Mark {
            children: self.frame.children.len(),
            captures: self.frame.captures.len(),
        }
    }

    fn reset(&mut self, mark: Mark) {
        self.frame.children.truncate(mark.children);
        self.frame.captures.truncate(mark.captures);
    }

    fn enter_frame(&mut self) {
        let outer = std::mem::take(&mut self.frame);
        self.saved.push(outer);
    }

    fn leave_frame(&mut self) -> Frame {
        let outer = self.saved.pop().unwrap_or_default();
        std::mem::replace(&mut self.frame, outer)
    }

    // ------------------------------------------------------------------------
    // Expectations
    // ------------------------------------------------------------------------

    fn quiet(&self) -> bool {
        self.in_whitespace || self.token_depth > 0 || self.negation_depth > 0
    }

    fn mode(&self) -> MatchMode {
        // Captures only occur in token rules, so `capture_depth > 0` is already raw.
        if self.in_whitespace || self.token_depth > 0 {
            MatchMode::Raw
        } else if self.negation_depth > 0 {
            MatchMode::Quiet
        } else {
            MatchMode::Reporting
        }
    }

    fn expect(&mut self, offset: usize, expected: impl FnOnce() -> String) {
        if !self.quiet() {
            self.farthest.record(offset, Some(expected()));
        }
    }

    fn fail_at(&mut self, offset: usize) {
        if !self.quiet() {
            self.farthest.record(offset, None);
        }
    }

    // ------------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------------

    fn skip_whitespace(&mut self, cursor: ParseCursor) -> ParseCursor {
        let Some(id) = self.grammar.whitespace() else {
            return cursor;
        };
        if self.in_whitespace {
            return cursor;
        }
        let grammar = self.grammar;
        self.in_whitespace = true;
        self.enter_frame();
        let end = self.eval(&grammar.rule(id).body, cursor);
        self.leave_frame();
        self.in_whitespace = false;
        end.unwrap_or(cursor)
    }

    /// Applies a named rule, consulting the memo table.
    fn apply(&mut self, id: RuleId, cursor: ParseCursor) -> Option<(ParseCursor, Option<NodeId>)> {
        if self.too_deep.is_some() {
            return None;
        }
        // The mode is part of the key: what an application returns and records depends on it.
        let key = MemoKey {
            rule: id,
            offset: cursor.offset,
            mode: self.mode(),
        };
        let memoize = self.options.packrat;
        if memoize {
            match self.memo.get(key) {
                MemoEntry::Failed => return None,
                MemoEntry::Succeeded { end, node, .. } => return Some((end, node)),
                MemoEntry::Unattempted => {}
            }
        }
        if self.options.max_depth > 0 && self.depth >= self.options.max_depth {
            self.too_deep = Some(cursor);
            return None;
        }
        if !self.active.insert(key) {
            return None;
        }

        let grammar = self.grammar;
        self.depth += 1;
        let outcome = self.invoke(grammar.rule(id), cursor);
        self.depth -= 1;
        self.active.remove(&key);
        if self.too_deep.is_some() {
            return None;
        }

        if memoize {
            let entry = match outcome {
                Some((end, node)) => MemoEntry::Succeeded {
                    length: end.offset - cursor.offset,
                    end,
                    node,
                },
                None => MemoEntry::Failed,
            };
            self.memo.store(key, entry);
        }
        outcome
    }

    fn invoke(
        &mut self,
        def: &'g RuleDef,
        cursor: ParseCursor,
    ) -> Option<(ParseCursor, Option<NodeId>)> {
        self.invocations += 1;
        let outer_quiet = self.quiet();
        if def.is_token {
            self.token_depth += 1;
        }
        self.enter_frame();
        let outcome = self.eval(&def.body, cursor);
        let frame = self.leave_frame();
        if def.is_token {
            self.token_depth -= 1;
        }

        let Some(mut end) = outcome else {
            if def.is_token && !outer_quiet {
                self.farthest.record(cursor.offset, Some(def.name.clone()));
            }
            return None;
        };

        let node = if def.ignored {
            None
        } else if def.is_token {
            let (start, length) = frame
                .captures
                .first()
                .copied()
                .unwrap_or((cursor, end.offset - cursor.offset));
            let token = &self.text[start.offset..start.offset + length];
            let node = AstNode::new(def.name.as_str(), start.line, start.column, start.offset)
                .with_token(token)
                .with_length(length);
            Some(self.arena.alloc(node, Vec::new()))
        } else {
            let node = AstNode::new(def.name.as_str(), cursor.line, cursor.column, cursor.offset)
                .with_length(end.offset - cursor.offset);
            Some(self.arena.alloc(node, frame.children))
        };

        if def.is_token && self.token_depth == 0 && self.capture_depth == 0 {
            end = self.skip_whitespace(end);
        }
        Some((end, node))
    }

    fn eval(&mut self, rule: &'g Rule, cursor: ParseCursor) -> Option<ParseCursor> {
        match rule {
            Rule::Sequence(items) => {
                let mark = self.mark();
                let mut position = cursor;
                for item in items {
                    match self.eval(item, position) {
                        Some(next) => position = next,
                        None => {
                            self.reset(mark);
                            return None;
                        }
                    }
                }
                Some(position)
            }
            Rule::Choice(items) => {
                for item in items {
                    let mark = self.mark();
                    if let Some(next) = self.eval(item, cursor) {
                        return Some(next);
                    }
                    self.reset(mark);
                }
                None
            }
            Rule::ZeroOrMore(inner) => Some(self.repeat(inner, cursor)),
            Rule::OneOrMore(inner) => {
                let first = self.eval(inner, cursor)?;
                Some(self.repeat(inner, first))
            }
            Rule::Optional(inner) => {
                let mark = self.mark();
                match self.eval(inner, cursor) {
                    Some(next) => Some(next),
                    None => {
                        self.reset(mark);
                        Some(cursor)
                    }
                }
            }
            Rule::AndLookahead(inner) => {
                let mark = self.mark();
                let outcome = self.eval(inner, cursor);
                self.reset(mark);
                outcome.map(|_| cursor)
            }
            Rule::NotLookahead(inner) => {
                let mark = self.mark();
                self.negation_depth += 1;
                let outcome = self.eval(inner, cursor);
                self.negation_depth -= 1;
                self.reset(mark);
                match outcome {
                    Some(_) => {
                        self.fail_at(cursor.offset);
                        None
                    }
                    None => Some(cursor),
                }
            }
            Rule::Literal(text) => {
                if !cursor.remaining(self.text).starts_with(text.as_str()) {
                    self.expect(cursor.offset, || {
                        format!("'{}'", crate::grammar::escape(text))
                    });
                    return None;
                }
                let next = cursor.advance(self.text, text.len());
                if self.capture_depth == 0 && self.token_depth == 0 {
                    return Some(self.skip_whitespace(next));
                }
                Some(next)
            }
            Rule::CharClass(class) => match cursor.remaining(self.text).chars().next() {
                Some(c) if class.matches(c) => Some(cursor.advance(self.text, c.len_utf8())),
                _ => {
                    self.fail_at(cursor.offset);
                    None
                }
            },
            Rule::AnyChar => match cursor.remaining(self.text).chars().next() {
                Some(c) => Some(cursor.advance(self.text, c.len_utf8())),
                None => {
                    self.fail_at(cursor.offset);
                    None
                }
            },
            Rule::RuleRef(id) => {
                let (end, node) = self.apply(*id, cursor)?;
                if let Some(node) = node {
                    self.frame.children.push(node);
                }
                Some(end)
            }
            Rule::Capture(inner) => {
                self.capture_depth += 1;
                let outcome = self.eval(inner, cursor);
                self.capture_depth -= 1;
                let end = outcome?;
                self.frame
                    .captures
                    .push((cursor, end.offset - cursor.offset));
                if self.capture_depth == 0 && self.token_depth == 0 {
                    return Some(self.skip_whitespace(end));
                }
                Some(end)
            }
            Rule::Ignore(inner) => {
                let before = self.frame.children.len();
                let outcome = self.eval(inner, cursor);
                self.frame.children.truncate(before);
                outcome
            }
        }
    }

    /// Greedy repetition from `cursor`; stops at the first failing or empty iteration.
    fn repeat(&mut self, inner: &'g Rule, cursor: ParseCursor) -> ParseCursor {
        let mut position = cursor;
        loop {
            let mark = self.mark();
            match self.eval(inner, position) {
                Some(next) if next.offset > position.offset => position = next,
                _ => {
                    self.reset(mark);
                    return position;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::compile;

    fn names(tree: &SyntaxTree) -> Vec<String> {
        tree.iter()
            .map(|node| match node.token() {
                Some(token) => format!("{}({token})", node.name()),
                None => node.name().to_string(),
            })
            .collect()
    }

    #[test]
    fn token_rules_are_leaves() {
        let grammar = compile("Sum <- Num (Op Num)*\nNum <- < [0-9]+ >\nOp <- '+' / '-'").unwrap();
        let tree = Matcher::new(&grammar).parse("1+22-3").unwrap();
        assert_eq!(
            names(&tree),
            ["Sum", "Num(1)", "Op(+)", "Num(22)", "Op(-)", "Num(3)"]
        );
        let second_num = tree.root().child(2).unwrap();
        assert_eq!((second_num.line(), second_num.column()), (1, 3));
    }

    #[test]
    fn failed_sequence_leaves_no_children() {
        let grammar = compile("S <- (A B / A C)\nA <- 'a'\nB <- 'b'\nC <- 'c'").unwrap();
        let tree = Matcher::new(&grammar).parse("ac").unwrap();
        assert_eq!(names(&tree), ["S", "A(a)", "C(c)"]);
    }

    #[test]
    fn ignored_rules_and_expressions_yield_nothing() {
        let grammar = compile("S <- _ A ~B _\n~_ <- ' '*\nA <- 'a'\nB <- 'b'").unwrap();
        let tree = Matcher::new(&grammar).parse(" ab ").unwrap();
        assert_eq!(names(&tree), ["S", "A(a)"]);
    }

    #[test]
    fn innermost_capture_is_the_token() {
        let grammar = compile("Str <- < '\"' < (!'\"' .)* > '\"' >").unwrap();
        let tree = Matcher::new(&grammar).parse("\"hi\"").unwrap();
        assert_eq!(tree.root().token(), Some("hi"));
        assert_eq!(tree.root().column(), 2);
    }

    #[test]
    fn whitespace_directive_is_skipped_implicitly() {
        let grammar =
            compile("List <- '(' Item* ')'\nItem <- < [a-z]+ >\n%whitespace <- [ \\t\\n]*").unwrap();
        let tree = Matcher::new(&grammar).parse("  ( ab\n cd )  ").unwrap();
        assert_eq!(names(&tree), ["List", "Item(ab)", "Item(cd)"]);
        assert_eq!(tree.root().child(1).unwrap().line(), 2);
    }

    #[test]
    fn trailing_input_is_rejected() {
        let grammar = compile("A <- 'a'").unwrap();
        let err = Matcher::new(&grammar).parse("ab").unwrap_err();
        let diag = err.primary().unwrap();
        assert_eq!((diag.line, diag.column), (1, 2));
        assert_eq!(diag.message, "syntax error, unexpected 'b', expecting end of input.");
    }

    #[test]
    fn reports_farthest_failure() {
        let grammar = compile("S <- '{' Item* '}'\nItem <- Letter ';'\nLetter <- < [a-z] >").unwrap();
        let err = Matcher::new(&grammar).parse("{a;b").unwrap_err();
        let diag = err.primary().unwrap();
        assert_eq!(diag.offset, 4);
        assert_eq!(
            diag.message,
            "syntax error, unexpected end of input, expecting ';'."
        );
    }

    #[test]
    fn token_rule_failure_names_the_rule() {
        let grammar = compile("S <- 'x' Num\nNum <- < [0-9]+ >").unwrap();
        let err = Matcher::new(&grammar).parse("xy").unwrap_err();
        assert_eq!(
            err.primary().unwrap().message,
            "syntax error, unexpected 'y', expecting Num."
        );
    }

    #[test]
    fn unknown_start_rule_is_logged() {
        let grammar = compile("A <- 'a'").unwrap();
        let mut log = Vec::new();
        assert!(Matcher::new(&grammar)
            .match_with_log("Nope", "a", &mut log)
            .is_none());
        assert_eq!(log[0].message, "'Nope' is not defined.");
    }

    #[test]
    fn memoization_does_not_change_results() {
        let grammar = compile("S <- A 'x' / A 'y'\nA <- < 'a'+ >").unwrap();
        let on = Matcher::new(&grammar).parse("aaay").unwrap();
        let off = Matcher::with_options(
            &grammar,
            MatchOptions {
                packrat: false,
                ..MatchOptions::default()
            },
        )
        .parse("aaay")
        .unwrap();
        assert_eq!(on, off);
    }

    /// `(`*n `c` `)b`*n: every `X` tries `Y 'a'` first, then reads `Y` again for `Y 'b'`.
    fn nested_alternatives(depth: usize) -> String {
        format!("{}c{}", "(".repeat(depth), ")b".repeat(depth))
    }

    const BACKTRACKING: &str = "X <- Y 'a' / Y 'b' / 'c'\nY <- '(' X ')'";

    #[test]
    fn captured_backtracking_is_memoized() {
        let grammar = compile(&format!("T <- < X >\n{BACKTRACKING}")).unwrap();
        let text = nested_alternatives(12);

        let mut state = State::new(&grammar, &text, MatchOptions::default());
        let outcome = state.apply(grammar.start_rule(), ParseCursor::start());
        assert!(outcome.is_some_and(|(end, _)| end.at_end(&text)));
        // At most one invocation per rule and offset; without the table this is exponential.
        assert!(
            state.invocations <= grammar.len() * (text.len() + 1),
            "{} invocations",
            state.invocations
        );
    }

    #[test]
    fn negated_backtracking_is_memoized() {
        let grammar = compile(&format!("N <- !(X 'z') X\n{BACKTRACKING}")).unwrap();
        let text = nested_alternatives(12);

        let mut state = State::new(&grammar, &text, MatchOptions::default());
        assert!(state.apply(grammar.start_rule(), ParseCursor::start()).is_some());
        // Quiet and reporting applications are cached apart: at most two per rule and offset.
        assert!(
            state.invocations <= 2 * grammar.len() * (text.len() + 1),
            "{} invocations",
            state.invocations
        );
    }

    #[test]
    fn depth_limit_fails_instead_of_overflowing() {
        let grammar = compile(&format!("S <- X\n{BACKTRACKING}")).unwrap();
        let options = MatchOptions {
            max_depth: 40,
            ..MatchOptions::default()
        };
        let matcher = Matcher::with_options(&grammar, options);

        assert!(matcher.parse(&nested_alternatives(10)).is_ok());

        let err = matcher.parse(&nested_alternatives(50)).unwrap_err();
        assert_eq!(err.diagnostics.len(), 1);
        let diag = err.primary().unwrap();
        assert_eq!(
            diag.message,
            "nesting too deep, more than 40 rule applications are active."
        );
        assert_eq!(diag.line, 1);
    }
}
