//! Grammar compiler: PEG notation text to rule registry.
//!
//! Compilation runs in two phases so rule bodies can name rules defined later, or themselves:
//! phase one registers every definition name and assigns its [`RuleId`], phase two builds the
//! bodies and resolves references through the now complete index. Analysis then computes the
//! per-rule flags and rejects left recursion.

use std::collections::HashMap;

use pest::error::{Error, LineColLocation};
use pest::iterators::Pair;
use pest::Parser;

use super::meta::{PegParser, Rule as Meta};
use super::{analysis, CharClass, Grammar, Rule, RuleDef, RuleId, WHITESPACE_DIRECTIVE};
use crate::errors::GrammarError;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Compiles PEG notation into a rule registry.
///
/// Fails on invalid syntax, duplicate definitions, references to undefined rules, unknown
/// directives, left recursion, or a grammar without rules. No partial registry is returned.
pub fn compile(text: &str) -> Result<Grammar, GrammarError> {
    let mut pairs = PegParser::parse(Meta::grammar, text).map_err(convert_parse_error)?;
    let Some(root) = pairs.next() else {
        return Err(GrammarError::new(1, 1, "empty grammar"));
    };

    let definitions: Vec<Pair<Meta>> = root
        .into_inner()
        .filter(|pair| pair.as_rule() == Meta::definition)
        .collect();

    let declarations = register(definitions)?;
    let start = declarations
        .iter()
        .position(|decl| decl.name != WHITESPACE_DIRECTIVE)
        .map(RuleId::from_index)
        .ok_or_else(|| GrammarError::new(1, 1, "grammar defines no rules"))?;

    let index: HashMap<String, RuleId> = declarations
        .iter()
        .enumerate()
        .map(|(i, decl)| (decl.name.clone(), RuleId::from_index(i)))
        .collect();

    let linker = Linker { index: &index };
    let mut rules = Vec::with_capacity(declarations.len());
    for decl in declarations {
        let body = linker.expression(decl.body)?;
        rules.push(RuleDef {
            name: decl.name,
            body,
            ignored: decl.ignored,
            is_token: false,
            nullable: false,
            line: decl.line,
            column: decl.column,
        });
    }

    analysis::annotate(&mut rules);
    analysis::check_left_recursion(&rules)?;

    log::debug!("compiled grammar with {} rules", rules.len());
    Ok(Grammar::new(rules, index, start))
}

// ============================================================================
// PHASE ONE: REGISTRATION
// ============================================================================

struct Declaration<'i> {
    name: String,
    ignored: bool,
    line: usize,
    column: usize,
    body: Pair<'i, Meta>,
}

fn register(definitions: Vec<Pair<'_, Meta>>) -> Result<Vec<Declaration<'_>>, GrammarError> {
    let mut seen: HashMap<String, (usize, usize)> = HashMap::new();
    let mut declarations = Vec::with_capacity(definitions.len());

    for definition in definitions {
        let mut ignored = false;
        let mut name = None;
        let mut body = None;
        for part in definition.into_inner() {
            match part.as_rule() {
                Meta::ignore_marker => ignored = true,
                Meta::identifier | Meta::directive => name = Some(part),
                Meta::expression => body = Some(part),
                _ => {}
            }
        }
        let (Some(name), Some(body)) = (name, body) else {
            return Err(GrammarError::new(1, 1, "malformed rule definition"));
        };

        let (line, column) = name.as_span().start_pos().line_col();
        let name = name.as_str().to_string();

        if name.starts_with('%') && name != WHITESPACE_DIRECTIVE {
            return Err(GrammarError::new(
                line,
                column,
                format!("unknown directive '{name}'."),
            ));
        }
        if let Some((first_line, first_column)) = seen.insert(name.clone(), (line, column)) {
            return Err(GrammarError::new(
                line,
                column,
                format!("'{name}' is already defined at {first_line}:{first_column}."),
            ));
        }

        declarations.push(Declaration {
            name,
            ignored,
            line,
            column,
            body,
        });
    }

    Ok(declarations)
}

// ============================================================================
// PHASE TWO: LINKING
// ============================================================================

struct Linker<'a> {
    index: &'a HashMap<String, RuleId>,
}

impl Linker<'_> {
    fn expression(&self, pair: Pair<'_, Meta>) -> Result<Rule, GrammarError> {
        let alternatives = pair
            .into_inner()
            .map(|sequence| self.sequence(sequence))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collapse(alternatives, Rule::Choice))
    }

    fn sequence(&self, pair: Pair<'_, Meta>) -> Result<Rule, GrammarError> {
        let items = pair
            .into_inner()
            .map(|prefix| self.prefix(prefix))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collapse(items, Rule::Sequence))
    }

    fn prefix(&self, pair: Pair<'_, Meta>) -> Result<Rule, GrammarError> {
        let mut operator = None;
        let mut operand = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Meta::prefix_op => operator = Some(part.as_str()),
                Meta::suffix => operand = Some(self.suffix(part)?),
                _ => {}
            }
        }
        let operand = operand.ok_or_else(|| GrammarError::new(1, 1, "missing operand"))?;
        Ok(match operator {
            Some("&") => Rule::AndLookahead(Box::new(operand)),
            Some("!") => Rule::NotLookahead(Box::new(operand)),
            Some("~") => Rule::Ignore(Box::new(operand)),
            _ => operand,
        })
    }

    fn suffix(&self, pair: Pair<'_, Meta>) -> Result<Rule, GrammarError> {
        let mut operand = None;
        let mut operator = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Meta::primary => operand = Some(self.primary(part)?),
                Meta::suffix_op => operator = Some(part.as_str()),
                _ => {}
            }
        }
        let operand = operand.ok_or_else(|| GrammarError::new(1, 1, "missing operand"))?;
        Ok(match operator {
            Some("*") => Rule::ZeroOrMore(Box::new(operand)),
            Some("+") => Rule::OneOrMore(Box::new(operand)),
            Some("?") => Rule::Optional(Box::new(operand)),
            _ => operand,
        })
    }

    fn primary(&self, pair: Pair<'_, Meta>) -> Result<Rule, GrammarError> {
        let (line, column) = pair.as_span().start_pos().line_col();
        let Some(inner) = pair.into_inner().next() else {
            return Err(GrammarError::new(line, column, "empty primary"));
        };

        match inner.as_rule() {
            Meta::reference => {
                let name = inner
                    .into_inner()
                    .next()
                    .map(|identifier| identifier.as_str())
                    .unwrap_or_default();
                self.index
                    .get(name)
                    .map(|&id| Rule::RuleRef(id))
                    .ok_or_else(|| {
                        GrammarError::new(line, column, format!("'{name}' is not defined."))
                    })
            }
            Meta::group => self.first_expression(inner, line, column),
            Meta::capture => Ok(Rule::Capture(Box::new(
                self.first_expression(inner, line, column)?,
            ))),
            Meta::literal => {
                let raw = inner.into_inner().next().map(|p| p.as_str()).unwrap_or("");
                Ok(Rule::Literal(unescape(raw, line, column)?))
            }
            Meta::class => char_class(inner, line, column),
            Meta::any => Ok(Rule::AnyChar),
            other => Err(GrammarError::new(
                line,
                column,
                format!("unexpected {other:?} in expression"),
            )),
        }
    }

    fn first_expression(
        &self,
        pair: Pair<'_, Meta>,
        line: usize,
        column: usize,
    ) -> Result<Rule, GrammarError> {
        match pair.into_inner().next() {
            Some(expression) => self.expression(expression),
            None => Err(GrammarError::new(line, column, "missing expression")),
        }
    }
}

/// Single-element sequences and choices are the element itself.
fn collapse(mut items: Vec<Rule>, wrap: fn(Vec<Rule>) -> Rule) -> Rule {
    if items.len() == 1 {
        if let Some(only) = items.pop() {
            return only;
        }
    }
    wrap(items)
}

// ============================================================================
// TERMINALS
// ============================================================================

fn char_class(pair: Pair<'_, Meta>, line: usize, column: usize) -> Result<Rule, GrammarError> {
    let mut negated = false;
    let mut body = "";
    for part in pair.into_inner() {
        match part.as_rule() {
            Meta::negation => negated = true,
            Meta::class_body => body = part.as_str(),
            _ => {}
        }
    }

    let items = unescape_class(body, line, column)?;
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < items.len() {
        let (low, _) = items[i];
        if i + 2 < items.len() && items[i + 1] == ('-', false) {
            let (high, _) = items[i + 2];
            if low > high {
                return Err(GrammarError::new(
                    line,
                    column,
                    format!("invalid character range '{low}-{high}'."),
                ));
            }
            ranges.push((low, high));
            i += 3;
        } else {
            ranges.push((low, low));
            i += 1;
        }
    }

    Ok(Rule::CharClass(CharClass::new(ranges, negated)))
}

/// Resolves escapes in a literal body.
fn unescape(raw: &str, line: usize, column: usize) -> Result<String, GrammarError> {
    Ok(unescape_class(raw, line, column)?
        .into_iter()
        .map(|(c, _)| c)
        .collect())
}

/// Resolves escapes, remembering which characters were escaped so that `\-` inside a class
/// is never taken as a range operator.
fn unescape_class(raw: &str, line: usize, column: usize) -> Result<Vec<(char, bool)>, GrammarError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push((c, false));
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('0') => '\0',
            Some(c @ ('\\' | '\'' | '"' | '[' | ']' | '-' | '^')) => c,
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        GrammarError::new(line, column, format!("invalid escape '\\x{hex}'."))
                    })?
            }
            Some(other) => {
                return Err(GrammarError::new(
                    line,
                    column,
                    format!("invalid escape '\\{other}'."),
                ))
            }
            None => return Err(GrammarError::new(line, column, "dangling escape '\\'.")),
        };
        out.push((escaped, true));
    }
    Ok(out)
}

fn convert_parse_error(error: Error<Meta>) -> GrammarError {
    let (line, column) = match error.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    GrammarError::new(line, column, format!("syntax error, {}", error.variant.message()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_in_literals() {
        assert_eq!(unescape(r"a\n\t\\\'", 1, 1).unwrap(), "a\n\t\\'");
        assert_eq!(unescape(r"\x41", 1, 1).unwrap(), "A");
        assert!(unescape(r"\q", 1, 1).is_err());
    }

    #[test]
    fn escaped_dash_is_not_a_range() {
        let Rule::CharClass(class) = compile(r"A <- [a\-z]").unwrap().rule(RuleId(0)).body.clone()
        else {
            panic!("expected a character class");
        };
        assert_eq!(class.ranges(), &[('a', 'a'), ('-', '-'), ('z', 'z')]);
    }
}
