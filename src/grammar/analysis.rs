//! Static analysis over a linked rule table.
//!
//! - token detection: a rule is a token rule when its body captures, or references no rule;
//! - nullability: least fixpoint of "can succeed without consuming input";
//! - left recursion: a rule reachable from itself through leftmost, possibly-empty prefixes.

use std::collections::HashSet;

use super::{Rule, RuleDef, RuleId};
use crate::errors::GrammarError;

/// Fills in `is_token` and `nullable` for every rule.
pub(crate) fn annotate(rules: &mut [RuleDef]) {
    for def in rules.iter_mut() {
        def.is_token = is_token(&def.body);
    }

    let mut nullable = vec![false; rules.len()];
    loop {
        let mut changed = false;
        for (i, def) in rules.iter().enumerate() {
            if !nullable[i] && is_nullable(&def.body, &nullable) {
                nullable[i] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for (def, nullable) in rules.iter_mut().zip(nullable) {
        def.nullable = nullable;
    }
}

pub fn is_token(body: &Rule) -> bool {
    let mut has_capture = false;
    let mut has_reference = false;
    body.visit(&mut |rule| match rule {
        Rule::Capture(_) => has_capture = true,
        Rule::RuleRef(_) => has_reference = true,
        _ => {}
    });
    has_capture || !has_reference
}

/// Whether `rule` can succeed without consuming input, given per-rule nullability.
pub fn is_nullable(rule: &Rule, rules: &[bool]) -> bool {
    match rule {
        Rule::Sequence(items) => items.iter().all(|item| is_nullable(item, rules)),
        Rule::Choice(items) => items.iter().any(|item| is_nullable(item, rules)),
        Rule::ZeroOrMore(_)
        | Rule::Optional(_)
        | Rule::AndLookahead(_)
        | Rule::NotLookahead(_) => true,
        Rule::OneOrMore(inner) | Rule::Capture(inner) | Rule::Ignore(inner) => {
            is_nullable(inner, rules)
        }
        Rule::Literal(text) => text.is_empty(),
        Rule::CharClass(_) | Rule::AnyChar => false,
        Rule::RuleRef(id) => rules[id.index()],
    }
}

/// Rejects the first rule, in definition order, that can call itself at the same position.
pub(crate) fn check_left_recursion(rules: &[RuleDef]) -> Result<(), GrammarError> {
    let nullable: Vec<bool> = rules.iter().map(|def| def.nullable).collect();
    let edges: Vec<Vec<RuleId>> = rules
        .iter()
        .map(|def| {
            let mut out = Vec::new();
            leftmost_refs(&def.body, &nullable, &mut out);
            out
        })
        .collect();

    for (index, def) in rules.iter().enumerate() {
        let start = RuleId::from_index(index);
        if reaches(&edges, start, start) {
            return Err(GrammarError::new(
                def.line,
                def.column,
                format!("'{}' is left recursive.", def.name),
            ));
        }
    }
    Ok(())
}

/// Rules that may be invoked before `rule` has consumed any input.
fn leftmost_refs(rule: &Rule, nullable: &[bool], out: &mut Vec<RuleId>) {
    match rule {
        Rule::Sequence(items) => {
            for item in items {
                leftmost_refs(item, nullable, out);
                if !is_nullable(item, nullable) {
                    break;
                }
            }
        }
        Rule::Choice(items) => {
            for item in items {
                leftmost_refs(item, nullable, out);
            }
        }
        Rule::ZeroOrMore(inner)
        | Rule::OneOrMore(inner)
        | Rule::Optional(inner)
        | Rule::AndLookahead(inner)
        | Rule::NotLookahead(inner)
        | Rule::Capture(inner)
        | Rule::Ignore(inner) => leftmost_refs(inner, nullable, out),
        Rule::RuleRef(id) => out.push(*id),
        Rule::Literal(_) | Rule::CharClass(_) | Rule::AnyChar => {}
    }
}

fn reaches(edges: &[Vec<RuleId>], from: RuleId, target: RuleId) -> bool {
    let mut visited = HashSet::new();
    let mut stack: Vec<RuleId> = edges[from.index()].clone();
    while let Some(next) = stack.pop() {
        if next == target {
            return true;
        }
        if visited.insert(next) {
            stack.extend(edges[next.index()].iter().copied());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use crate::grammar::compile;

    #[test]
    fn nullable_rules_are_detected() {
        let grammar = compile("A <- B 'x'\nB <- 'y'?\nC <- 'z'+").unwrap();
        let flag = |name| grammar.rule(grammar.rule_id(name).unwrap()).nullable;
        assert!(!flag("A"));
        assert!(flag("B"));
        assert!(!flag("C"));
    }

    #[test]
    fn left_recursion_through_nullable_prefix() {
        let err = compile("A <- B A 'x' / 'y'\nB <- 'b'?").unwrap_err();
        assert_eq!(err.message, "'A' is left recursive.");
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn token_rules() {
        let grammar = compile("A <- B < C >\nB <- 'b'\nC <- 'c'\nD <- B C").unwrap();
        let token = |name| grammar.rule(grammar.rule_id(name).unwrap()).is_token;
        assert!(token("A"));
        assert!(token("B"));
        assert!(!token("D"));
    }
}
