//! The CafeBabe language: its grammar and the tree policies tuned for it.

use crate::ast::FilterPolicy;
use crate::symbols::BindingRules;

/// Grammar of the CafeBabe language in PEG notation. `Program` is the start rule.
pub const CAFEBABE_GRAMMAR: &str = include_str!("cafebabe.peg");

/// Punctuation that never carries meaning once the tree is built.
const FILTER_ALWAYS: &[&str] = &[
    "BlockEnd",
    "BlockStart",
    "LP",
    "RP",
    "Semicolon",
    "SequenceSign",
    "eof",
];

const FILTER_IF_CHILDLESS: &[&str] = &["OptionalEllipsis"];

/// Separators that are noise inside list-like constructs.
const FILTER_IN_UNSAFE_CONTEXT: &[&str] = &[
    "Arrow", "BitOr", "Colon", "Comma", "Eq", "GT", "LSqB", "LT", "RSqB",
];

const UNSAFE_CONTEXT_TRIGGERS: &[&str] = &[
    "AndType",
    "ApiRefs",
    "LimitedTypeName",
    "ClassFields",
    "ArrayConstruction",
    "ExpressionList",
    "ForSetup",
    "Comprehension",
    "ComprPipeline",
    "Constant",
    "ImportList",
    "MatchCase",
    "MethodExpression",
    "MultiparamLambda",
    "NamedAssignment",
    "NamedAssignmentList",
    "NamedRange",
    "OptionalEllipsis",
    "OrType",
    "ParallelAssignment",
    "SingleParamLambda",
    "TupleConstruction",
    "TupleDecl",
    "Type",
    "TypeArguments",
    "TypedArgList",
    "TypeNameList",
    "ValueReference",
];

/// Filter policy for CafeBabe trees.
pub fn cafebabe_policy() -> FilterPolicy {
    FilterPolicy::new()
        .filter_always(FILTER_ALWAYS.iter().copied())
        .filter_if_childless(FILTER_IF_CHILDLESS.iter().copied())
        .filter_in_unsafe_context(FILTER_IN_UNSAFE_CONTEXT.iter().copied())
        .unsafe_context_triggers(UNSAFE_CONTEXT_TRIGGERS.iter().copied())
}

/// Scope and declaration rules for binding CafeBabe trees.
pub fn cafebabe_binding_rules() -> BindingRules {
    BindingRules::new()
        .scope_rule("Unsafe")
        .scope_rule("ClassBlock")
        .scope_rule("CommonApiBody")
        .scope_rule("MethodBlockBody")
        .type_rule("Type")
}
