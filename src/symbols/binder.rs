//! Scope-driven symbol binding over an optimized tree.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{ScopeId, Symbol, SymbolKind, SymbolTable};
use crate::ast::{NodeRef, SyntaxTree};
use crate::walk::{accept, Visitor};

/// Rule names that drive the binder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingRules {
    /// Nodes with these names open a scope for their subtree.
    pub scope_rules: BTreeSet<String>,
    /// Nodes with these names declare a type named by their first child.
    pub type_rules: BTreeSet<String>,
}

impl BindingRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope_rule(mut self, name: impl Into<String>) -> Self {
        self.scope_rules.insert(name.into());
        self
    }

    pub fn type_rule(mut self, name: impl Into<String>) -> Self {
        self.type_rules.insert(name.into());
        self
    }

    pub fn opens_scope(&self, node: NodeRef<'_>) -> bool {
        named_in(node, &self.scope_rules)
    }

    pub fn declares_type(&self, node: NodeRef<'_>) -> bool {
        named_in(node, &self.type_rules)
    }
}

fn named_in(node: NodeRef<'_>, names: &BTreeSet<String>) -> bool {
    names.contains(node.name()) || names.contains(node.original_name())
}

/// Result of binding one tree.
#[derive(Debug, Clone)]
pub struct Binding {
    pub table: SymbolTable,
    /// Declarations rejected because an equal symbol already existed.
    pub duplicates: Vec<Symbol>,
}

/// Visitor that fills a [`SymbolTable`] while walking a tree.
pub struct Binder<'r> {
    rules: &'r BindingRules,
    table: SymbolTable,
    scopes: Vec<ScopeId>,
    duplicates: Vec<Symbol>,
}

impl<'r> Binder<'r> {
    pub fn new(rules: &'r BindingRules) -> Self {
        let table = SymbolTable::new();
        let global = table.global();
        Self {
            rules,
            table,
            scopes: vec![global],
            duplicates: Vec::new(),
        }
    }

    fn current(&self) -> ScopeId {
        self.scopes
            .last()
            .copied()
            .unwrap_or_else(|| self.table.global())
    }

    pub fn finish(self) -> Binding {
        Binding {
            table: self.table,
            duplicates: self.duplicates,
        }
    }
}

/// The type a declaring node introduces: its first child's token, or failing that the first
/// token below that child.
fn declared_type(node: NodeRef<'_>) -> Option<Symbol> {
    let first = node.first_child()?;
    let token = first.first_token()?;
    Some(Symbol::new(
        token.token()?,
        SymbolKind::Type,
        token.line(),
        token.column(),
    ))
}

impl Visitor for Binder<'_> {
    fn enter(&mut self, node: NodeRef<'_>, _depth: usize) {
        let current = self.current();
        if self.rules.declares_type(node) {
            if let Some(symbol) = declared_type(node) {
                if !self.table.insert_global(current, symbol.clone()) {
                    log::warn!("duplicate declaration {symbol}");
                    self.duplicates.push(symbol);
                }
            }
        }
        if self.rules.opens_scope(node) {
            let scope = self.table.push_scope(current);
            self.scopes.push(scope);
        }
    }

    fn leave(&mut self, node: NodeRef<'_>, _depth: usize) {
        if self.rules.opens_scope(node) {
            self.scopes.pop();
            self.table.pop_scope();
        }
    }
}

/// Walks `tree` and returns the symbols it declares.
pub fn bind(tree: &SyntaxTree, rules: &BindingRules) -> Binding {
    let mut binder = Binder::new(rules);
    accept(tree.root(), &mut binder);
    binder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstNode, NodeArena};

    /// Block(Type(Name "Foo"), Block(Type(Name "Bar")), Type(Name "Foo"))
    fn sample() -> SyntaxTree {
        let mut arena = NodeArena::default();
        let type_decl = |arena: &mut NodeArena, name: &str, line: usize| {
            let token = arena.alloc(AstNode::new("Name", line, 6, 0).with_token(name), vec![]);
            arena.alloc(AstNode::new("Type", line, 1, 0), vec![token])
        };
        let foo = type_decl(&mut arena, "Foo", 1);
        let bar = type_decl(&mut arena, "Bar", 2);
        let inner = arena.alloc(AstNode::new("Block", 2, 1, 0), vec![bar]);
        let again = type_decl(&mut arena, "Foo", 3);
        let root = arena.alloc(AstNode::new("Block", 1, 1, 0), vec![foo, inner, again]);
        arena.into_tree(root)
    }

    #[test]
    fn types_go_global_from_nested_scopes() {
        let rules = BindingRules::new().scope_rule("Block").type_rule("Type");
        let binding = bind(&sample(), &rules);

        let global = binding.table.global();
        let bar = binding.table.lookup(global, "Bar").unwrap();
        assert_eq!((bar.line, bar.column), (2, 6));
        assert_eq!(binding.table.depth(), 1);
        assert_eq!(binding.duplicates.len(), 1);
        assert_eq!(binding.duplicates[0].line, 3);
    }
}
