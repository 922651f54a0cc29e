//! # Symbol Table
//!
//! Declared names, organised as a stack of nested scopes. Each [`SymbolScope`] is a fixed
//! set of hash buckets with a chain per bucket, plus a link to its enclosing scope. Lookups
//! walk from a scope outwards through its enclosing scopes and never into siblings.
//!
//! Scopes live in a [`SymbolTable`] and are addressed by [`ScopeId`]. The global scope is
//! created with the table and is never popped; inner scopes are pushed and popped in LIFO
//! order as a traversal enters and leaves them. A `ScopeId` of a popped scope is stale, and
//! every operation given one treats it as absent.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub mod binder;

pub use binder::{bind, Binder, Binding, BindingRules};

/// Buckets per scope.
pub const NUM_BUCKETS: usize = 53;

// ============================================================================
// SYMBOLS
// ============================================================================

/// What a declared name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Type,
    Const,
    Var,
    TypeVar,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Type => "Type",
            SymbolKind::Const => "Const",
            SymbolKind::Var => "Var",
            SymbolKind::TypeVar => "TypeVar",
        };
        f.write_str(name)
    }
}

/// A declared name and where it was declared.
///
/// Two symbols are equal when name and kind agree; the position is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: usize,
    pub column: usize,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, line: usize, column: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            line,
            column,
        }
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for Symbol {}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (defined at {}:{})",
            self.name, self.kind, self.line, self.column
        )
    }
}

// ============================================================================
// SCOPES
// ============================================================================

/// Handle to a scope of a [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    index: usize,
    serial: u64,
}

impl ScopeId {
    /// Nesting depth; the global scope is 0.
    pub fn depth(&self) -> usize {
        self.index
    }
}

/// One level of the scope chain.
#[derive(Debug, Clone)]
pub struct SymbolScope {
    buckets: Vec<Vec<Symbol>>,
    enclosing: Option<ScopeId>,
    len: usize,
}

impl SymbolScope {
    fn new(enclosing: Option<ScopeId>) -> Self {
        Self {
            buckets: vec![Vec::new(); NUM_BUCKETS],
            enclosing,
            len: 0,
        }
    }

    fn bucket(name: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        (hasher.finish() % NUM_BUCKETS as u64) as usize
    }

    /// Adds `symbol` unless an equal one is already in this scope.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        let chain = &mut self.buckets[Self::bucket(&symbol.name)];
        if chain.contains(&symbol) {
            return false;
        }
        chain.push(symbol);
        self.len += 1;
        true
    }

    /// The most recently inserted symbol named `name` in this scope only.
    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.buckets[Self::bucket(name)]
            .iter()
            .rev()
            .find(|symbol| symbol.name == name)
    }

    /// Symbols in bucket order, newest first within a bucket.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.buckets.iter().flat_map(|chain| chain.iter().rev())
    }

    pub fn enclosing(&self) -> Option<ScopeId> {
        self.enclosing
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for SymbolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in self.symbols() {
            writeln!(f, " {symbol}")?;
        }
        Ok(())
    }
}

// ============================================================================
// SYMBOL TABLE
// ============================================================================

/// The live scope stack of one compilation unit.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<(u64, SymbolScope)>,
    next_serial: u64,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![(0, SymbolScope::new(None))],
            next_serial: 1,
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId {
            index: 0,
            serial: self.scopes[0].0,
        }
    }

    /// The innermost live scope.
    pub fn current(&self) -> ScopeId {
        let index = self.scopes.len() - 1;
        ScopeId {
            index,
            serial: self.scopes[index].0,
        }
    }

    /// Number of live scopes, the global one included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn scope(&self, id: ScopeId) -> Option<&SymbolScope> {
        match self.scopes.get(id.index) {
            Some((serial, scope)) if *serial == id.serial => Some(scope),
            _ => None,
        }
    }

    fn scope_mut(&mut self, id: ScopeId) -> Option<&mut SymbolScope> {
        match self.scopes.get_mut(id.index) {
            Some((serial, scope)) if *serial == id.serial => Some(scope),
            _ => None,
        }
    }

    /// Opens a scope nested in `enclosing` on top of the stack.
    pub fn push_scope(&mut self, enclosing: ScopeId) -> ScopeId {
        let enclosing = self.scope(enclosing).map(|_| enclosing);
        let serial = self.next_serial;
        self.next_serial += 1;
        self.scopes.push((serial, SymbolScope::new(enclosing)));
        ScopeId {
            index: self.scopes.len() - 1,
            serial,
        }
    }

    /// Discards the innermost scope. The global scope stays.
    pub fn pop_scope(&mut self) -> Option<SymbolScope> {
        if self.scopes.len() == 1 {
            return None;
        }
        self.scopes.pop().map(|(_, scope)| scope)
    }

    /// Adds `symbol` to exactly `scope`. False when an equal symbol is already there or the
    /// scope is gone.
    pub fn insert(&mut self, scope: ScopeId, symbol: Symbol) -> bool {
        self.scope_mut(scope)
            .is_some_and(|scope| scope.insert(symbol))
    }

    /// Adds `symbol` to the outermost scope of the chain starting at `scope`.
    pub fn insert_global(&mut self, scope: ScopeId, symbol: Symbol) -> bool {
        match self.outermost(scope) {
            Some(outermost) => self.insert(outermost, symbol),
            None => false,
        }
    }

    /// Finds `name` in `scope`, then in each enclosing scope in turn.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut next = Some(scope);
        while let Some(id) = next {
            let scope = self.scope(id)?;
            if let Some(symbol) = scope.find(name) {
                return Some(symbol);
            }
            next = scope.enclosing();
        }
        None
    }

    /// The last scope reached by following enclosing links from `scope`.
    pub fn outermost(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut id = scope;
        let mut current = self.scope(id)?;
        while let Some(enclosing) = current.enclosing() {
            id = enclosing;
            current = self.scope(id)?;
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> Symbol {
        Symbol::new(name, SymbolKind::Type, 1, 1)
    }

    #[test]
    fn duplicates_compare_name_and_kind() {
        let mut table = SymbolTable::new();
        let global = table.global();
        assert!(table.insert(global, ty("Foo")));
        assert!(!table.insert(global, Symbol::new("Foo", SymbolKind::Type, 9, 9)));
        assert!(table.insert(global, Symbol::new("Foo", SymbolKind::Const, 2, 1)));
        assert_eq!(table.scope(global).unwrap().len(), 2);
    }

    #[test]
    fn lookup_prefers_newest_in_scope() {
        let mut table = SymbolTable::new();
        let global = table.global();
        table.insert(global, ty("Foo"));
        table.insert(global, Symbol::new("Foo", SymbolKind::Var, 3, 4));
        assert_eq!(table.lookup(global, "Foo").unwrap().kind, SymbolKind::Var);
    }

    #[test]
    fn stale_scope_ids_are_rejected() {
        let mut table = SymbolTable::new();
        let inner = table.push_scope(table.global());
        table.pop_scope();
        let other = table.push_scope(table.global());
        assert_eq!(inner.depth(), other.depth());
        assert!(table.scope(inner).is_none());
        assert!(!table.insert(inner, ty("Foo")));
        assert!(table.insert(other, ty("Foo")));
    }

    #[test]
    fn global_scope_is_never_popped() {
        let mut table = SymbolTable::new();
        assert!(table.pop_scope().is_none());
        assert_eq!(table.depth(), 1);
    }

    #[test]
    fn symbol_dump_format() {
        let symbol = Symbol::new("Foo", SymbolKind::TypeVar, 3, 7);
        assert_eq!(symbol.to_string(), "[Foo] TypeVar (defined at 3:7)");
    }
}
