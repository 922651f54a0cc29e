//! Packrat memo table.

use std::collections::HashMap;

use super::ParseCursor;
use crate::ast::NodeId;
use crate::grammar::RuleId;

/// Context of a rule application that changes its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Failures are recorded as expectations; implicit whitespace follows tokens.
    Reporting,
    /// Under a negative lookahead: nothing is recorded, whitespace is still skipped.
    Quiet,
    /// Inside a token rule (captures included) or the whitespace rule: nothing is recorded and no
    /// whitespace is skipped.
    Raw,
}

/// A rule application: which rule, at which byte offset, in which mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub rule: RuleId,
    pub offset: usize,
    pub mode: MatchMode,
}

/// Outcome of one rule application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoEntry {
    Unattempted,
    Failed,
    Succeeded {
        /// Bytes consumed.
        length: usize,
        end: ParseCursor,
        /// `None` for rules that yield no node.
        node: Option<NodeId>,
    },
}

/// Write-once map from [`MemoKey`] to [`MemoEntry`].
#[derive(Debug, Default)]
pub struct MemoTable {
    entries: HashMap<MemoKey, MemoEntry>,
    hits: usize,
}

impl MemoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: MemoKey) -> MemoEntry {
        match self.entries.get(&key) {
            Some(entry) => {
                self.hits += 1;
                *entry
            }
            None => MemoEntry::Unattempted,
        }
    }

    /// Records `entry` unless `key` already has one. Returns whether it was stored.
    pub fn store(&mut self, key: MemoKey, entry: MemoEntry) -> bool {
        if matches!(entry, MemoEntry::Unattempted) || self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from the table.
    pub fn hits(&self) -> usize {
        self.hits
    }
}
