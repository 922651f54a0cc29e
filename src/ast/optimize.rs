//! Tree reduction passes.
//!
//! [`collapse`] folds single-child chains into their innermost node, and [`optimize`] filters
//! children by name under a [`FilterPolicy`]. Both are pure: they read one tree and build
//! another, keeping relative order and never inventing nodes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{NodeId, NodeRef, SyntaxTree, TreeBuilder};
use crate::walk::walk;

// ============================================================================
// FILTER POLICY
// ============================================================================

/// Name sets that decide which children survive [`optimize`].
///
/// Membership is tested against a node's `original_name`, the rule that actually matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    /// Dropped unconditionally.
    pub filter_always: BTreeSet<String>,
    /// Dropped when the node has no children.
    pub filter_if_childless: BTreeSet<String>,
    /// Judge `filter_if_childless` on the children that survive filtering instead of the
    /// children the node had in the input tree.
    pub childless_after_filtering: bool,
    /// Dropped when the surrounding context is unsafe.
    pub filter_in_unsafe_context: BTreeSet<String>,
    /// Kept nodes with these names make their own children's context unsafe.
    pub unsafe_context_triggers: BTreeSet<String>,
}

impl FilterPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_always<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_always.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn filter_if_childless<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_if_childless
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn filter_in_unsafe_context<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_in_unsafe_context
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn childless_after_filtering(mut self, enabled: bool) -> Self {
        self.childless_after_filtering = enabled;
        self
    }

    pub fn unsafe_context_triggers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unsafe_context_triggers
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether a child named `name` is dropped from a parent whose context is as given.
    pub fn drops(&self, name: &str, childless: bool, context_unsafe: bool) -> bool {
        self.filter_always.contains(name)
            || (childless && self.filter_if_childless.contains(name))
            || (context_unsafe && self.filter_in_unsafe_context.contains(name))
    }

    /// Context a kept `child` hands to its own children.
    pub fn child_context(&self, child: NodeRef<'_>) -> bool {
        self.unsafe_context_triggers.contains(child.original_name())
    }
}

// ============================================================================
// PASSES
// ============================================================================

/// Builds a new tree rooted at a copy of `node`, keeping only the descendants the policy
/// lets through. The root itself is always kept; `context_unsafe` applies to its direct
/// children.
///
/// By default a child is childless when it has no children in the input tree, so a node
/// whose children are all filtered survives as an empty node, and a second pass over the
/// output may drop it. With [`FilterPolicy::childless_after_filtering`] the surviving
/// children are counted instead, and the pass is idempotent.
pub fn optimize(node: NodeRef<'_>, context_unsafe: bool, policy: &FilterPolicy) -> SyntaxTree {
    let context_of = |current: NodeRef<'_>| {
        if current.id() == node.id() {
            context_unsafe
        } else {
            policy.child_context(current)
        }
    };

    // Surviving children per node, settled bottom-up: ids grow in pre-order.
    let surviving = policy.childless_after_filtering.then(|| {
        let mut order = Vec::new();
        walk(node, |current| order.push(current));
        let mut surviving = vec![0usize; node.tree().len()];
        for current in order.iter().rev() {
            let context = context_of(*current);
            let count = current
                .children()
                .filter(|child| {
                    let childless = surviving[child.id().index()] == 0;
                    !policy.drops(child.original_name(), childless, context)
                })
                .count();
            surviving[current.id().index()] = count;
        }
        surviving
    });
    let childless = |child: NodeRef<'_>| match &surviving {
        Some(surviving) => surviving[child.id().index()] == 0,
        None => !child.has_children(),
    };

    let mut builder = TreeBuilder::default();
    let mut stack: Vec<(NodeRef<'_>, Option<NodeId>)> = vec![(node, None)];
    while let Some((current, parent)) = stack.pop() {
        let copied = builder.push(current.data().detached(), parent);
        let context = context_of(current);
        for child in current.children().rev() {
            if !policy.drops(child.original_name(), childless(child), context) {
                stack.push((child, Some(copied)));
            }
        }
    }

    builder.finish(NodeId(0))
}

/// Builds a new tree in which every node with exactly one child is replaced by that child.
///
/// The surviving node keeps its own `original_name` and takes the `current_name` of the
/// outermost node of the folded chain.
pub fn collapse(node: NodeRef<'_>) -> SyntaxTree {
    let mut builder = TreeBuilder::default();
    let mut stack: Vec<(NodeRef<'_>, Option<NodeId>)> = vec![(node, None)];

    while let Some((outer, parent)) = stack.pop() {
        let mut inner = outer;
        while inner.child_count() == 1 {
            let Some(only) = inner.first_child() else {
                break;
            };
            inner = only;
        }

        let mut data = inner.data().detached();
        data.current_name = outer.name().to_string();
        let copied = builder.push(data, parent);
        for child in inner.children().rev() {
            stack.push((child, Some(copied)));
        }
    }

    builder.finish(NodeId(0))
}
