//! AST module for the CafeBabe front end
//!
//! A [`SyntaxTree`] owns all of its nodes in one arena, stored in pre-order. Children are
//! owned through the arena, each by exactly one parent; the parent link of a node is an
//! index back into the same arena and never owns anything. Trees are immutable once built:
//! the collapse and filter passes in [`optimize`] build new trees.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

pub mod optimize;
pub mod render;

pub use optimize::{collapse, optimize, FilterPolicy};
pub use render::render;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// Index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A parse-tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    /// Name the node is tagged with; differs from `original_name` after a collapse.
    pub current_name: String,
    /// The rule that actually matched.
    pub original_name: String,
    /// Captured text, present on leaf nodes of token rules only.
    pub token: Option<String>,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl AstNode {
    pub fn new(name: impl Into<String>, line: usize, column: usize, offset: usize) -> Self {
        let name = name.into();
        Self {
            current_name: name.clone(),
            original_name: name,
            token: None,
            line,
            column,
            offset,
            length: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Copy of the node's own data, detached from any tree.
    fn detached(&self) -> Self {
        Self {
            current_name: self.current_name.clone(),
            original_name: self.original_name.clone(),
            token: self.token.clone(),
            line: self.line,
            column: self.column,
            offset: self.offset,
            length: self.length,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// An immutable tree of [`AstNode`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<AstNode>,
    root: NodeId,
}

/// Borrowed handle to one node of a tree.
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

// ============================================================================
// PUBLIC API IMPLEMENTATION
// ============================================================================

impl SyntaxTree {
    /// A tree consisting of `node` alone.
    pub fn leaf(node: AstNode) -> Self {
        let mut builder = TreeBuilder::default();
        let root = builder.push(node.detached(), None);
        builder.finish(root)
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = NodeRef<'_>> {
        (0..self.nodes.len()).map(move |i| self.node(NodeId(i as u32)))
    }

    /// Deep-copies the subtree at `root` out of a scratch arena whose nodes may be shared or
    /// unreachable. Every reachable occurrence becomes its own node with a single parent.
    pub(crate) fn from_arena(arena: &[AstNode], root: NodeId) -> Self {
        let mut builder = TreeBuilder::default();
        let mut stack = vec![(root, None)];
        while let Some((id, parent)) = stack.pop() {
            let source = &arena[id.index()];
            let copied = builder.push(source.detached(), parent);
            for &child in source.children.iter().rev() {
                stack.push((child, Some(copied)));
            }
        }
        builder.finish(NodeId(0))
    }
}

impl<'t> NodeRef<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn data(&self) -> &'t AstNode {
        &self.tree.nodes[self.id.index()]
    }

    pub fn name(&self) -> &'t str {
        &self.data().current_name
    }

    pub fn original_name(&self) -> &'t str {
        &self.data().original_name
    }

    /// True when either the current or the original name is `name`.
    pub fn is(&self, name: &str) -> bool {
        self.name() == name || self.original_name() == name
    }

    pub fn token(&self) -> Option<&'t str> {
        self.data().token.as_deref()
    }

    pub fn line(&self) -> usize {
        self.data().line
    }

    pub fn column(&self) -> usize {
        self.data().column
    }

    pub fn parent(&self) -> Option<NodeRef<'t>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    /// Parent, grandparent, and so on up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'t>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = NodeRef<'t>> + ExactSizeIterator {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| tree.node(id))
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'t>> {
        self.data()
            .children
            .get(index)
            .map(|&id| self.tree.node(id))
    }

    pub fn first_child(&self) -> Option<NodeRef<'t>> {
        self.child(0)
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.data().children.is_empty()
    }

    /// First token in pre-order within this subtree, including the node itself.
    pub fn first_token(&self) -> Option<NodeRef<'t>> {
        let mut found = None;
        crate::walk::walk(*self, |node| {
            if found.is_none() && node.token().is_some() {
                found = Some(node);
            }
        });
        found
    }

    /// Copies this subtree into a tree of its own.
    pub fn to_tree(&self) -> SyntaxTree {
        SyntaxTree::from_arena(&self.tree.nodes, self.id)
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("token", &self.token())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tree construction
// ----------------------------------------------------------------------------

/// Appends nodes to a fresh arena. Nodes must be pushed in pre-order.
#[derive(Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<AstNode>,
}

impl TreeBuilder {
    pub(crate) fn push(&mut self, mut node: AstNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = parent;
        node.children.clear();
        self.nodes.push(node);
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    pub(crate) fn finish(self, root: NodeId) -> SyntaxTree {
        SyntaxTree {
            nodes: self.nodes,
            root,
        }
    }
}

/// Scratch arena used while matching. Nodes are appended as rules succeed and may be
/// referenced from several memo entries; [`SyntaxTree::from_arena`] turns it into a tree.
#[derive(Default)]
pub(crate) struct NodeArena {
    nodes: Vec<AstNode>,
}

impl NodeArena {
    pub(crate) fn alloc(&mut self, mut node: AstNode, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.children = children;
        self.nodes.push(node);
        id
    }

    pub(crate) fn into_tree(self, root: NodeId) -> SyntaxTree {
        SyntaxTree::from_arena(&self.nodes, root)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

// ============================================================================
// SERIALIZATION
// ============================================================================

impl Serialize for SyntaxTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let renamed = self.name() != self.original_name();
        let mut fields = 4 + usize::from(renamed);
        if self.token().is_some() {
            fields += 1;
        }
        let mut state = serializer.serialize_struct("AstNode", fields)?;
        state.serialize_field("name", self.name())?;
        if renamed {
            state.serialize_field("original_name", self.original_name())?;
        } else {
            state.skip_field("original_name")?;
        }
        if let Some(token) = self.token() {
            state.serialize_field("token", token)?;
        } else {
            state.skip_field("token")?;
        }
        state.serialize_field("line", &self.line())?;
        state.serialize_field("column", &self.column())?;
        state.serialize_field("children", &Children(*self))?;
        state.end()
    }
}

struct Children<'t>(NodeRef<'t>);

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.children())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyntaxTree {
        let mut arena = NodeArena::default();
        let a = arena.alloc(AstNode::new("A", 1, 1, 0).with_token("a"), vec![]);
        let b = arena.alloc(AstNode::new("B", 1, 2, 1).with_token("b"), vec![]);
        let root = arena.alloc(AstNode::new("Root", 1, 1, 0), vec![a, b]);
        arena.into_tree(root)
    }

    #[test]
    fn arena_copy_is_preorder_with_parents() {
        let tree = sample();
        let names: Vec<_> = tree.iter().map(|n| n.name().to_string()).collect();
        assert_eq!(names, ["Root", "A", "B"]);

        let b = tree.root().child(1).unwrap();
        assert_eq!(b.parent().unwrap().name(), "Root");
        assert!(tree.root().parent().is_none());
    }

    #[test]
    fn shared_arena_nodes_are_duplicated() {
        let mut arena = NodeArena::default();
        let empty = arena.alloc(AstNode::new("E", 1, 1, 0), vec![]);
        let root = arena.alloc(AstNode::new("Root", 1, 1, 0), vec![empty, empty]);
        let tree = arena.into_tree(root);

        assert_eq!(tree.len(), 3);
        let children: Vec<_> = tree.root().children().map(|c| c.id()).collect();
        assert_ne!(children[0], children[1]);
    }

    #[test]
    fn serializes_as_nested_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["name"], "Root");
        assert_eq!(json["children"][1]["token"], "b");
        assert!(json.get("original_name").is_none());
    }
}
