//! Pre-order tree traversal.
//!
//! All walks run on an explicit work stack, so their depth is bounded by memory rather than
//! by the call stack. Children are always visited left to right.

use crate::ast::NodeRef;

/// Receives nodes as a walk enters and leaves them.
pub trait Visitor {
    fn enter(&mut self, node: NodeRef<'_>, depth: usize);

    /// Called once every descendant of `node` has been entered and left.
    fn leave(&mut self, _node: NodeRef<'_>, _depth: usize) {}
}

/// Calls `f` on `node`, then on each descendant in pre-order.
pub fn walk<'t>(node: NodeRef<'t>, mut f: impl FnMut(NodeRef<'t>)) {
    walk_with_depth(node, |node, _| f(node));
}

/// Like [`walk`], also passing each node's depth below `node` (which has depth 0).
pub fn walk_with_depth<'t>(node: NodeRef<'t>, mut f: impl FnMut(NodeRef<'t>, usize)) {
    let mut stack = vec![(node, 0)];
    while let Some((current, depth)) = stack.pop() {
        f(current, depth);
        stack.extend(current.children().rev().map(|child| (child, depth + 1)));
    }
}

enum Step<'t> {
    Enter(NodeRef<'t>, usize),
    Leave(NodeRef<'t>, usize),
}

/// Drives `visitor` over the subtree at `node`.
pub fn accept<V: Visitor + ?Sized>(node: NodeRef<'_>, visitor: &mut V) {
    let mut stack = vec![Step::Enter(node, 0)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(current, depth) => {
                visitor.enter(current, depth);
                stack.push(Step::Leave(current, depth));
                stack.extend(
                    current
                        .children()
                        .rev()
                        .map(|child| Step::Enter(child, depth + 1)),
                );
            }
            Step::Leave(current, depth) => visitor.leave(current, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstNode, NodeArena, SyntaxTree};

    fn sample() -> SyntaxTree {
        let mut arena = NodeArena::default();
        let c = arena.alloc(AstNode::new("C", 1, 1, 0), vec![]);
        let b = arena.alloc(AstNode::new("B", 1, 1, 0), vec![c]);
        let d = arena.alloc(AstNode::new("D", 1, 1, 0), vec![]);
        let a = arena.alloc(AstNode::new("A", 1, 1, 0), vec![b, d]);
        arena.into_tree(a)
    }

    #[test]
    fn preorder_with_depth() {
        let tree = sample();
        let mut seen = Vec::new();
        walk_with_depth(tree.root(), |node, depth| {
            seen.push(format!("{}{}", node.name(), depth))
        });
        assert_eq!(seen, ["A0", "B1", "C2", "D1"]);
    }

    #[test]
    fn visitor_leaves_after_descendants() {
        struct Trace(Vec<String>);
        impl Visitor for Trace {
            fn enter(&mut self, node: NodeRef<'_>, _depth: usize) {
                self.0.push(format!("+{}", node.name()));
            }
            fn leave(&mut self, node: NodeRef<'_>, _depth: usize) {
                self.0.push(format!("-{}", node.name()));
            }
        }

        let tree = sample();
        let mut trace = Trace(Vec::new());
        accept(tree.root(), &mut trace);
        assert_eq!(trace.0, ["+A", "+B", "+C", "-C", "-B", "+D", "-D", "-A"]);
    }
}
