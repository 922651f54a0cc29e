//! Text rendering of trees for diagnostics and `-v` output.
//!
//! ```text
//! + Program
//!   + Type
//!     - Name/TypeName (Foo)
//!     - CommonApiBody/ApiDecl
//! ```

use super::NodeRef;
use crate::walk::walk_with_depth;

/// Renders the subtree at `node`, two spaces of indentation per level.
pub fn render(node: NodeRef<'_>) -> String {
    let mut out = String::new();
    walk_with_depth(node, |node, depth| {
        out.push_str(&render_line(node, depth));
        out.push('\n');
    });
    out
}

/// One line of [`render`]: `+` marks a node with children, `-` a node without.
pub fn render_line(node: NodeRef<'_>, depth: usize) -> String {
    let marker = if node.has_children() { '+' } else { '-' };
    let name = if node.name() == node.original_name() {
        node.name().to_string()
    } else {
        format!("{}/{}", node.original_name(), node.name())
    };
    let indent = "  ".repeat(depth);
    match node.token() {
        Some(token) => format!("{indent}{marker} {name} ({token})"),
        None => format!("{indent}{marker} {name}"),
    }
}
