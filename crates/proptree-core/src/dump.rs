//! Human-readable rendering shared by producer and consumer trees.
//!
//! Output looks like `{ "<name>": <value-or-object>, ... }` with one entry per
//! line. It is for logs and eyeballing, not for interchange.

use crate::value::Scalar;
use std::fmt::Write;

/// A node that can be rendered.
pub(crate) trait DumpNode {
    /// The scalar held by a leaf, `None` for groups.
    fn scalar(&self) -> Option<&Scalar>;
    /// Named children of a group, in display order.
    fn entries(&self) -> Vec<(&str, &Self)>;
}

pub(crate) fn render_object<'a, N: DumpNode + 'a>(
    entries: &[(&'a str, &'a N)],
    depth: usize,
    out: &mut String,
) {
    if entries.is_empty() {
        out.push_str("{}");
        return;
    }

    out.push_str("{\n");
    for (i, (name, node)) in entries.iter().enumerate() {
        indent(depth + 1, out);
        let _ = write!(out, "{name:?}: ");
        render_value(*node, depth + 1, out);
        if i + 1 < entries.len() {
            out.push(',');
        }
        out.push('\n');
    }
    indent(depth, out);
    out.push('}');
}

fn render_value<N: DumpNode>(node: &N, depth: usize, out: &mut String) {
    match node.scalar() {
        Some(value) => out.push_str(&value.render()),
        None => render_object(&node.entries(), depth, out),
    }
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}
