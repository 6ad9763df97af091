//! Human-readable rendering of compiled templates (tree view for `tpl_check --tree`).

use crate::ast::{NodeId, NodeKind, Template};
use crate::symbols::pretty;
use std::fmt::Write;

/// One line describing a node, without indentation.
pub fn node_summary(template: &Template, id: NodeId) -> String {
    match template.kind(id) {
        NodeKind::Sequence => "sequence".to_string(),
        NodeKind::Literal(text) => format!("literal \"{}\"", pretty(text)),
        NodeKind::Symbol { name, .. } => format!("symbol <{}>", name),
        NodeKind::Field { name, length: Some(n) } => format!("field {} ({} chars)", name, n),
        NodeKind::Field { name, length: None } => format!("field {}", name),
        NodeKind::Optional => "optional".to_string(),
        NodeKind::Repeated { delimiter } => format!("repeated, delimiter \"{}\"", pretty(delimiter)),
        NodeKind::ChecksumScope { reference } => format!("checksum scope {}", reference),
        NodeKind::ChecksumPlaceholder { reference } => format!("checksum over {}", reference),
    }
}

/// Indented tree, one node per line, two spaces per level.
pub fn format_tree(template: &Template) -> String {
    let mut out = String::new();
    write_node(template, template.root(), 0, &mut out);
    out
}

fn write_node(template: &Template, id: NodeId, depth: usize, out: &mut String) {
    let (start, end) = template.span(id);
    let _ = writeln!(
        out,
        "{:indent$}{} [{}..{}]",
        "",
        node_summary(template, id),
        start,
        end,
        indent = depth * 2
    );
    for &child in template.children(id) {
        write_node(template, child, depth + 1, out);
    }
}
