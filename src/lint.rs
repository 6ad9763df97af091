//! Static checks over a compiled template.
//!
//! ## Rules
//!
//! - **Unresolved checksum reference**: every `!ref!` needs a `~...:ref~` scope.
//! - **Duplicate checksum scope**: a reference name may be declared once.
//! - **Placeholder before scope**: a checksum can only be computed once its scope
//!   has been walked, so the placeholder must come after the whole scope.
//! - **Adjacent unbounded fields**: `{a}{b}` cannot be split when parsing.
//! - **Undriven repetition**: a repeated segment needs at least one field that
//!   is not inside a nested optional to take its element count from.
//!
//! Run the linter via the `tpl_check` binary: `tpl_check templates.txt` or
//! `tpl_check < templates.txt`. Exit code 1 if any error-level findings.

use crate::ast::{NodeId, NodeKind, Template};

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Identifies which rule produced the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintRule {
    UnresolvedChecksumReference,
    DuplicateChecksumScope,
    PlaceholderBeforeScope,
    AdjacentUnboundedFields,
    UndrivenRepetition,
}

impl LintRule {
    pub fn name(self) -> &'static str {
        match self {
            LintRule::UnresolvedChecksumReference => "unresolved-checksum",
            LintRule::DuplicateChecksumScope => "duplicate-scope",
            LintRule::PlaceholderBeforeScope => "placeholder-before-scope",
            LintRule::AdjacentUnboundedFields => "adjacent-unbounded",
            LintRule::UndrivenRepetition => "undriven-repetition",
        }
    }
}

/// A single lint message, located by the byte span of the offending node.
#[derive(Debug, Clone)]
pub struct LintMessage {
    pub node: NodeId,
    pub span: (usize, usize),
    pub rule: LintRule,
    pub severity: Severity,
    pub message: String,
}

/// Run all lint rules on a template. Returns messages in source order.
pub fn lint(template: &Template) -> Vec<LintMessage> {
    let mut out = Vec::new();
    let order = template.preorder();
    let rank = |id: NodeId| order.iter().position(|&n| n == id).unwrap_or(usize::MAX);
    let mut push = |id: NodeId, rule: LintRule, severity: Severity, message: String| {
        out.push(LintMessage {
            node: id,
            span: template.span(id),
            rule,
            severity,
            message,
        })
    };

    for (placeholder, reference) in template.checksum_placeholders() {
        let scopes: Vec<NodeId> = template.checksum_scopes(reference).collect();
        match scopes.as_slice() {
            [] => push(
                placeholder,
                LintRule::UnresolvedChecksumReference,
                Severity::Error,
                format!("checksum !{}! has no matching scope", reference),
            ),
            [scope, ..] => {
                let last = template.descendants(*scope).last().copied().unwrap_or(*scope);
                if rank(placeholder) <= rank(last) {
                    push(
                        placeholder,
                        LintRule::PlaceholderBeforeScope,
                        Severity::Error,
                        format!("checksum !{}! comes before its scope is complete", reference),
                    );
                }
            }
        }
    }

    for &id in &order {
        match template.kind(id) {
            NodeKind::ChecksumScope { reference } => {
                let first = template.checksum_scopes(reference).next();
                if first != Some(id) {
                    push(
                        id,
                        LintRule::DuplicateChecksumScope,
                        Severity::Error,
                        format!("checksum scope ~{}~ declared more than once", reference),
                    );
                }
            }
            NodeKind::Repeated { .. } if template.driving_fields(id).is_empty() => push(
                id,
                LintRule::UndrivenRepetition,
                Severity::Warning,
                "repeated segment has no field outside optionals to count elements".to_string(),
            ),
            _ => {}
        }
        for pair in template.children(id).windows(2) {
            if let (
                NodeKind::Field { name: a, length: None },
                NodeKind::Field { name: b, length: None },
            ) = (template.kind(pair[0]), template.kind(pair[1]))
            {
                push(
                    pair[1],
                    LintRule::AdjacentUnboundedFields,
                    Severity::Warning,
                    format!("fields {{{}}} and {{{}}} have nothing between them", a, b),
                );
            }
        }
    }

    out.sort_by_key(|m| m.span.0);
    out
}
