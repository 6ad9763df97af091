//! Compile template source into an AST using PEST.

use crate::ast::{NodeId, NodeKind, Template};
use crate::symbols;
use pest::error::{InputLocation, LineColLocation};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct TemplateParser;

/// Malformed template. `span` is the byte range of the offending text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("template error at line {line}, column {column}: {message}")]
pub struct CompileError {
    pub span: (usize, usize),
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl CompileError {
    fn at(pair: &Pair<Rule>, message: String) -> Self {
        let span = pair.as_span();
        let (line, column) = span.start_pos().line_col();
        CompileError {
            span: (span.start(), span.end()),
            line,
            column,
            message,
        }
    }
}

impl From<pest::error::Error<Rule>> for CompileError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let span = match e.location {
            InputLocation::Pos(p) => (p, p),
            InputLocation::Span(s) => s,
        };
        let (line, column) = match e.line_col {
            LineColLocation::Pos(lc) => lc,
            LineColLocation::Span(lc, _) => lc,
        };
        CompileError {
            span,
            line,
            column,
            message: e.variant.message().into_owned(),
        }
    }
}

/// Compile template source into a [`Template`].
pub fn compile(source: &str) -> Result<Template, CompileError> {
    let mut pairs = TemplateParser::parse(Rule::template, source)?;
    let mut template = Template::new();
    template.set_root_span((0, source.len()));
    let root = template.root();
    if let Some(top) = pairs.next() {
        for inner in top.into_inner() {
            if inner.as_rule() == Rule::sequence {
                build_sequence(&mut template, root, inner)?;
            }
        }
    }
    tracing::debug!(nodes = template.len(), "compiled template");
    Ok(template)
}

fn build_sequence(
    template: &mut Template,
    parent: NodeId,
    pair: Pair<Rule>,
) -> Result<(), CompileError> {
    for part in pair.into_inner() {
        build_part(template, parent, part)?;
    }
    Ok(())
}

fn build_part(template: &mut Template, parent: NodeId, pair: Pair<Rule>) -> Result<(), CompileError> {
    let span = (pair.as_span().start(), pair.as_span().end());
    match pair.as_rule() {
        Rule::literal => {
            template.push(parent, NodeKind::Literal(unescape(pair.as_str())), span);
        }
        Rule::symbol => {
            let name_pair = first_inner(&pair, "symbol name")?;
            let name = name_pair.as_str();
            let character = symbols::character(name).ok_or_else(|| {
                CompileError::at(&name_pair, format!("unknown symbol <{}>", name))
            })?;
            template.push(
                parent,
                NodeKind::Symbol {
                    name: name.to_string(),
                    character,
                },
                span,
            );
        }
        Rule::field => {
            let mut length = None;
            let mut name = None;
            for inner in pair.clone().into_inner() {
                match inner.as_rule() {
                    Rule::field_length => {
                        let n = inner.as_str().parse::<usize>().map_err(|_| {
                            CompileError::at(&inner, format!("field length {} out of range", inner.as_str()))
                        })?;
                        length = Some(n);
                    }
                    Rule::field_name => name = Some(inner.as_str().to_string()),
                    _ => {}
                }
            }
            let name = name.ok_or_else(|| CompileError::at(&pair, "field: missing name".to_string()))?;
            template.push(parent, NodeKind::Field { name, length }, span);
        }
        Rule::optional => {
            let id = template.push(parent, NodeKind::Optional, span);
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::sequence {
                    build_sequence(template, id, inner)?;
                }
            }
        }
        Rule::repeated => {
            let delimiter = pair
                .clone()
                .into_inner()
                .find(|p| p.as_rule() == Rule::delimiter)
                .map(|p| symbols::resolve_symbols(p.as_str()))
                .ok_or_else(|| CompileError::at(&pair, "repeated: missing delimiter".to_string()))?;
            let id = template.push(parent, NodeKind::Repeated { delimiter }, span);
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::sequence {
                    build_sequence(template, id, inner)?;
                }
            }
        }
        Rule::checksum_scope => {
            let reference = pair
                .clone()
                .into_inner()
                .find(|p| p.as_rule() == Rule::scope_reference)
                .map(|p| unescape(p.as_str()))
                .ok_or_else(|| CompileError::at(&pair, "checksum scope: missing reference".to_string()))?;
            let id = template.push(parent, NodeKind::ChecksumScope { reference }, span);
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::sequence {
                    build_sequence(template, id, inner)?;
                }
            }
        }
        Rule::checksum_placeholder => {
            let reference = unescape(first_inner(&pair, "checksum reference")?.as_str());
            template.push(parent, NodeKind::ChecksumPlaceholder { reference }, span);
        }
        other => {
            return Err(CompileError::at(&pair, format!("unexpected rule {:?}", other)));
        }
    }
    Ok(())
}

fn first_inner<'i>(pair: &Pair<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>, CompileError> {
    pair.clone()
        .into_inner()
        .next()
        .ok_or_else(|| CompileError::at(pair, format!("missing {}", what)))
}

/// Drop the escape character, keeping whatever it escaped.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}
