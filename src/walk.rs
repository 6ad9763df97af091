//! Two-way walk of a compiled template against a record.
//!
//! Serializing renders every node left to right, reading fields from the
//! record. Deserializing resolves each node's span inside the message and
//! writes fields back. Everything resolved during a pass (content, length,
//! absence, repetition index) lives in a [`Walker`] that is dropped when the
//! pass ends, so the [`Template`] itself is never mutated.
//!
//! Positions are byte offsets into the current window: the whole message for
//! children of the root, the resolved span of the parent for everything else.

use crate::ast::{NodeId, NodeKind, Template};
use crate::checksum::ChecksumFn;
use crate::codec::CodecError;
use crate::record::{FieldError, Record, RecordSpec};
use crate::value::Value;

/// Render `record` through `template`.
pub fn serialize<R: Record + ?Sized>(
    template: &Template,
    spec: &RecordSpec,
    checksum: ChecksumFn,
    record: &mut R,
) -> Result<String, CodecError> {
    let mut walker = Walker::new(template, spec, checksum);
    walker.serialize_node(template.root(), record)
}

/// Parse `message` through `template` into `record`. Returns the number of
/// bytes the root sequence accounted for.
pub fn deserialize<R: Record + ?Sized>(
    template: &Template,
    spec: &RecordSpec,
    checksum: ChecksumFn,
    record: &mut R,
    message: &str,
) -> Result<usize, CodecError> {
    let mut walker = Walker::new(template, spec, checksum);
    let root = template.root();
    walker.deserialize_node(root, record, message)?;
    Ok(walker.length(root))
}

#[derive(Debug, Clone, Default)]
struct NodeState {
    content: Option<String>,
    length: usize,
    absent: bool,
    index: usize,
}

struct Walker<'t> {
    template: &'t Template,
    spec: &'t RecordSpec,
    checksum: ChecksumFn,
    state: Vec<NodeState>,
}

impl<'t> Walker<'t> {
    fn new(template: &'t Template, spec: &'t RecordSpec, checksum: ChecksumFn) -> Self {
        Walker {
            template,
            spec,
            checksum,
            state: vec![NodeState::default(); template.len()],
        }
    }

    fn reset_children(&mut self, id: NodeId) {
        for d in self.template.descendants(id) {
            self.state[d.index()] = NodeState::default();
        }
    }

    fn store(&mut self, id: NodeId, text: String) {
        let st = &mut self.state[id.index()];
        st.length = text.len();
        st.content = Some(text);
    }

    // ---- resolved geometry ----

    fn length(&self, id: NodeId) -> usize {
        let template = self.template;
        match template.kind(id) {
            NodeKind::Literal(text) => text.len(),
            NodeKind::Symbol { character, .. } => character.len_utf8(),
            NodeKind::Optional if self.state[id.index()].absent => 0,
            NodeKind::Sequence | NodeKind::Optional => {
                template.children(id).iter().map(|&c| self.length(c)).sum()
            }
            _ => self.state[id.index()].length,
        }
    }

    fn position(&self, id: NodeId) -> usize {
        self.template
            .left_siblings(id)
            .iter()
            .map(|&s| self.length(s))
            .sum()
    }

    /// Text the node stands for right now, if known. Sequences and Optionals
    /// expose the prefix made of children whose content is known.
    fn content(&self, id: NodeId) -> Option<String> {
        let template = self.template;
        match template.kind(id) {
            NodeKind::Literal(text) => Some(text.clone()),
            NodeKind::Symbol { character, .. } => Some(character.to_string()),
            NodeKind::Optional if self.state[id.index()].absent => Some(String::new()),
            NodeKind::Sequence | NodeKind::Optional => {
                let mut out = String::new();
                for &c in template.children(id) {
                    match self.content(c) {
                        Some(text) => out.push_str(&text),
                        None => break,
                    }
                }
                Some(out)
            }
            _ => self.state[id.index()].content.clone(),
        }
    }

    fn anchor(&self, id: NodeId) -> Option<String> {
        self.content(id).filter(|text| !text.is_empty())
    }

    /// Width in chars when it is known before the node is parsed.
    fn fixed_width(&self, id: NodeId) -> Option<usize> {
        match self.template.kind(id) {
            NodeKind::Literal(text) => Some(text.chars().count()),
            NodeKind::Symbol { .. } | NodeKind::ChecksumPlaceholder { .. } => Some(1),
            NodeKind::Field {
                length: Some(n), ..
            } => Some(*n),
            _ => None,
        }
    }

    /// End of the span starting at `pos` for a node that does not delimit itself.
    ///
    /// The first right sibling with known, non-empty content is searched for.
    /// Siblings passed over on the way still sit between the node and the
    /// anchor, so their fixed widths are taken off the end. A missing Optional
    /// sibling is skipped. Inside an Optional a missing anchor keeps the
    /// search going but the node still ends up unresolved. With no anchor
    /// left, the end is the window end minus the width of the remaining
    /// siblings when those widths are fixed; a checksum scope may also end
    /// right after its last child's text.
    fn locate_end(&self, id: NodeId, window: &str, pos: usize) -> Option<usize> {
        let template = self.template;
        let rest = window.get(pos..)?;
        let own_optional = matches!(template.kind(id), NodeKind::Optional);
        let siblings = template.right_siblings(id);
        let mut missed = false;
        // Chars taken by unanchored siblings so far; `None` once one has no fixed width.
        let mut skipped = Some(0);
        for &sibling in siblings {
            let Some(anchor) = self.anchor(sibling) else {
                skipped = skipped.zip(self.fixed_width(sibling)).map(|(a, b)| a + b);
                continue;
            };
            if let Some(found) = rest.find(&anchor) {
                let at = pos + found;
                let end = match skipped {
                    Some(0) | None => at,
                    Some(n) => end_before_chars(window.get(..at)?, n)?,
                };
                tracing::trace!(node = %id, sibling = %sibling, end, "anchor found");
                return (end >= pos).then(|| self.settle_scope_end(id, window, pos, end));
            }
            if matches!(template.kind(sibling), NodeKind::Optional) {
                continue;
            }
            if own_optional {
                missed = true;
                continue;
            }
            tracing::trace!(node = %id, sibling = %sibling, "anchor missing");
            return None;
        }
        if missed {
            return None;
        }

        if !siblings.is_empty() {
            let tail: Option<usize> = siblings.iter().map(|&s| self.fixed_width(s)).sum();
            if let Some(tail) = tail {
                let end = end_before_chars(window, tail)?;
                return (end >= pos).then(|| self.settle_scope_end(id, window, pos, end));
            }
        }

        if matches!(template.kind(id), NodeKind::ChecksumScope { .. }) {
            if let Some(last) = template.children(id).last().and_then(|&c| self.anchor(c)) {
                return rest.find(&last).map(|found| pos + found + last.len());
            }
        }
        Some(window.len())
    }

    /// A checksum scope ends with its last child's text when that text is known.
    /// An end taken from the siblings that does not (the checksum character can
    /// equal the anchor after it) gives way to the first occurrence of that text.
    fn settle_scope_end(&self, id: NodeId, window: &str, pos: usize, end: usize) -> usize {
        let template = self.template;
        if !matches!(template.kind(id), NodeKind::ChecksumScope { .. }) {
            return end;
        }
        let Some(last) = template.children(id).last().and_then(|&c| self.anchor(c)) else {
            return end;
        };
        if window.get(pos..end).is_some_and(|span| span.ends_with(&last)) {
            return end;
        }
        window
            .get(pos..)
            .and_then(|rest| rest.find(&last))
            .map_or(end, |found| pos + found + last.len())
    }

    /// Resolve the span of a composite node.
    fn extract_span(&self, id: NodeId, window: &str) -> Result<String, CodecError> {
        let pos = self.position(id);
        let end = self
            .locate_end(id, window, pos)
            .ok_or_else(|| CodecError::BoundaryNotFound {
                node: self.template.kind(id).label(),
                position: pos,
            })?;
        window
            .get(pos..end)
            .map(str::to_string)
            .ok_or_else(|| CodecError::Truncated {
                position: pos,
                expected: self.template.kind(id).label().to_string(),
            })
    }

    // ---- record access ----

    fn run_field_hook<R: Record + ?Sized>(&self, field: &str, record: &mut R) -> Result<(), CodecError> {
        if let Some(hook) = self.spec.hook_for(field) {
            if !record.invoke_hook(hook)? {
                return Err(CodecError::CallbackFailure {
                    hook: hook.to_string(),
                    target: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Element index when `id` sits inside a Repeated node.
    fn repetition_index(&self, id: NodeId) -> Option<usize> {
        self.template
            .enclosing_repeated(id)
            .map(|rep| self.state[rep.index()].index)
    }

    // ---- serialize ----

    fn serialize_node<R: Record + ?Sized>(&mut self, id: NodeId, record: &mut R) -> Result<String, CodecError> {
        let template = self.template;
        let text = match template.kind(id) {
            NodeKind::Sequence | NodeKind::ChecksumScope { .. } => self.serialize_children(id, record)?,
            NodeKind::Literal(text) => text.clone(),
            NodeKind::Symbol { character, .. } => character.to_string(),
            NodeKind::Field { name, length } => self.serialize_field(id, name, *length, record)?,
            NodeKind::Optional => match self.serialize_children(id, record) {
                Ok(text) => text,
                Err(e) if e.is_recoverable() => {
                    tracing::debug!(node = %id, error = %e, "optional segment left out");
                    self.reset_children(id);
                    self.state[id.index()].absent = true;
                    String::new()
                }
                Err(e) => return Err(e),
            },
            NodeKind::Repeated { delimiter } => self.serialize_repeated(id, delimiter, record)?,
            NodeKind::ChecksumPlaceholder { reference } => self.compute_checksum(reference)?.to_string(),
        };
        self.store(id, text.clone());
        Ok(text)
    }

    fn serialize_children<R: Record + ?Sized>(&mut self, id: NodeId, record: &mut R) -> Result<String, CodecError> {
        let mut out = String::new();
        for &child in self.template.children(id) {
            out.push_str(&self.serialize_node(child, record)?);
        }
        Ok(out)
    }

    fn serialize_field<R: Record + ?Sized>(
        &mut self,
        id: NodeId,
        name: &str,
        length: Option<usize>,
        record: &mut R,
    ) -> Result<String, CodecError> {
        self.run_field_hook(name, record)?;
        let mut value = record.read_field(name)?;
        if let Some(index) = self.repetition_index(id) {
            value = match value {
                Value::List(mut items) if index < items.len() => items.swap_remove(index),
                Value::List(_) | Value::Null => Value::Null,
                Value::Text(_) => return Err(FieldError::NotASequence(name.to_string()).into()),
            };
        }
        let text = match value {
            Value::Text(text) => text,
            Value::Null => {
                return Err(CodecError::MissingValue {
                    field: name.to_string(),
                })
            }
            Value::List(_) => return Err(FieldError::NotAScalar(name.to_string()).into()),
        };
        let text = match self.spec.representation(name) {
            Some(representation) => representation.encode(&text).to_string(),
            None => text,
        };
        Ok(match length {
            Some(n) => fit(&text, n),
            None => text,
        })
    }

    fn serialize_repeated<R: Record + ?Sized>(
        &mut self,
        id: NodeId,
        delimiter: &str,
        record: &mut R,
    ) -> Result<String, CodecError> {
        let template = self.template;
        let drivers = template.driving_fields(id);
        if drivers.is_empty() {
            return Err(CodecError::UndrivenRepetition {
                span: template.span(id),
            });
        }
        let mut count: Option<(&str, usize)> = None;
        for field in drivers {
            let NodeKind::Field { name, .. } = template.kind(field) else {
                continue;
            };
            let len = match record.read_field(name)? {
                Value::List(items) => items.len(),
                Value::Null => 0,
                Value::Text(_) => return Err(FieldError::NotASequence(name.clone()).into()),
            };
            match count {
                None => count = Some((name.as_str(), len)),
                Some((first, expected)) if expected != len => {
                    return Err(CodecError::SequenceLengthMismatch {
                        field: first.to_string(),
                        expected,
                        other: name.clone(),
                        found: len,
                    });
                }
                Some(_) => {}
            }
        }
        let count = count.map_or(0, |(_, n)| n);
        let mut pieces = Vec::with_capacity(count);
        for index in 0..count {
            self.reset_children(id);
            self.state[id.index()].index = index;
            pieces.push(self.serialize_children(id, record)?);
        }
        self.reset_children(id);
        Ok(pieces.join(delimiter))
    }

    fn compute_checksum(&self, reference: &str) -> Result<char, CodecError> {
        let scope = self.scope(reference)?;
        let text = self.state[scope.index()]
            .content
            .as_deref()
            .ok_or_else(|| CodecError::ChecksumScopeUnresolved(reference.to_string()))?;
        (self.checksum)(text).ok_or_else(|| CodecError::ChecksumUnrepresentable(reference.to_string()))
    }

    fn scope(&self, reference: &str) -> Result<NodeId, CodecError> {
        let mut scopes = self.template.checksum_scopes(reference);
        let scope = scopes
            .next()
            .ok_or_else(|| CodecError::UnknownChecksumScope(reference.to_string()))?;
        if scopes.next().is_some() {
            return Err(CodecError::DuplicateChecksumScope(reference.to_string()));
        }
        Ok(scope)
    }

    // ---- deserialize ----

    fn deserialize_node<R: Record + ?Sized>(
        &mut self,
        id: NodeId,
        record: &mut R,
        window: &str,
    ) -> Result<(), CodecError> {
        let template = self.template;
        match template.kind(id) {
            NodeKind::Sequence => self.deserialize_children(id, record, window),
            NodeKind::Literal(text) => self.expect_text(id, text, window),
            NodeKind::Symbol { character, .. } => {
                let mut buf = [0u8; 4];
                self.expect_text(id, character.encode_utf8(&mut buf), window)
            }
            NodeKind::Field { name, length } => self.deserialize_field(id, name, *length, record, window),
            NodeKind::Optional => self.deserialize_optional(id, record, window),
            NodeKind::Repeated { delimiter } => self.deserialize_repeated(id, delimiter, record, window),
            NodeKind::ChecksumScope { .. } => {
                let span = self.extract_span(id, window)?;
                self.store(id, span.clone());
                self.deserialize_children(id, record, &span)
            }
            NodeKind::ChecksumPlaceholder { reference } => self.verify_checksum(id, reference, window),
        }
    }

    fn deserialize_children<R: Record + ?Sized>(
        &mut self,
        id: NodeId,
        record: &mut R,
        window: &str,
    ) -> Result<(), CodecError> {
        for &child in self.template.children(id) {
            self.deserialize_node(child, record, window)?;
        }
        Ok(())
    }

    fn expect_text(&self, id: NodeId, expected: &str, window: &str) -> Result<(), CodecError> {
        let pos = self.position(id);
        let rest = window.get(pos..).unwrap_or("");
        if rest.starts_with(expected) {
            return Ok(());
        }
        let wanted = expected.chars().count();
        if rest.chars().count() < wanted {
            return Err(CodecError::Truncated {
                position: pos,
                expected: expected.to_string(),
            });
        }
        Err(CodecError::ContentMismatch {
            position: pos,
            expected: expected.to_string(),
            found: rest.chars().take(wanted).collect(),
        })
    }

    fn deserialize_field<R: Record + ?Sized>(
        &mut self,
        id: NodeId,
        name: &str,
        length: Option<usize>,
        record: &mut R,
        window: &str,
    ) -> Result<(), CodecError> {
        let pos = self.position(id);
        let span = match length {
            Some(n) => take_chars(window, pos, n),
            None => self
                .locate_end(id, window, pos)
                .filter(|&end| end > pos)
                .and_then(|end| window.get(pos..end)),
        };
        let Some(text) = span else {
            tracing::trace!(node = %id, field = name, position = pos, "field absent");
            let st = &mut self.state[id.index()];
            st.content = None;
            // Bytes of the padding the field would have rendered as.
            st.length = length.map_or(0, |n| fit("", n).len());
            return Ok(());
        };
        self.store(id, text.to_string());

        let runtime = match self.spec.representation(name) {
            Some(representation) => representation.decode(text).to_string(),
            None => text.to_string(),
        };
        match self.repetition_index(id) {
            Some(index) => {
                let mut current = record.read_field(name)?;
                if !current.set_element(index, Value::Text(runtime)) {
                    return Err(FieldError::NotASequence(name.to_string()).into());
                }
                record.write_field(name, current)?;
            }
            None => record.write_field(name, Value::Text(runtime))?,
        }
        self.run_field_hook(name, record)
    }

    fn deserialize_optional<R: Record + ?Sized>(
        &mut self,
        id: NodeId,
        record: &mut R,
        window: &str,
    ) -> Result<(), CodecError> {
        let template = self.template;
        let mut snapshot = Vec::new();
        for name in template.field_names(id) {
            snapshot.push((name, record.read_field(name)?));
        }
        let outcome = match self.extract_span(id, window) {
            Ok(span) => self.deserialize_children(id, record, &span),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                tracing::debug!(node = %id, error = %e, "optional segment absent");
                self.reset_children(id);
                self.state[id.index()].absent = true;
                for (name, before) in snapshot {
                    if record.read_field(name)? != before {
                        record.write_field(name, before)?;
                    }
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn deserialize_repeated<R: Record + ?Sized>(
        &mut self,
        id: NodeId,
        delimiter: &str,
        record: &mut R,
        window: &str,
    ) -> Result<(), CodecError> {
        let span = self.extract_span(id, window)?;
        self.store(id, span.clone());
        let mut count = 0;
        for (index, token) in span.split(delimiter).filter(|t| !t.is_empty()).enumerate() {
            self.reset_children(id);
            self.state[id.index()].index = index;
            self.deserialize_children(id, record, token)?;
            count = index + 1;
        }
        self.reset_children(id);

        // Elements left over from earlier contents of the record.
        let template = self.template;
        for field in template.driving_fields(id) {
            let NodeKind::Field { name, .. } = template.kind(field) else {
                continue;
            };
            if let Value::List(mut items) = record.read_field(name)? {
                if items.len() > count {
                    items.truncate(count);
                    record.write_field(name, Value::List(items))?;
                }
            }
        }
        Ok(())
    }

    fn verify_checksum(&mut self, id: NodeId, reference: &str, window: &str) -> Result<(), CodecError> {
        let pos = self.position(id);
        let found = window
            .get(pos..)
            .and_then(|rest| rest.chars().next())
            .ok_or_else(|| CodecError::Truncated {
                position: pos,
                expected: format!("checksum !{}!", reference),
            })?;
        self.store(id, found.to_string());
        let expected = self.compute_checksum(reference)?;
        if found != expected {
            return Err(CodecError::ChecksumMismatch {
                reference: reference.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }
}

/// Right-pad with spaces or truncate to exactly `n` chars.
fn fit(text: &str, n: usize) -> String {
    let mut out: String = text.chars().take(n).collect();
    let have = out.chars().count();
    out.extend(std::iter::repeat(' ').take(n - have));
    out
}

/// The `n` chars starting at byte `pos`; `None` when fewer remain or `n` is 0.
fn take_chars(window: &str, pos: usize, n: usize) -> Option<&str> {
    if n == 0 {
        return None;
    }
    let rest = window.get(pos..)?;
    let mut ends = rest.char_indices().map(|(i, c)| i + c.len_utf8());
    let end = ends.nth(n - 1)?;
    rest.get(..end)
}

/// Byte offset `n` chars before the end of `window`.
fn end_before_chars(window: &str, n: usize) -> Option<usize> {
    if n == 0 {
        return Some(window.len());
    }
    window.char_indices().rev().nth(n - 1).map(|(i, _)| i)
}
