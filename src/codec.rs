//! Codec service: serialize records to wire text and parse wire text back into records.

use crate::ast::Template;
use crate::checksum::{ChecksumFn, ChecksumRegistry};
use crate::parser::{compile, CompileError};
use crate::record::{FieldError, Record, RecordSpec};
use crate::walk;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("{0}")]
    Compile(#[from] CompileError),
    #[error("record {0} has no template")]
    MissingTemplate(String),
    #[error("unknown checksum function '{0}'")]
    UnknownChecksum(String),
    #[error("field access: {0}")]
    FieldAccess(#[from] FieldError),
    #[error("hook '{hook}' rejected {target}")]
    CallbackFailure { hook: String, target: String },
    #[error("expected {expected:?} at {position}, found {found:?}")]
    ContentMismatch {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("input ends before {expected:?} at {position}")]
    Truncated { position: usize, expected: String },
    #[error("field '{field}' has no value")]
    MissingValue { field: String },
    #[error("no end found for {node} at {position}")]
    BoundaryNotFound { node: &'static str, position: usize },
    #[error("sequence '{other}' has {found} elements, '{field}' has {expected}")]
    SequenceLengthMismatch {
        field: String,
        expected: usize,
        other: String,
        found: usize,
    },
    #[error("repeated segment at {span:?} has no sequence field to drive it")]
    UndrivenRepetition { span: (usize, usize) },
    #[error("no checksum scope named '{0}'")]
    UnknownChecksumScope(String),
    #[error("more than one checksum scope named '{0}'")]
    DuplicateChecksumScope(String),
    #[error("checksum scope '{0}' is not resolved yet")]
    ChecksumScopeUnresolved(String),
    #[error("checksum over scope '{0}' has no character representation")]
    ChecksumUnrepresentable(String),
    #[error("checksum '{reference}' mismatch: expected {expected:?}, found {found:?}")]
    ChecksumMismatch {
        reference: String,
        expected: char,
        found: char,
    },
    #[error("input continues after byte {consumed} of {total}")]
    TrailingInput { consumed: usize, total: usize },
    #[error("no candidate matched: {}", list_failures(.0))]
    CandidatesExhausted(Vec<CandidateFailure>),
}

impl CodecError {
    /// Errors that mean "the data is not there", which an Optional turns into absence.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CodecError::ContentMismatch { .. }
                | CodecError::Truncated { .. }
                | CodecError::MissingValue { .. }
                | CodecError::BoundaryNotFound { .. }
                | CodecError::ChecksumMismatch { .. }
        )
    }
}

/// Why one candidate of [`Codec::deserialize_any`] was rejected.
#[derive(Debug)]
pub struct CandidateFailure {
    pub candidate: String,
    pub error: CodecError,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.candidate, self.error)
    }
}

fn list_failures(failures: &[CandidateFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A record type to try in [`Codec::deserialize_any`], with the constructor
/// producing a fresh instance.
pub struct Candidate<'a, T> {
    name: String,
    build: Box<dyn Fn() -> T + 'a>,
}

impl<'a, T> Candidate<'a, T> {
    pub fn new<S: Into<String>, F: Fn() -> T + 'a>(name: S, build: F) -> Self {
        Candidate {
            name: name.into(),
            build: Box::new(build),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<'a, T: Default + 'a> Candidate<'a, T> {
    /// Candidate built with `T::default()`.
    pub fn of<S: Into<String>>(name: S) -> Self {
        Candidate::new(name, T::default)
    }
}

impl<'a> Candidate<'a, Box<dyn Record>> {
    /// Candidate for a concrete record type behind `Box<dyn Record>`.
    pub fn boxed<R: Record + Default + 'static, S: Into<String>>(name: S) -> Self {
        Candidate::new(name, || Box::new(R::default()) as Box<dyn Record>)
    }
}

impl<T> fmt::Debug for Candidate<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate").field("name", &self.name).finish()
    }
}

/// Entry point for converting records to and from wire text.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    checksums: ChecksumRegistry,
    complete_parse: bool,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a checksum function records can select through [`RecordSpec::checksum`].
    pub fn with_checksum<S: Into<String>>(mut self, id: S, function: ChecksumFn) -> Self {
        self.checksums.register(id, function);
        self
    }

    /// Reject messages with text left after the template is exhausted.
    pub fn complete_parse(mut self, on: bool) -> Self {
        self.complete_parse = on;
        self
    }

    /// Compile the template declared by `spec`.
    pub fn compile(&self, spec: &RecordSpec) -> Result<Template, CodecError> {
        let source = spec
            .template
            .as_deref()
            .ok_or_else(|| CodecError::MissingTemplate(spec.name.clone()))?;
        Ok(compile(source)?)
    }

    fn checksum_for(&self, spec: &RecordSpec) -> Result<ChecksumFn, CodecError> {
        self.checksums
            .get(&spec.checksum)
            .ok_or_else(|| CodecError::UnknownChecksum(spec.checksum.clone()))
    }

    fn run_type_hook<R: Record + ?Sized>(spec: &RecordSpec, record: &mut R) -> Result<(), CodecError> {
        if let Some(hook) = &spec.type_hook {
            if !record.invoke_hook(hook)? {
                return Err(CodecError::CallbackFailure {
                    hook: hook.clone(),
                    target: spec.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Render `record` with the template from its own spec.
    pub fn serialize<R: Record + ?Sized>(&self, record: &mut R) -> Result<String, CodecError> {
        let template = self.compile(&record.spec())?;
        self.serialize_with(&template, record)
    }

    /// Render `record` with an already compiled template.
    pub fn serialize_with<R: Record + ?Sized>(
        &self,
        template: &Template,
        record: &mut R,
    ) -> Result<String, CodecError> {
        let spec = record.spec();
        let checksum = self.checksum_for(&spec)?;
        Self::run_type_hook(&spec, record)?;
        let wire = walk::serialize(template, &spec, checksum, record)?;
        tracing::debug!(record = %spec.name, bytes = wire.len(), "serialized");
        Ok(wire)
    }

    /// Parse `message` into a fresh `R`.
    pub fn deserialize<R: Record + Default>(&self, message: &str) -> Result<R, CodecError> {
        let mut record = R::default();
        self.deserialize_into(&mut record, message)?;
        Ok(record)
    }

    /// Parse `message` into an existing record.
    pub fn deserialize_into<R: Record + ?Sized>(&self, record: &mut R, message: &str) -> Result<(), CodecError> {
        let template = self.compile(&record.spec())?;
        self.deserialize_with(&template, record, message)
    }

    /// Parse `message` into `record` with an already compiled template.
    pub fn deserialize_with<R: Record + ?Sized>(
        &self,
        template: &Template,
        record: &mut R,
        message: &str,
    ) -> Result<(), CodecError> {
        let spec = record.spec();
        let checksum = self.checksum_for(&spec)?;
        let consumed = walk::deserialize(template, &spec, checksum, record, message)?;
        if self.complete_parse && consumed < message.len() {
            return Err(CodecError::TrailingInput {
                consumed,
                total: message.len(),
            });
        }
        Self::run_type_hook(&spec, record)?;
        tracing::debug!(record = %spec.name, consumed, "deserialized");
        Ok(())
    }

    /// Try each candidate in order; the first one that parses `message` wins.
    pub fn deserialize_any<T: Record>(&self, message: &str, candidates: &[Candidate<'_, T>]) -> Result<T, CodecError> {
        let mut failures = Vec::new();
        for candidate in candidates {
            let mut record = (candidate.build)();
            match self.deserialize_into(&mut record, message) {
                Ok(()) => {
                    tracing::debug!(candidate = %candidate.name, "candidate matched");
                    return Ok(record);
                }
                Err(error) => {
                    tracing::debug!(candidate = %candidate.name, %error, "candidate rejected");
                    failures.push(CandidateFailure {
                        candidate: candidate.name.clone(),
                        error,
                    });
                }
            }
        }
        Err(CodecError::CandidatesExhausted(failures))
    }
}
