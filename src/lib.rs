//! # wiretext: template DSL for textual message layouts
//!
//! One template describes the layout of a text message. The same compiled
//! template renders a record to wire text and parses wire text back into a
//! record, so the two directions cannot drift apart.
//!
//! ## Template syntax
//!
//! - `{name}`: field bound to the record field `name`, unbounded
//! - `{N:name}`: field with fixed width N (right-padded with spaces, truncated)
//! - `<NAME>`: ASCII control character by name (`<STX>`, `<CR>`, `<LF>`, ...)
//! - `[...]`: optional segment, left out when its content is not available
//! - `(...:d)`: repeated segment, once per element of its sequence fields, joined by `d`
//! - `~...:ref~`: checksum scope named `ref`
//! - `!ref!`: one checksum character computed over scope `ref`
//! - anything else is literal text; `\` escapes the next character
//!
//! ## Example
//!
//! ```
//! use wiretext::{Codec, MapRecord, RecordSpec, Value};
//!
//! let spec = RecordSpec::new("Greeting").template("my-\\{name\\}-is-{name}<CR>");
//! let mut record = MapRecord::new(spec.clone()).with("name", "John Doe");
//! let codec = Codec::new();
//! let wire = codec.serialize(&mut record).unwrap();
//! assert_eq!(wire, "my-{name}-is-John Doe\r");
//!
//! let mut parsed = MapRecord::new(spec);
//! codec.deserialize_into(&mut parsed, &wire).unwrap();
//! assert_eq!(parsed.get("name"), Some(&Value::text("John Doe")));
//! ```
//!
//! Static structs implement [`Record`] with the [`record!`] macro. See
//! `tests/integration.rs` for complete message shapes.

pub mod ast;
pub mod checksum;
pub mod codec;
pub mod dump;
pub mod lint;
pub mod parser;
pub mod record;
pub mod symbols;
pub mod value;
pub mod walk;

pub use ast::{NodeId, NodeKind, Template};
pub use checksum::{ChecksumFn, ChecksumRegistry};
pub use codec::{Candidate, CandidateFailure, Codec, CodecError};
pub use lint::{lint, LintMessage, LintRule, Severity};
pub use parser::{compile, CompileError};
pub use record::{FieldError, FieldValue, MapRecord, Record, RecordSpec, Representation};
pub use value::Value;
