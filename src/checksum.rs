//! Checksum functions computed over checksum-scope text.
//!
//! A function maps the scope text to exactly one character. `None` means the
//! result has no character representation.

use std::collections::HashMap;
use std::fmt;

pub type ChecksumFn = fn(&str) -> Option<char>;

/// Identity of the default checksum.
pub const XOR: &str = "xor";

/// Running XOR over every character, starting from `'\0'`.
pub fn xor(content: &str) -> Option<char> {
    let folded = content.chars().fold(0u32, |acc, c| acc ^ u32::from(c));
    char::from_u32(folded)
}

/// Checksum functions by identity.
#[derive(Clone)]
pub struct ChecksumRegistry {
    functions: HashMap<String, ChecksumFn>,
}

impl Default for ChecksumRegistry {
    fn default() -> Self {
        let mut functions: HashMap<String, ChecksumFn> = HashMap::new();
        functions.insert(XOR.to_string(), xor);
        ChecksumRegistry { functions }
    }
}

impl fmt::Debug for ChecksumRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.functions.keys().collect();
        ids.sort();
        f.debug_struct("ChecksumRegistry").field("ids", &ids).finish()
    }
}

impl ChecksumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `id`, replacing any previous entry.
    pub fn register<S: Into<String>>(&mut self, id: S, function: ChecksumFn) {
        self.functions.insert(id.into(), function);
    }

    pub fn get(&self, id: &str) -> Option<ChecksumFn> {
        self.functions.get(id).copied()
    }
}
