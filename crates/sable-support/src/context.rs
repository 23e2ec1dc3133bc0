//! Compilation context
//!
//! The ambient state shared by every stage of a single compilation:
//! the identifier table and segmentation info. Every live IR value can
//! reach the context through its owner chain.

use crate::interner::{Identifier, Interner};

/// Per-compilation ambient state
#[derive(Debug, Default)]
pub struct Context {
    identifiers: Interner,
}

impl Context {
    /// Create a fresh context
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string as an [`Identifier`]
    pub fn get_identifier(&mut self, s: &str) -> Identifier {
        self.identifiers.intern(s)
    }

    /// Resolve an identifier back to its text
    pub fn ident_str(&self, id: Identifier) -> &str {
        self.identifiers.resolve(id)
    }
}

/// An inclusive range of CommonJS module indices forming one output segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRange {
    /// Index of the first module in the segment
    pub first: u32,
    /// Index of the last module in the segment (inclusive)
    pub last: u32,
}
