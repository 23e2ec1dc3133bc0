//! String interning
//!
//! Maps strings to small integer handles. Two [`Identifier`]s compare equal
//! iff they were interned from the same string, so equality and hashing are
//! integer operations.

use rustc_hash::FxHashMap;

/// Handle to an interned string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(u32);

impl Identifier {
    /// Get the raw handle value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// String interning table
#[derive(Debug, Default)]
pub struct Interner {
    map: FxHashMap<Box<str>, u32>,
    strings: Vec<Box<str>>,
}

impl Interner {
    /// Create an empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its handle
    ///
    /// Interning the same string twice returns the same handle.
    pub fn intern(&mut self, s: &str) -> Identifier {
        if let Some(&id) = self.map.get(s) {
            return Identifier(id);
        }
        let id = u32::try_from(self.strings.len())
            .unwrap_or_else(|_| panic!("interner overflow: {} strings", self.strings.len()));
        self.map.insert(s.into(), id);
        self.strings.push(s.into());
        Identifier(id)
    }

    /// Resolve a handle back to its string
    pub fn resolve(&self, id: Identifier) -> &str {
        &self.strings[id.0 as usize]
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
