//! Sable Compiler Support
//!
//! Shared infrastructure consumed by every stage of the compiler:
//! string interning, the ambient [`Context`], and source positions.

pub mod context;
pub mod interner;
pub mod source;

pub use context::{Context, SegmentRange};
pub use interner::{Identifier, Interner};
pub use source::{SourceLoc, SourceRange};
