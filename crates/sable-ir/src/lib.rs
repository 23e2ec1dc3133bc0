//! Sable IR - In-Memory Intermediate Representation
//!
//! This crate implements the IR the Sable ahead-of-time JavaScript
//! compiler is built around: a whole compilation unit as a graph of
//! functions, basic blocks, instructions, variables and literals, with
//! use-def bookkeeping that keeps every operand edge consistent under
//! mutation.
//!
//! # Architecture
//!
//! A [`Module`] owns a single arena holding every node as a [`Value`];
//! everything else refers through [`ValueId`] handles. Two invariants
//! carry the whole compiler:
//!
//! 1. Every operand edge of an instruction is mirrored by an entry in the
//!    used value's user list, and vice versa, at every observation point.
//! 2. The [`ValueKind`] taxonomy is the single source of truth for class
//!    membership, and every per-kind behavior (destruction, names, side
//!    effects, operand constraints) dispatches over it.
//!
//! All graph mutation goes through the module so the arena can rewrite
//! back-links freely. Contract violations panic; this layer has no
//! recoverable errors.

pub mod arena;
pub mod function;
pub mod instruction;
pub mod kind;
pub mod module;
pub mod pretty;
pub mod scope;
pub mod types;
mod use_def;
pub mod value;
pub mod verify;

pub use arena::ValueId;
pub use function::{BasicBlock, DefinitionKind, Function, Parameter};
pub use instruction::{Instruction, OperandBitSet, SideEffectKind};
pub use kind::{ValueKind, KIND_TABLE};
pub use module::{CJSModule, Module};
pub use pretty::{dump_function, dump_module};
pub use scope::{Variable, VariableScope};
pub use types::Type;
pub use value::{GlobalObjectProperty, Literal, Use, Value};
pub use verify::{verify_module, verify_use_lists, VerifyError};
