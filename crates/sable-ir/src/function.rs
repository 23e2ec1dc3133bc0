//! Functions, basic blocks and parameters

use sable_support::{Identifier, SourceRange};

use crate::arena::ValueId;

/// How a function was defined in source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    /// A plain `function` declaration or expression
    Es5Function,
    /// A `class` constructor
    Es6Constructor,
    /// An arrow function
    Es6Arrow,
    /// A shorthand object or class method
    Es6Method,
}

/// Function payload
///
/// Owns (through the module's arena) its parameters, the optional `this`
/// parameter, its scopes, and an ordered list of basic blocks. A function
/// is itself a value: its users are the call and closure-creating
/// instructions referencing it.
#[derive(Debug)]
pub struct Function {
    pub(crate) original_or_inferred_name: Identifier,
    pub(crate) internal_name: Identifier,
    pub(crate) definition_kind: DefinitionKind,
    pub(crate) strict_mode: bool,
    pub(crate) is_global: bool,
    pub(crate) source_range: SourceRange,
    pub(crate) parameters: Vec<ValueId>,
    pub(crate) this_parameter: Option<ValueId>,
    pub(crate) external_scopes: Vec<ValueId>,
    pub(crate) function_scope: ValueId,
    pub(crate) blocks: Vec<ValueId>,
}

impl Function {
    /// The source-level or inferred name
    pub fn original_name(&self) -> Identifier {
        self.original_or_inferred_name
    }

    /// The module-unique internal name
    pub fn internal_name(&self) -> Identifier {
        self.internal_name
    }

    /// How the function was defined
    pub fn definition_kind(&self) -> DefinitionKind {
        self.definition_kind
    }

    /// Whether the function body is strict mode code
    pub fn strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// Whether this is the module's global function
    pub fn is_global(&self) -> bool {
        self.is_global
    }

    /// The source range of the definition
    pub fn source_range(&self) -> SourceRange {
        self.source_range
    }

    /// Ordered parameter list, `this` excluded
    pub fn parameters(&self) -> &[ValueId] {
        &self.parameters
    }

    /// The `this` parameter, if one was created
    pub fn this_parameter(&self) -> Option<ValueId> {
        self.this_parameter
    }

    /// Scopes captured from enclosing functions
    pub fn external_scopes(&self) -> &[ValueId] {
        &self.external_scopes
    }

    /// The function's own scope
    pub fn function_scope(&self) -> ValueId {
        self.function_scope
    }

    /// Ordered basic block list; the first block is the entry
    pub fn blocks(&self) -> &[ValueId] {
        &self.blocks
    }
}

/// Basic block payload
///
/// An ordered instruction list inside one function. A block is itself a
/// value so terminators can take it as a branch target operand.
#[derive(Debug)]
pub struct BasicBlock {
    pub(crate) parent: ValueId,
    pub(crate) instructions: Vec<ValueId>,
}

impl BasicBlock {
    /// The owning function
    pub fn parent(&self) -> ValueId {
        self.parent
    }

    /// Ordered instruction list
    pub fn instructions(&self) -> &[ValueId] {
        &self.instructions
    }
}

/// Parameter payload
#[derive(Debug)]
pub struct Parameter {
    pub(crate) parent: ValueId,
    pub(crate) name: Identifier,
}

impl Parameter {
    /// The owning function
    pub fn parent(&self) -> ValueId {
        self.parent
    }

    /// The parameter name
    pub fn name(&self) -> Identifier {
        self.name
    }
}
