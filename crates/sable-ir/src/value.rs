//! IR values and use-lists
//!
//! [`Value`] is the uniform node of the IR graph: a kind tag, a type, the
//! ordered list of instructions using the value, and the per-class payload.
//! A [`Use`] names one operand edge from the producing value's side: the
//! producer and the slot the user occupies in the producer's user list.
//! The operand side of the same edge lives in
//! [`crate::instruction::Instruction::operands`]; the two must mirror each
//! other at every observation point, which is maintained by the mutation
//! protocol on [`crate::module::Module`].

use sable_support::Identifier;

use crate::arena::ValueId;
use crate::function::{BasicBlock, Function, Parameter};
use crate::instruction::Instruction;
use crate::kind::ValueKind;
use crate::scope::{Variable, VariableScope};
use crate::types::Type;

/// One operand edge, identified from the producer's side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    /// The value being used
    pub value: ValueId,
    /// The slot the user occupies in `value`'s user list
    pub slot: u32,
}

/// A literal payload; immutable after construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    /// The poisoned "empty" value
    Empty,
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// A boolean
    Bool(bool),
    /// A number; uniqued per module by IEEE-754 bit pattern
    Number(f64),
    /// A string; uniqued per module by identifier identity
    String(Identifier),
    /// The global object sentinel
    GlobalObject,
}

/// A named property of the module's global object
#[derive(Debug)]
pub struct GlobalObjectProperty {
    pub(crate) name: ValueId,
    pub(crate) declared: bool,
}

impl GlobalObjectProperty {
    /// The `LiteralString` carrying the property name
    pub fn name(&self) -> ValueId {
        self.name
    }

    /// Whether the property was formally declared (`var x`) rather than
    /// merely assigned. Monotone: may become true, never false again.
    pub fn is_declared(&self) -> bool {
        self.declared
    }
}

#[derive(Debug)]
pub(crate) enum Payload {
    Literal(Literal),
    Instruction(Instruction),
    BasicBlock(BasicBlock),
    Parameter(Parameter),
    Function(Function),
    GlobalObjectProperty(GlobalObjectProperty),
    Variable(Variable),
    Scope(VariableScope),
}

/// A node of the IR graph
#[derive(Debug)]
pub struct Value {
    kind: ValueKind,
    ty: Type,
    users: Vec<ValueId>,
    payload: Payload,
}

impl Value {
    fn new(kind: ValueKind, ty: Type, payload: Payload) -> Self {
        Self {
            kind,
            ty,
            users: Vec::new(),
            payload,
        }
    }

    pub(crate) fn new_literal(kind: ValueKind, lit: Literal, ty: Type) -> Self {
        debug_assert!(kind.is_literal());
        Self::new(kind, ty, Payload::Literal(lit))
    }

    pub(crate) fn new_instruction(kind: ValueKind, inst: Instruction) -> Self {
        debug_assert!(kind.is_instruction());
        Self::new(kind, Type::any(), Payload::Instruction(inst))
    }

    pub(crate) fn new_basic_block(block: BasicBlock) -> Self {
        Self::new(ValueKind::BasicBlock, Type::none(), Payload::BasicBlock(block))
    }

    pub(crate) fn new_parameter(param: Parameter) -> Self {
        Self::new(ValueKind::Parameter, Type::any(), Payload::Parameter(param))
    }

    pub(crate) fn new_function(function: Function) -> Self {
        Self::new(ValueKind::Function, Type::closure(), Payload::Function(function))
    }

    pub(crate) fn new_global_property(prop: GlobalObjectProperty) -> Self {
        Self::new(
            ValueKind::GlobalObjectProperty,
            Type::none(),
            Payload::GlobalObjectProperty(prop),
        )
    }

    pub(crate) fn new_variable(var: Variable) -> Self {
        Self::new(ValueKind::Variable, Type::any(), Payload::Variable(var))
    }

    pub(crate) fn new_scope(kind: ValueKind, scope: VariableScope) -> Self {
        debug_assert!(kind.is_variable_scope());
        Self::new(kind, Type::none(), Payload::Scope(scope))
    }

    /// The concrete class tag
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Source-level name of the concrete class
    pub fn kind_str(&self) -> &'static str {
        self.kind.kind_str()
    }

    /// The value's type
    pub fn ty(&self) -> Type {
        self.ty
    }

    pub(crate) fn set_ty(&mut self, ty: Type) {
        self.ty = ty;
    }

    /// Instructions using this value, in no semantic order
    pub fn users(&self) -> &[ValueId] {
        &self.users
    }

    pub(crate) fn users_mut(&mut self) -> &mut Vec<ValueId> {
        &mut self.users
    }

    /// Number of users
    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    /// Whether any instruction uses this value
    pub fn has_users(&self) -> bool {
        !self.users.is_empty()
    }

    /// Whether exactly one instruction uses this value
    pub fn has_one_user(&self) -> bool {
        self.users.len() == 1
    }

    /// Whether `user` appears in the user list
    ///
    /// The user list only ever contains instructions, so this compares
    /// against instruction ids.
    pub fn has_user(&self, user: ValueId) -> bool {
        self.users.contains(&user)
    }

    /// Downcast to a literal payload
    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.payload {
            Payload::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Downcast to an instruction payload
    pub fn as_instruction(&self) -> Option<&Instruction> {
        match &self.payload {
            Payload::Instruction(inst) => Some(inst),
            _ => None,
        }
    }

    pub(crate) fn as_instruction_mut(&mut self) -> Option<&mut Instruction> {
        match &mut self.payload {
            Payload::Instruction(inst) => Some(inst),
            _ => None,
        }
    }

    /// Downcast to a basic block payload
    pub fn as_basic_block(&self) -> Option<&BasicBlock> {
        match &self.payload {
            Payload::BasicBlock(block) => Some(block),
            _ => None,
        }
    }

    pub(crate) fn as_basic_block_mut(&mut self) -> Option<&mut BasicBlock> {
        match &mut self.payload {
            Payload::BasicBlock(block) => Some(block),
            _ => None,
        }
    }

    /// Downcast to a parameter payload
    pub fn as_parameter(&self) -> Option<&Parameter> {
        match &self.payload {
            Payload::Parameter(param) => Some(param),
            _ => None,
        }
    }

    /// Downcast to a function payload
    pub fn as_function(&self) -> Option<&Function> {
        match &self.payload {
            Payload::Function(function) => Some(function),
            _ => None,
        }
    }

    pub(crate) fn as_function_mut(&mut self) -> Option<&mut Function> {
        match &mut self.payload {
            Payload::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Downcast to a global property payload
    pub fn as_global_property(&self) -> Option<&GlobalObjectProperty> {
        match &self.payload {
            Payload::GlobalObjectProperty(prop) => Some(prop),
            _ => None,
        }
    }

    pub(crate) fn as_global_property_mut(&mut self) -> Option<&mut GlobalObjectProperty> {
        match &mut self.payload {
            Payload::GlobalObjectProperty(prop) => Some(prop),
            _ => None,
        }
    }

    /// Downcast to a variable payload
    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.payload {
            Payload::Variable(var) => Some(var),
            _ => None,
        }
    }

    /// Downcast to a scope payload
    pub fn as_scope(&self) -> Option<&VariableScope> {
        match &self.payload {
            Payload::Scope(scope) => Some(scope),
            _ => None,
        }
    }

    pub(crate) fn as_scope_mut(&mut self) -> Option<&mut VariableScope> {
        match &mut self.payload {
            Payload::Scope(scope) => Some(scope),
            _ => None,
        }
    }
}
