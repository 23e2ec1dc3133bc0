//! Instructions
//!
//! The instruction payload holds the operand vector mirroring the use-lists
//! of the referenced values, plus bookkeeping (parent block, source
//! location, statement index). Per-kind behavior (side effects, operand
//! kind constraints, changed-operand sets, printable names) dispatches on
//! [`ValueKind`]; the concrete opcode set is a table here, not a type
//! hierarchy, so growing it means extending these matches.

use sable_support::SourceRange;

use crate::arena::ValueId;
use crate::kind::ValueKind;
use crate::module::Module;
use crate::types::Type;
use crate::value::{Use, Value};

/// What an instruction may do to observable state, as the optimizer sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SideEffectKind {
    /// Pure: freely reorderable and removable when unused
    None,
    /// May read observable state
    MayRead,
    /// May write observable state
    MayWrite,
    /// Anything, including throwing or transferring control
    Unknown,
}

impl SideEffectKind {
    /// Whether an unused instruction with this effect can be removed
    pub fn is_removable_if_unused(self) -> bool {
        self <= SideEffectKind::MayRead
    }
}

/// Set of operand indices an instruction may mutate in place
///
/// Fixed width: an instruction kind whose changed operands could sit past
/// index 63 must be rejected at the taxonomy layer; construction panics
/// rather than silently truncating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperandBitSet(u64);

impl OperandBitSet {
    /// The empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Add an operand index
    pub fn with(self, index: usize) -> Self {
        assert!(index < 64, "changed-operand index {} exceeds bitset width", index);
        Self(self.0 | 1 << index)
    }

    /// Whether `index` is in the set
    pub fn contains(self, index: usize) -> bool {
        index < 64 && self.0 & (1 << index) != 0
    }

    /// Whether the set is empty
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Instruction payload: operand vector and placement bookkeeping
#[derive(Debug)]
pub struct Instruction {
    pub(crate) parent: Option<ValueId>,
    pub(crate) operands: Vec<Option<Use>>,
    pub(crate) location: SourceRange,
    pub(crate) statement_index: u32,
}

impl Instruction {
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            operands: Vec::new(),
            location: SourceRange::INVALID,
            statement_index: 0,
        }
    }

    /// The owning basic block, absent while unattached
    pub fn parent(&self) -> Option<ValueId> {
        self.parent
    }

    /// Number of operand slots, including null operands
    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    /// The value at operand slot `index`; `None` for a null operand
    pub fn operand(&self, index: usize) -> Option<ValueId> {
        self.operands[index].map(|u| u.value)
    }

    /// The full use at operand slot `index`, mirror slot included
    pub fn operand_use(&self, index: usize) -> Option<Use> {
        self.operands[index]
    }

    /// Iterate over the operand slots, null operands included
    pub fn operands(&self) -> impl Iterator<Item = Option<ValueId>> + '_ {
        self.operands.iter().map(|slot| slot.map(|u| u.value))
    }

    /// Source range the instruction was lowered from
    pub fn location(&self) -> SourceRange {
        self.location
    }

    /// Index of the source statement the instruction belongs to
    pub fn statement_index(&self) -> u32 {
        self.statement_index
    }
}

fn expect_instruction_kind(kind: ValueKind) {
    assert!(
        kind.is_instruction(),
        "invalid kind: {:?} is not an instruction",
        kind
    );
}

impl ValueKind {
    /// Source-level name of the instruction class
    pub fn instruction_name(self) -> &'static str {
        expect_instruction_kind(self);
        self.kind_str()
    }

    /// The instruction's declared effect on observable state
    pub fn side_effect(self) -> SideEffectKind {
        expect_instruction_kind(self);
        match self {
            ValueKind::MovInst
            | ValueKind::PhiInst
            | ValueKind::AllocStackInst
            | ValueKind::CreateFunctionInst
            | ValueKind::BranchInst
            | ValueKind::CondBranchInst
            | ValueKind::ReturnInst
            | ValueKind::UnreachableInst => SideEffectKind::None,
            ValueKind::LoadStackInst | ValueKind::LoadFrameInst => SideEffectKind::MayRead,
            ValueKind::StoreStackInst | ValueKind::StoreFrameInst => SideEffectKind::MayWrite,
            ValueKind::CallInst | ValueKind::ThrowInst => SideEffectKind::Unknown,
            _ => panic!("invalid kind: {:?} has no side effect entry", self),
        }
    }

    /// Structural constraint on operand slot `index` of this instruction kind
    ///
    /// Consulted on every non-null operand installation.
    pub fn can_set_operand(self, operand_kind: ValueKind, index: usize) -> bool {
        expect_instruction_kind(self);
        match self {
            ValueKind::MovInst | ValueKind::ReturnInst | ValueKind::ThrowInst => index == 0,
            ValueKind::AllocStackInst | ValueKind::UnreachableInst => false,
            ValueKind::LoadStackInst => index == 0 && operand_kind == ValueKind::AllocStackInst,
            ValueKind::StoreStackInst => match index {
                0 => true,
                1 => operand_kind == ValueKind::AllocStackInst,
                _ => false,
            },
            ValueKind::LoadFrameInst => index == 0 && operand_kind == ValueKind::Variable,
            ValueKind::StoreFrameInst => match index {
                0 => true,
                1 => operand_kind == ValueKind::Variable,
                _ => false,
            },
            ValueKind::CreateFunctionInst => index == 0 && operand_kind == ValueKind::Function,
            ValueKind::CallInst => true,
            ValueKind::PhiInst => index % 2 == 0 || operand_kind == ValueKind::BasicBlock,
            ValueKind::BranchInst => index == 0 && operand_kind == ValueKind::BasicBlock,
            ValueKind::CondBranchInst => match index {
                0 => true,
                1 | 2 => operand_kind == ValueKind::BasicBlock,
                _ => false,
            },
            _ => panic!("invalid kind: {:?} has no operand constraint entry", self),
        }
    }

    /// Operand indices whose abstract values the instruction mutates in place
    pub fn changed_operands(self) -> OperandBitSet {
        expect_instruction_kind(self);
        match self {
            // Stores overwrite the storage their second operand names.
            ValueKind::StoreStackInst | ValueKind::StoreFrameInst => {
                OperandBitSet::empty().with(1)
            }
            _ => OperandBitSet::empty(),
        }
    }
}

impl Module {
    fn new_instruction(&mut self, kind: ValueKind) -> ValueId {
        self.values.alloc(Value::new_instruction(kind, Instruction::new()))
    }

    /// Create a `MovInst` copying `src`; the result takes `src`'s type
    pub fn create_mov_inst(&mut self, src: ValueId) -> ValueId {
        let inst = self.new_instruction(ValueKind::MovInst);
        self.push_operand(inst, Some(src));
        let ty = self.value(src).ty();
        self.set_type(inst, ty);
        inst
    }

    /// Create an `AllocStackInst`
    pub fn create_alloc_stack_inst(&mut self) -> ValueId {
        self.new_instruction(ValueKind::AllocStackInst)
    }

    /// Create a `LoadStackInst` reading `alloc`
    pub fn create_load_stack_inst(&mut self, alloc: ValueId) -> ValueId {
        let inst = self.new_instruction(ValueKind::LoadStackInst);
        self.push_operand(inst, Some(alloc));
        inst
    }

    /// Create a `StoreStackInst` writing `value` into `alloc`
    pub fn create_store_stack_inst(&mut self, value: ValueId, alloc: ValueId) -> ValueId {
        let inst = self.new_instruction(ValueKind::StoreStackInst);
        self.push_operand(inst, Some(value));
        self.push_operand(inst, Some(alloc));
        self.set_type(inst, Type::none());
        inst
    }

    /// Create a `LoadFrameInst` reading `variable`
    pub fn create_load_frame_inst(&mut self, variable: ValueId) -> ValueId {
        let inst = self.new_instruction(ValueKind::LoadFrameInst);
        self.push_operand(inst, Some(variable));
        inst
    }

    /// Create a `StoreFrameInst` writing `value` into `variable`
    pub fn create_store_frame_inst(&mut self, value: ValueId, variable: ValueId) -> ValueId {
        let inst = self.new_instruction(ValueKind::StoreFrameInst);
        self.push_operand(inst, Some(value));
        self.push_operand(inst, Some(variable));
        self.set_type(inst, Type::none());
        inst
    }

    /// Create a `CreateFunctionInst` materializing a closure for `function`
    pub fn create_create_function_inst(&mut self, function: ValueId) -> ValueId {
        let inst = self.new_instruction(ValueKind::CreateFunctionInst);
        self.push_operand(inst, Some(function));
        self.set_type(inst, Type::closure());
        inst
    }

    /// Create a `CallInst` of `callee` with `args`
    pub fn create_call_inst(&mut self, callee: ValueId, args: &[ValueId]) -> ValueId {
        let inst = self.new_instruction(ValueKind::CallInst);
        self.push_operand(inst, Some(callee));
        for &arg in args {
            self.push_operand(inst, Some(arg));
        }
        inst
    }

    /// Create a `PhiInst` from `(value, predecessor block)` pairs
    pub fn create_phi_inst(&mut self, entries: &[(ValueId, ValueId)]) -> ValueId {
        let inst = self.new_instruction(ValueKind::PhiInst);
        for &(value, block) in entries {
            self.push_operand(inst, Some(value));
            self.push_operand(inst, Some(block));
        }
        inst
    }

    /// Create a `BranchInst` to `target`
    pub fn create_branch_inst(&mut self, target: ValueId) -> ValueId {
        let inst = self.new_instruction(ValueKind::BranchInst);
        self.push_operand(inst, Some(target));
        self.set_type(inst, Type::none());
        inst
    }

    /// Create a `CondBranchInst` on `cond`
    pub fn create_cond_branch_inst(
        &mut self,
        cond: ValueId,
        true_block: ValueId,
        false_block: ValueId,
    ) -> ValueId {
        let inst = self.new_instruction(ValueKind::CondBranchInst);
        self.push_operand(inst, Some(cond));
        self.push_operand(inst, Some(true_block));
        self.push_operand(inst, Some(false_block));
        self.set_type(inst, Type::none());
        inst
    }

    /// Create a `ReturnInst` of `value`
    pub fn create_return_inst(&mut self, value: ValueId) -> ValueId {
        let inst = self.new_instruction(ValueKind::ReturnInst);
        self.push_operand(inst, Some(value));
        self.set_type(inst, Type::none());
        inst
    }

    /// Create a `ThrowInst` of `value`
    pub fn create_throw_inst(&mut self, value: ValueId) -> ValueId {
        let inst = self.new_instruction(ValueKind::ThrowInst);
        self.push_operand(inst, Some(value));
        self.set_type(inst, Type::none());
        inst
    }

    /// Create an `UnreachableInst`
    pub fn create_unreachable_inst(&mut self) -> ValueId {
        let inst = self.new_instruction(ValueKind::UnreachableInst);
        self.set_type(inst, Type::none());
        inst
    }

    /// Create an unattached instruction of the same kind as `src` with a
    /// fresh operand list
    ///
    /// Copies type, location and statement index. `operands` must have one
    /// entry per operand slot of `src`. Used by passes that rewrite an
    /// instruction rather than mutating it in place.
    pub fn create_instruction_like(
        &mut self,
        src: ValueId,
        operands: &[Option<ValueId>],
    ) -> ValueId {
        let src_value = self.value(src);
        let src_inst = src_value
            .as_instruction()
            .unwrap_or_else(|| panic!("value {} is not an instruction", src.index()));
        assert_eq!(
            src_inst.num_operands(),
            operands.len(),
            "invalid number of operands"
        );
        let kind = src_value.kind();
        let ty = src_value.ty();
        let location = src_inst.location;
        let statement_index = src_inst.statement_index;

        let inst = self.new_instruction(kind);
        self.set_type(inst, ty);
        {
            let new_inst = self.instruction_mut(inst);
            new_inst.location = location;
            new_inst.statement_index = statement_index;
        }
        for &op in operands {
            self.push_operand(inst, op);
        }
        inst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_effect_table() {
        assert_eq!(ValueKind::MovInst.side_effect(), SideEffectKind::None);
        assert_eq!(ValueKind::LoadStackInst.side_effect(), SideEffectKind::MayRead);
        assert_eq!(ValueKind::StoreFrameInst.side_effect(), SideEffectKind::MayWrite);
        assert_eq!(ValueKind::CallInst.side_effect(), SideEffectKind::Unknown);
        assert!(ValueKind::LoadStackInst.side_effect().is_removable_if_unused());
        assert!(!ValueKind::CallInst.side_effect().is_removable_if_unused());
    }

    #[test]
    #[should_panic(expected = "invalid kind")]
    fn test_side_effect_rejects_non_instructions() {
        let _ = ValueKind::BasicBlock.side_effect();
    }

    #[test]
    fn test_operand_constraints() {
        use ValueKind::*;
        assert!(StoreStackInst.can_set_operand(LiteralNumber, 0));
        assert!(StoreStackInst.can_set_operand(AllocStackInst, 1));
        assert!(!StoreStackInst.can_set_operand(LiteralNumber, 1));
        assert!(!StoreStackInst.can_set_operand(AllocStackInst, 2));

        assert!(BranchInst.can_set_operand(BasicBlock, 0));
        assert!(!BranchInst.can_set_operand(LiteralNumber, 0));

        assert!(PhiInst.can_set_operand(LiteralNumber, 0));
        assert!(PhiInst.can_set_operand(BasicBlock, 1));
        assert!(!PhiInst.can_set_operand(LiteralNumber, 1));

        assert!(CallInst.can_set_operand(Function, 0));
        assert!(CallInst.can_set_operand(LiteralString, 7));
    }

    #[test]
    fn test_changed_operands() {
        assert!(ValueKind::StoreStackInst.changed_operands().contains(1));
        assert!(!ValueKind::StoreStackInst.changed_operands().contains(0));
        assert!(ValueKind::MovInst.changed_operands().is_empty());
    }

    #[test]
    #[should_panic(expected = "exceeds bitset width")]
    fn test_bitset_width_is_enforced() {
        let _ = OperandBitSet::empty().with(64);
    }
}
