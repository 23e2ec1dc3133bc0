//! IR structural verification
//!
//! Walks a module and checks the invariants the mutation protocol is
//! supposed to preserve: the operand/user mirror, user-list compactness,
//! operand kind conformance, containment, and terminator placement.
//! Corruption here always means a bug in the IR layer or a pass, never bad
//! input, but reporting it as a value keeps the checker usable from tests
//! and fuzzers.

use crate::arena::ValueId;
use crate::module::Module;
use crate::value::Use;

/// IR verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// An operand points at a freed arena slot
    #[error("operand {index} of %{inst} points at a destroyed value")]
    FreedOperand { inst: usize, index: usize },

    /// An operand's mirror slot does not point back at the instruction
    #[error("operand {index} of %{inst} is not mirrored by its value's user list")]
    BrokenMirror { inst: usize, index: usize },

    /// A user-list entry has no operand slot pointing back at it
    #[error("user slot {slot} of %{value} has no matching operand in %{user}")]
    DanglingUser { value: usize, slot: usize, user: usize },

    /// A user-list entry is mirrored by more than one operand slot
    #[error("user slot {slot} of %{value} is mirrored by {count} operands of %{user}")]
    DuplicateUse {
        value: usize,
        slot: usize,
        user: usize,
        count: usize,
    },

    /// A user-list entry is not an instruction
    #[error("user slot {slot} of %{value} holds a non-instruction")]
    NonInstructionUser { value: usize, slot: usize },

    /// An installed operand violates the instruction's kind constraint
    #[error("operand {index} of %{inst} has a kind the instruction rejects")]
    OperandKindRejected { inst: usize, index: usize },

    /// A block's parent link disagrees with the function owning it
    #[error("block BB#{block} is not linked to its parent function")]
    BlockParentMismatch { block: usize },

    /// An instruction's parent link disagrees with the block containing it
    #[error("instruction %{inst} is not linked to its parent block BB#{block}")]
    InstructionParentMismatch { inst: usize, block: usize },

    /// A terminator that is not the last instruction of its block
    #[error("terminator %{inst} in the middle of BB#{block}")]
    MisplacedTerminator { inst: usize, block: usize },

    /// A block that does not end with a terminator
    #[error("BB#{block} does not end with a terminator")]
    MissingTerminator { block: usize },
}

/// Verify the structural invariants of a whole module
///
/// Expects a completed module: every block must be terminated. The mirror
/// checks cover every live value, attached or not.
pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    tracing::trace!("verifying module structure");
    verify_containment(module)?;
    verify_use_def_mirror(module)?;
    Ok(())
}

fn verify_containment(module: &Module) -> Result<(), VerifyError> {
    for &function in module.functions() {
        for &block in module.function(function).blocks() {
            if module.basic_block(block).parent() != function {
                return Err(VerifyError::BlockParentMismatch {
                    block: block.index(),
                });
            }
            verify_block(module, block)?;
        }
    }
    Ok(())
}

fn verify_block(module: &Module, block: ValueId) -> Result<(), VerifyError> {
    let instructions = module.basic_block(block).instructions();
    for (position, &inst) in instructions.iter().enumerate() {
        if module.instruction(inst).parent() != Some(block) {
            return Err(VerifyError::InstructionParentMismatch {
                inst: inst.index(),
                block: block.index(),
            });
        }
        let is_last = position + 1 == instructions.len();
        if module.value(inst).kind().is_terminator() && !is_last {
            return Err(VerifyError::MisplacedTerminator {
                inst: inst.index(),
                block: block.index(),
            });
        }
    }
    if module.terminator(block).is_none() {
        return Err(VerifyError::MissingTerminator {
            block: block.index(),
        });
    }
    Ok(())
}

fn verify_use_def_mirror(module: &Module) -> Result<(), VerifyError> {
    for (id, value) in module.values() {
        // Operand side: every installed operand must be mirrored exactly.
        if let Some(inst) = value.as_instruction() {
            for (index, slot) in inst.operands.iter().enumerate() {
                let Some(Use { value: used, slot: user_slot }) = *slot else {
                    continue;
                };
                let used_value = module.value(used);
                match used_value.users().get(user_slot as usize) {
                    Some(&user) if user == id => {}
                    _ => {
                        return Err(VerifyError::BrokenMirror {
                            inst: id.index(),
                            index,
                        })
                    }
                }
                if !value.kind().can_set_operand(used_value.kind(), index) {
                    return Err(VerifyError::OperandKindRejected {
                        inst: id.index(),
                        index,
                    });
                }
            }
        }

        // User side: each user entry is mirrored by exactly one operand.
        for (slot, &user) in value.users().iter().enumerate() {
            let Some(user_inst) = module.value(user).as_instruction() else {
                return Err(VerifyError::NonInstructionUser {
                    value: id.index(),
                    slot,
                });
            };
            let expected = Use {
                value: id,
                slot: slot as u32,
            };
            let count = user_inst
                .operands
                .iter()
                .filter(|operand| **operand == Some(expected))
                .count();
            match count {
                1 => {}
                0 => {
                    return Err(VerifyError::DanglingUser {
                        value: id.index(),
                        slot,
                        user: user.index(),
                    })
                }
                _ => {
                    return Err(VerifyError::DuplicateUse {
                        value: id.index(),
                        slot,
                        user: user.index(),
                        count,
                    })
                }
            }
        }
    }
    Ok(())
}

/// Verify the mirror invariant alone, ignoring block structure
///
/// Usable on modules under construction, where blocks may still lack
/// terminators.
pub fn verify_use_lists(module: &Module) -> Result<(), VerifyError> {
    verify_use_def_mirror(module)
}

#[cfg(test)]
mod tests {
    use sable_support::{Context, SourceRange};

    use super::*;
    use crate::function::DefinitionKind;

    fn function_with_block(module: &mut Module) -> (ValueId, ValueId) {
        let name = module.context_mut().get_identifier("f");
        let func = module.create_function(
            name,
            DefinitionKind::Es5Function,
            false,
            false,
            SourceRange::INVALID,
            None,
        );
        let block = module.create_basic_block(func);
        (func, block)
    }

    #[test]
    fn test_well_formed_module_verifies() {
        let mut module = Module::new(Context::new());
        let (_, block) = function_with_block(&mut module);
        let n = module.get_literal_number(7.0);
        let mov = module.create_mov_inst(n);
        let ret = module.create_return_inst(mov);
        module.append_instruction(block, mov);
        module.append_instruction(block, ret);

        assert!(verify_module(&module).is_ok());
    }

    #[test]
    fn test_unterminated_block_is_reported() {
        let mut module = Module::new(Context::new());
        let (_, block) = function_with_block(&mut module);
        let n = module.get_literal_number(7.0);
        let mov = module.create_mov_inst(n);
        module.append_instruction(block, mov);

        assert!(matches!(
            verify_module(&module),
            Err(VerifyError::MissingTerminator { .. })
        ));
    }

    #[test]
    fn test_misplaced_terminator_is_reported() {
        let mut module = Module::new(Context::new());
        let (_, block) = function_with_block(&mut module);
        let undef = module.get_literal_undefined();
        let ret_a = module.create_return_inst(undef);
        let ret_b = module.create_return_inst(undef);
        module.append_instruction(block, ret_a);
        module.append_instruction(block, ret_b);

        assert!(matches!(
            verify_module(&module),
            Err(VerifyError::MisplacedTerminator { .. })
        ));
    }

    #[test]
    fn test_use_lists_alone_ignore_block_structure() {
        let mut module = Module::new(Context::new());
        let (_, block) = function_with_block(&mut module);
        let n = module.get_literal_number(1.0);
        let mov = module.create_mov_inst(n);
        module.append_instruction(block, mov);

        // No terminator yet, but the mirror is intact.
        assert!(verify_use_lists(&module).is_ok());
        assert!(verify_module(&module).is_err());
    }
}
