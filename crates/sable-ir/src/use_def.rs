//! Use-def protocol
//!
//! Every operand edge exists twice: as an entry in the instruction's
//! operand vector and as an entry in the used value's user list, each
//! carrying the index of the other. The handful of primitives here are the
//! only code that touches both sides, and each one leaves the mirror intact
//! or panics; nothing else in the crate (or outside it) can break the
//! bijection.
//!
//! User lists are unordered. Removal is swap-with-last: the tail entry is
//! moved into the vacated slot and the operand of the moved user is
//! back-patched to the new slot. That makes removal O(1) and keeps every
//! other instruction's operand indices stable.

use crate::arena::ValueId;
use crate::module::Module;
use crate::value::Use;

impl Module {
    /// The value at operand slot `index` of `inst`; `None` for a null
    /// operand
    pub fn operand(&self, inst: ValueId, index: usize) -> Option<ValueId> {
        self.instruction(inst).operand(index)
    }

    /// Number of operand slots of `inst`, null operands included
    pub fn num_operands(&self, inst: ValueId) -> usize {
        self.instruction(inst).num_operands()
    }

    /// Register `user` in `value`'s user list and return the use naming
    /// the new slot
    pub(crate) fn add_user(&mut self, value: ValueId, user: ValueId) -> Use {
        debug_assert!(
            self.value(user).kind().is_instruction(),
            "only instructions can use values"
        );
        let users = self.value_mut(value).users_mut();
        users.push(user);
        Use {
            value,
            slot: (users.len() - 1) as u32,
        }
    }

    /// Unregister the use `u` from its value's user list
    ///
    /// Swap-with-last; when an entry actually moved, exactly one operand
    /// slot of the moved user mirrors the old tail position and is
    /// rewritten to the vacated slot. Not finding exactly one is a corrupt
    /// graph and panics.
    fn remove_use(&mut self, u: Use) {
        let slot = u.slot as usize;
        let last = {
            let users = self.value(u.value).users();
            assert!(!users.is_empty(), "removing a use from an empty user list");
            users.len() - 1
        };
        let moved = {
            let users = self.value_mut(u.value).users_mut();
            let moved = users[last];
            users[slot] = moved;
            users.pop();
            moved
        };
        if slot == last {
            return;
        }
        let old_use = Use {
            value: u.value,
            slot: last as u32,
        };
        let new_use = Use {
            value: u.value,
            slot: u.slot,
        };
        for operand in self.instruction_mut(moved).operands.iter_mut() {
            if *operand == Some(old_use) {
                *operand = Some(new_use);
                return;
            }
        }
        panic!("corrupt use-def chain: cannot find the relocated use in the moved user");
    }

    /// Install `value` at operand slot `index` of `inst`
    ///
    /// Idempotent when the slot already holds `value`. A previously
    /// installed value is unregistered first. A non-null value must pass
    /// the instruction's per-slot kind check; `None` clears the slot.
    pub fn set_operand(&mut self, inst: ValueId, index: usize, value: Option<ValueId>) {
        let current = {
            let operands = &self.instruction(inst).operands;
            assert!(index < operands.len(), "not all operands have been pushed");
            operands[index]
        };
        if current.map(|u| u.value) == value {
            return;
        }
        if let Some(u) = current {
            self.remove_use(u);
        }
        match value {
            Some(v) => {
                let inst_kind = self.value(inst).kind();
                let operand_kind = self.value(v).kind();
                assert!(
                    inst_kind.can_set_operand(operand_kind, index),
                    "unsupported operand kind {:?} at slot {} of {:?}",
                    operand_kind,
                    index,
                    inst_kind
                );
                let u = self.add_user(v, inst);
                self.instruction_mut(inst).operands[index] = Some(u);
            }
            None => {
                self.instruction_mut(inst).operands[index] = None;
            }
        }
    }

    /// Append an operand slot and install `value` in it
    pub fn push_operand(&mut self, inst: ValueId, value: Option<ValueId>) {
        let index = {
            let operands = &mut self.instruction_mut(inst).operands;
            operands.push(None);
            operands.len() - 1
        };
        self.set_operand(inst, index, value);
    }

    /// Clear operand slot `index` and erase the slot itself
    pub fn remove_operand(&mut self, inst: ValueId, index: usize) {
        self.set_operand(inst, index, None);
        self.instruction_mut(inst).operands.remove(index);
    }

    /// Drop every operand slot of `inst` holding `value`
    ///
    /// Two passes: each matching slot is nulled first (unregistering the
    /// use), then the null slots are compacted out, so the mirror holds
    /// through every individual unlink.
    pub fn erase_operand(&mut self, inst: ValueId, value: ValueId) {
        for index in 0..self.instruction(inst).num_operands() {
            if self.instruction(inst).operand(index) == Some(value) {
                self.set_operand(inst, index, None);
            }
        }
        self.instruction_mut(inst).operands.retain(|slot| slot.is_some());
        assert!(
            !self.value(value).has_user(inst),
            "corrupt use list after erasing an operand"
        );
    }

    /// Rewrite the lowest-indexed operand slot of `inst` holding `old`
    ///
    /// `old` must be present.
    pub fn replace_first_operand_with(
        &mut self,
        inst: ValueId,
        old: ValueId,
        new: Option<ValueId>,
    ) {
        for index in 0..self.instruction(inst).num_operands() {
            if self.instruction(inst).operand(index) == Some(old) {
                self.set_operand(inst, index, new);
                return;
            }
        }
        panic!("cannot find operand: invalid use-def chain");
    }

    /// Point every use of `value` at `other` instead
    ///
    /// Pops the last user and rewrites its first matching operand until the
    /// user list is empty; each rewrite shrinks the list, which bounds the
    /// loop by the initial user count. An instruction using `value` at
    /// several slots is rewritten one slot per iteration.
    pub fn replace_all_uses_with(&mut self, value: ValueId, other: Option<ValueId>) {
        if other == Some(value) {
            return;
        }
        while let Some(&user) = self.value(value).users().last() {
            self.replace_first_operand_with(user, value, other);
        }
    }

    /// Drop every use of `value`, removing the operand slots outright
    pub fn remove_all_uses(&mut self, value: ValueId) {
        while let Some(&user) = self.value(value).users().last() {
            self.erase_operand(user, value);
        }
    }
}
