//! End-to-end scenarios over the IR graph
//!
//! Each test builds a small module through the public construction APIs and
//! drives the mutation protocol the way optimization passes do.

use sable_ir::{
    verify_module, verify_use_lists, DefinitionKind, Module, ValueId,
};
use sable_support::{Context, SourceRange};

fn new_module() -> Module {
    Module::new(Context::new())
}

fn make_function(module: &mut Module, name: &str) -> ValueId {
    let name = module.context_mut().get_identifier(name);
    module.create_function(
        name,
        DefinitionKind::Es5Function,
        false,
        false,
        SourceRange::INVALID,
        None,
    )
}

#[test]
fn use_list_swap_remove() {
    let mut module = new_module();
    let a = module.get_literal_number(1.0);
    let b = module.get_literal_number(2.0);
    let c = module.get_literal_number(3.0);

    let i1 = module.create_mov_inst(a);
    let i2 = module.create_mov_inst(a);
    let i3 = module.create_mov_inst(b);
    assert_eq!(module.value(a).users(), &[i1, i2]);

    // Rewriting i1's operand pops i2 into a's user slot 0 and back-patches
    // i2's operand to the new slot.
    module.set_operand(i1, 0, Some(c));

    assert_eq!(module.value(a).users(), &[i2]);
    let patched = module.instruction(i2).operand_use(0).unwrap();
    assert_eq!(patched.value, a);
    assert_eq!(patched.slot, 0);
    assert_eq!(module.value(c).users(), &[i1]);
    assert_eq!(module.value(b).users(), &[i3]);
    verify_use_lists(&module).unwrap();
}

#[test]
fn replace_all_uses_moves_every_edge() {
    let mut module = new_module();
    let a = module.get_literal_number(1.0);
    let b = module.get_literal_number(2.0);
    let c = module.get_literal_number(3.0);

    let i1 = module.create_mov_inst(a);
    let i2 = module.create_mov_inst(a);
    let _i3 = module.create_mov_inst(b);
    module.set_operand(i1, 0, Some(c));

    let b_users_before = module.value(b).num_users();
    module.replace_all_uses_with(a, Some(b));

    assert!(!module.value(a).has_users());
    assert_eq!(module.value(b).num_users(), b_users_before + 1);
    assert_eq!(module.operand(i2, 0), Some(b));
    verify_use_lists(&module).unwrap();
}

#[test]
fn erase_block_nulls_branches_into_it() {
    let mut module = new_module();
    let func = make_function(&mut module, "f");
    let bb1 = module.create_basic_block(func);
    let bb2 = module.create_basic_block(func);
    let bb3 = module.create_basic_block(func);

    let br1 = module.create_branch_inst(bb2);
    module.append_instruction(bb1, br1);
    let br2 = module.create_branch_inst(bb3);
    module.append_instruction(bb2, br2);
    let undef = module.get_literal_undefined();
    let ret = module.create_return_inst(undef);
    module.append_instruction(bb3, ret);

    verify_module(&module).unwrap();
    assert_eq!(module.value(bb3).users(), &[br2]);

    module.erase_basic_block(bb3);

    assert_eq!(module.function(func).blocks(), &[bb1, bb2]);
    // The branch in bb2 survives with its target nulled out.
    assert_eq!(module.operand(br2, 0), None);
    assert_eq!(module.num_operands(br2), 1);
    verify_use_lists(&module).unwrap();
}

#[test]
fn erase_function_erases_blocks_and_owned_values() {
    let mut module = new_module();
    let func = make_function(&mut module, "f");
    let param_name = module.context_mut().get_identifier("x");
    let param = module.create_parameter(func, param_name);
    let scope = module.function(func).function_scope();
    let var_name = module.context_mut().get_identifier("v");
    let var = module.create_variable(scope, var_name);

    let bb = module.create_basic_block(func);
    let mov = module.create_mov_inst(param);
    let store = module.create_store_frame_inst(mov, var);
    let undef = module.get_literal_undefined();
    let ret = module.create_return_inst(undef);
    module.append_instruction(bb, mov);
    module.append_instruction(bb, store);
    module.append_instruction(bb, ret);
    verify_module(&module).unwrap();

    module.erase_function(func);
    assert!(module.functions().is_empty());
    verify_use_lists(&module).unwrap();
}

#[test]
fn internal_name_derivation_sequence() {
    let mut module = new_module();
    let foo = module.context_mut().get_identifier("foo");

    let n1 = module.derive_unique_internal_name(foo);
    let n2 = module.derive_unique_internal_name(foo);
    let n3 = module.derive_unique_internal_name(n2);
    let stale = module.context_mut().get_identifier("foo 5#");
    let n4 = module.derive_unique_internal_name(stale);

    assert_eq!(module.context().ident_str(n1), "foo");
    assert_eq!(module.context().ident_str(n2), "foo 1#");
    assert_eq!(module.context().ident_str(n3), "foo 2#");
    assert_eq!(module.context().ident_str(n4), "foo 3#");
}

#[test]
fn cjs_segment_reachability() {
    let mut module = new_module();
    let functions: Vec<ValueId> = (0..6)
        .map(|i| make_function(&mut module, &format!("m{}", i)))
        .collect();

    // Give every function a terminated body.
    let blocks: Vec<ValueId> = functions
        .iter()
        .map(|&f| {
            let bb = module.create_basic_block(f);
            let undef = module.get_literal_undefined();
            let ret = module.create_return_inst(undef);
            module.append_instruction(bb, ret);
            bb
        })
        .collect();

    // F0 references F2, F2 references F3, F4 references F5.
    for &(user, used) in &[(0usize, 2usize), (2, 3), (4, 5)] {
        let create = module.create_create_function_inst(functions[used]);
        let terminator = module.terminator(blocks[user]).unwrap();
        module.insert_instruction_before(create, terminator);
    }
    verify_module(&module).unwrap();

    let file = module.context_mut().get_identifier("mod.js");
    for &record in &[functions[0], functions[1], functions[4]] {
        module.add_cjs_module(record, file);
    }

    let seg0 = module.functions_in_segment(sable_support::SegmentRange { first: 0, last: 0 });
    let expected0: Vec<ValueId> = vec![functions[0], functions[2], functions[3]];
    assert_eq!(seg0.len(), 3);
    assert!(expected0.iter().all(|f| seg0.contains(f)));

    let seg2 = module.functions_in_segment(sable_support::SegmentRange { first: 2, last: 2 });
    assert_eq!(seg2.len(), 2);
    assert!(seg2.contains(&functions[4]));
    assert!(seg2.contains(&functions[5]));

    let seg_all = module.functions_in_segment(sable_support::SegmentRange { first: 0, last: 2 });
    assert_eq!(seg_all.len(), 6);
}

#[test]
fn literal_uniquing_by_bit_pattern() {
    let mut module = new_module();
    assert_eq!(module.get_literal_number(1.0), module.get_literal_number(1.0));
    assert_ne!(
        module.get_literal_number(0.0),
        module.get_literal_number(-0.0)
    );
}

#[test]
fn instruction_clone_shares_kind_and_metadata() {
    let mut module = new_module();
    let func = make_function(&mut module, "f");
    let bb = module.create_basic_block(func);

    let a = module.get_literal_number(1.0);
    let b = module.get_literal_number(2.0);
    let alloc = module.create_alloc_stack_inst();
    module.append_instruction(bb, alloc);
    let store = module.create_store_stack_inst(a, alloc);
    module.set_statement_index(store, 4);
    module.append_instruction(bb, store);

    let clone = module.create_instruction_like(store, &[Some(b), Some(alloc)]);
    assert_eq!(module.value(clone).kind(), module.value(store).kind());
    assert_eq!(module.instruction(clone).statement_index(), 4);
    assert_eq!(module.operand(clone, 0), Some(b));
    assert_eq!(module.operand(clone, 1), Some(alloc));
    assert_eq!(module.value(alloc).num_users(), 2);
    verify_use_lists(&module).unwrap();
}

#[test]
fn move_instruction_between_blocks() {
    let mut module = new_module();
    let func = make_function(&mut module, "f");
    let bb1 = module.create_basic_block(func);
    let bb2 = module.create_basic_block(func);

    let n = module.get_literal_number(1.0);
    let mov = module.create_mov_inst(n);
    module.append_instruction(bb1, mov);
    let br = module.create_branch_inst(bb2);
    module.append_instruction(bb1, br);
    let undef = module.get_literal_undefined();
    let ret = module.create_return_inst(undef);
    module.append_instruction(bb2, ret);
    verify_module(&module).unwrap();

    module.move_instruction_before(mov, ret);
    assert_eq!(module.basic_block(bb1).instructions(), &[br]);
    assert_eq!(module.basic_block(bb2).instructions(), &[mov, ret]);
    assert_eq!(module.instruction(mov).parent(), Some(bb2));
    verify_module(&module).unwrap();
}
