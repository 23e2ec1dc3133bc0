//! Pretty-printing for IR
//!
//! Human-readable output for debugging. Blocks are labeled `BB#<id>` where
//! the id is the arena slot index: stable while the module lives, but a
//! printing artifact with no meaning across runs.

use std::fmt::Write;

use crate::arena::ValueId;
use crate::kind::ValueKind;
use crate::module::Module;
use crate::value::Literal;

/// The synthetic printed label of a block
pub fn block_label(block: ValueId) -> String {
    format!("BB#{}", block.index())
}

fn format_operand(module: &Module, operand: Option<ValueId>) -> String {
    let Some(id) = operand else {
        return "<null>".to_string();
    };
    let value = module.value(id);
    match value.kind() {
        kind if kind.is_literal() => match value.as_literal().expect("literal payload") {
            Literal::Empty => "empty".to_string(),
            Literal::Null => "null".to_string(),
            Literal::Undefined => "undefined".to_string(),
            Literal::Bool(b) => format!("{}", b),
            Literal::Number(n) => format!("{}", n),
            Literal::String(s) => {
                format!("\"{}\"", module.context().ident_str(*s).escape_default())
            }
            Literal::GlobalObject => "globalObject".to_string(),
        },
        ValueKind::BasicBlock => block_label(id),
        ValueKind::Function => {
            let name = module.function(id).internal_name();
            format!("%{}()", module.context().ident_str(name))
        }
        ValueKind::Parameter => {
            format!("%{}", module.context().ident_str(module.parameter(id).name()))
        }
        ValueKind::Variable => {
            format!("[{}]", module.context().ident_str(module.variable(id).name()))
        }
        kind if kind.is_variable_scope() => format!("scope#{}", id.index()),
        kind if kind.is_instruction() => format!("%{}", id.index()),
        _ => format!("%{}", id.index()),
    }
}

/// Render one instruction on a single line
pub fn format_instruction(module: &Module, inst: ValueId) -> String {
    let value = module.value(inst);
    let payload = value
        .as_instruction()
        .unwrap_or_else(|| panic!("value {} is not an instruction", inst.index()));

    let mut out = String::new();
    // Instructions without a result (stores, terminators) print bare.
    if !value.ty().is_none() {
        write!(out, "%{} = ", inst.index()).unwrap();
    }
    out.push_str(value.kind().instruction_name());
    let operands: Vec<String> = payload
        .operands()
        .map(|op| format_operand(module, op))
        .collect();
    if !operands.is_empty() {
        out.push(' ');
        out.push_str(&operands.join(", "));
    }
    if !value.ty().is_none() && !value.ty().is_any() {
        write!(out, " : {}", value.ty()).unwrap();
    }
    out
}

/// Render one basic block with its instructions
pub fn dump_basic_block(module: &Module, block: ValueId) -> String {
    let mut out = String::new();
    writeln!(out, "{}:", block_label(block)).unwrap();
    for &inst in module.basic_block(block).instructions() {
        writeln!(out, "  {}", format_instruction(module, inst)).unwrap();
    }
    out
}

/// Render one function: header, parameters and blocks
pub fn dump_function(module: &Module, function: ValueId) -> String {
    let func = module.function(function);
    let params: Vec<&str> = func
        .parameters()
        .iter()
        .map(|&p| module.context().ident_str(module.parameter(p).name()))
        .collect();
    let mut out = String::new();
    writeln!(
        out,
        "function {}({}){}",
        module.context().ident_str(func.internal_name()),
        params.join(", "),
        if func.strict_mode() { " [strict]" } else { "" },
    )
    .unwrap();
    for &block in func.blocks() {
        out.push_str(&dump_basic_block(module, block));
    }
    out
}

/// Render every function of the module
pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();
    for &function in module.functions() {
        out.push_str(&dump_function(module, function));
        out.push('\n');
    }
    out
}
