//! The IR module
//!
//! A [`Module`] represents one whole compilation unit: it owns the value
//! arena holding every function, block, instruction, parameter, scope,
//! variable, literal and global property, plus the module-global tables
//! (literal uniquing, global properties, internal name counters, CommonJS
//! records). Everything else holds non-owning [`ValueId`] handles into the
//! arena, which is what lets the use-def protocol rewrite back-links
//! freely.
//!
//! All contract violations here are programmer errors and panic; there are
//! no recoverable error kinds in this layer.

use std::collections::hash_map::Entry;

use rustc_hash::{FxHashMap, FxHashSet};
use sable_support::{Context, Identifier, SegmentRange, SourceRange};

use crate::arena::{ValueArena, ValueId};
use crate::function::{BasicBlock, DefinitionKind, Function, Parameter};
use crate::instruction::Instruction;
use crate::kind::ValueKind;
use crate::scope::{Variable, VariableScope};
use crate::types::Type;
use crate::value::{GlobalObjectProperty, Literal, Value};

/// One CommonJS module record: the wrapper function and its source file
#[derive(Debug, Clone, Copy)]
pub struct CJSModule {
    pub(crate) function: ValueId,
    pub(crate) filename: Identifier,
}

impl CJSModule {
    /// The wrapper function executed when the module is required
    pub fn function(&self) -> ValueId {
        self.function
    }

    /// The resolved filename of the module
    pub fn filename(&self) -> Identifier {
        self.filename
    }
}

/// A whole compilation unit
#[derive(Debug)]
pub struct Module {
    pub(crate) ctx: Context,
    pub(crate) values: ValueArena,
    pub(crate) functions: Vec<ValueId>,

    literal_numbers: FxHashMap<u64, ValueId>,
    literal_strings: FxHashMap<Identifier, ValueId>,
    literal_empty: ValueId,
    literal_null: ValueId,
    literal_undefined: ValueId,
    literal_false: ValueId,
    literal_true: ValueId,
    global_object: ValueId,

    global_property_map: FxHashMap<Identifier, ValueId>,
    global_property_list: Vec<ValueId>,

    internal_names: FxHashMap<Identifier, u32>,

    cjs_modules: Vec<CJSModule>,
    cjs_module_use_graph: FxHashMap<ValueId, FxHashSet<ValueId>>,
}

impl Module {
    /// Create an empty module owning `ctx`
    ///
    /// The literal singletons and the global object sentinel are allocated
    /// up front and live for the life of the module.
    pub fn new(ctx: Context) -> Self {
        let mut values = ValueArena::new();
        let literal_empty = values.alloc(Value::new_literal(
            ValueKind::LiteralEmpty,
            Literal::Empty,
            Type::empty(),
        ));
        let literal_null =
            values.alloc(Value::new_literal(ValueKind::LiteralNull, Literal::Null, Type::null()));
        let literal_undefined = values.alloc(Value::new_literal(
            ValueKind::LiteralUndefined,
            Literal::Undefined,
            Type::undefined(),
        ));
        let literal_false = values.alloc(Value::new_literal(
            ValueKind::LiteralBool,
            Literal::Bool(false),
            Type::boolean(),
        ));
        let literal_true = values.alloc(Value::new_literal(
            ValueKind::LiteralBool,
            Literal::Bool(true),
            Type::boolean(),
        ));
        let global_object = values.alloc(Value::new_literal(
            ValueKind::GlobalObject,
            Literal::GlobalObject,
            Type::object(),
        ));

        Self {
            ctx,
            values,
            functions: Vec::new(),
            literal_numbers: FxHashMap::default(),
            literal_strings: FxHashMap::default(),
            literal_empty,
            literal_null,
            literal_undefined,
            literal_false,
            literal_true,
            global_object,
            global_property_map: FxHashMap::default(),
            global_property_list: Vec::new(),
            internal_names: FxHashMap::default(),
            cjs_modules: Vec::new(),
            cjs_module_use_graph: FxHashMap::default(),
        }
    }

    /// The ambient compilation context
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Mutable access to the ambient context
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    // ---------------------------------------------------------------------
    // Value access
    // ---------------------------------------------------------------------

    /// The value behind `id`; panics if it was destroyed
    pub fn value(&self, id: ValueId) -> &Value {
        self.values.get(id)
    }

    pub(crate) fn value_mut(&mut self, id: ValueId) -> &mut Value {
        self.values.get_mut(id)
    }

    /// Iterate over every live value of the module
    pub fn values(&self) -> impl Iterator<Item = (ValueId, &Value)> {
        self.values.iter()
    }

    /// Downcast to a function; panics on kind mismatch
    pub fn function(&self, id: ValueId) -> &Function {
        self.value(id)
            .as_function()
            .unwrap_or_else(|| panic!("value {} is not a function", id.index()))
    }

    pub(crate) fn function_mut(&mut self, id: ValueId) -> &mut Function {
        self.value_mut(id)
            .as_function_mut()
            .unwrap_or_else(|| panic!("value {} is not a function", id.index()))
    }

    /// Downcast to a basic block; panics on kind mismatch
    pub fn basic_block(&self, id: ValueId) -> &BasicBlock {
        self.value(id)
            .as_basic_block()
            .unwrap_or_else(|| panic!("value {} is not a basic block", id.index()))
    }

    pub(crate) fn basic_block_mut(&mut self, id: ValueId) -> &mut BasicBlock {
        self.value_mut(id)
            .as_basic_block_mut()
            .unwrap_or_else(|| panic!("value {} is not a basic block", id.index()))
    }

    /// Downcast to an instruction; panics on kind mismatch
    pub fn instruction(&self, id: ValueId) -> &Instruction {
        self.value(id)
            .as_instruction()
            .unwrap_or_else(|| panic!("value {} is not an instruction", id.index()))
    }

    pub(crate) fn instruction_mut(&mut self, id: ValueId) -> &mut Instruction {
        self.value_mut(id)
            .as_instruction_mut()
            .unwrap_or_else(|| panic!("value {} is not an instruction", id.index()))
    }

    /// Downcast to a parameter; panics on kind mismatch
    pub fn parameter(&self, id: ValueId) -> &Parameter {
        self.value(id)
            .as_parameter()
            .unwrap_or_else(|| panic!("value {} is not a parameter", id.index()))
    }

    /// Downcast to a variable; panics on kind mismatch
    pub fn variable(&self, id: ValueId) -> &Variable {
        self.value(id)
            .as_variable()
            .unwrap_or_else(|| panic!("value {} is not a variable", id.index()))
    }

    /// Downcast to a scope; panics on kind mismatch
    pub fn scope(&self, id: ValueId) -> &VariableScope {
        self.value(id)
            .as_scope()
            .unwrap_or_else(|| panic!("value {} is not a variable scope", id.index()))
    }

    pub(crate) fn scope_mut(&mut self, id: ValueId) -> &mut VariableScope {
        self.value_mut(id)
            .as_scope_mut()
            .unwrap_or_else(|| panic!("value {} is not a variable scope", id.index()))
    }

    /// Downcast to a global property; panics on kind mismatch
    pub fn global_property(&self, id: ValueId) -> &GlobalObjectProperty {
        self.value(id)
            .as_global_property()
            .unwrap_or_else(|| panic!("value {} is not a global property", id.index()))
    }

    /// Set the cached type of a value
    pub fn set_type(&mut self, id: ValueId, ty: Type) {
        self.value_mut(id).set_ty(ty);
    }

    /// Set the source location of an instruction
    pub fn set_location(&mut self, inst: ValueId, location: SourceRange) {
        self.instruction_mut(inst).location = location;
    }

    /// Set the statement index of an instruction
    pub fn set_statement_index(&mut self, inst: ValueId, index: u32) {
        self.instruction_mut(inst).statement_index = index;
    }

    // ---------------------------------------------------------------------
    // Functions
    // ---------------------------------------------------------------------

    /// Ordered function list
    pub fn functions(&self) -> &[ValueId] {
        &self.functions
    }

    /// Create a function and link it into the function list
    ///
    /// The internal name is derived from `original_name` by suffix
    /// disambiguation; the function scope is created along with the
    /// function. With `insert_before` the function is linked before that
    /// function, which must be in this module's list; otherwise it is
    /// appended.
    pub fn create_function(
        &mut self,
        original_name: Identifier,
        definition_kind: DefinitionKind,
        strict_mode: bool,
        is_global: bool,
        source_range: SourceRange,
        insert_before: Option<ValueId>,
    ) -> ValueId {
        let internal_name = self.derive_unique_internal_name(original_name);
        let id = self.values.next_id();
        let allocated = self.values.alloc(Value::new_function(Function {
            original_or_inferred_name: original_name,
            internal_name,
            definition_kind,
            strict_mode,
            is_global,
            source_range,
            parameters: Vec::new(),
            this_parameter: None,
            external_scopes: Vec::new(),
            // Patched right below, once the scope node exists.
            function_scope: id,
            blocks: Vec::new(),
        }));
        debug_assert_eq!(id, allocated);
        let scope = self.values.alloc(Value::new_scope(
            ValueKind::VariableScope,
            VariableScope {
                function: id,
                depth: 0,
                variables: Vec::new(),
            },
        ));
        self.function_mut(id).function_scope = scope;

        match insert_before {
            Some(before) => {
                assert_ne!(before, id, "cannot insert a function before itself");
                let pos = self
                    .functions
                    .iter()
                    .position(|&f| f == before)
                    .unwrap_or_else(|| {
                        panic!("function to insert before is not in this module")
                    });
                self.functions.insert(pos, id);
            }
            None => self.functions.push(id),
        }
        id
    }

    /// Unlink a function from the function list without destroying it
    pub fn remove_function(&mut self, function: ValueId) {
        let pos = self
            .functions
            .iter()
            .position(|&f| f == function)
            .unwrap_or_else(|| panic!("function is not in this module"));
        self.functions.remove(pos);
    }

    /// Erase a function: erase its blocks, unlink it, destroy it and
    /// everything it owns
    ///
    /// Each block's uses are cleared with `replace_all_uses_with(None)`
    /// before it is erased. The function and its parameters, scopes and
    /// variables must be unused by the surviving graph.
    pub fn erase_function(&mut self, function: ValueId) {
        while let Some(&block) = self.function(function).blocks.first() {
            self.replace_all_uses_with(block, None);
            self.erase_basic_block(block);
        }
        assert!(
            !self.value(function).has_users(),
            "destroying a function that still has users"
        );
        self.remove_function(function);

        let owned: Vec<ValueId> = {
            let func = self.function(function);
            let mut owned = Vec::new();
            owned.extend_from_slice(&func.parameters);
            owned.extend(func.this_parameter);
            let mut scopes = func.external_scopes.clone();
            scopes.push(func.function_scope);
            for &scope in &scopes {
                owned.extend_from_slice(&self.scope(scope).variables);
            }
            owned.extend(scopes);
            owned
        };
        for id in owned {
            assert!(
                !self.value(id).has_users(),
                "destroying a function whose {} still has users",
                self.value(id).kind_str()
            );
            self.values.free(id);
        }
        self.values.free(function);
    }

    // ---------------------------------------------------------------------
    // Basic blocks
    // ---------------------------------------------------------------------

    /// Create an empty basic block appended to `function`
    pub fn create_basic_block(&mut self, function: ValueId) -> ValueId {
        let block = self.values.alloc(Value::new_basic_block(BasicBlock {
            parent: function,
            instructions: Vec::new(),
        }));
        self.function_mut(function).blocks.push(block);
        block
    }

    /// The block's terminator: its last instruction, when that instruction
    /// is a terminator. Absent while the block is under construction.
    pub fn terminator(&self, block: ValueId) -> Option<ValueId> {
        let &last = self.basic_block(block).instructions.last()?;
        self.value(last).kind().is_terminator().then_some(last)
    }

    /// Unlink a block from its function without destroying it
    pub fn remove_basic_block(&mut self, block: ValueId) {
        let parent = self.basic_block(block).parent;
        let blocks = &mut self.function_mut(parent).blocks;
        let pos = blocks
            .iter()
            .position(|&b| b == block)
            .unwrap_or_else(|| panic!("block is not in its parent function"));
        blocks.remove(pos);
    }

    /// Erase a block: clear its uses, erase its instructions, unlink and
    /// destroy it
    ///
    /// Users of the block (branches elsewhere in the function) have the
    /// operand nulled. Instructions are erased front to back; forward
    /// dependencies inside the block are cut by nulling each instruction's
    /// uses first, which is why null is a legal operand.
    pub fn erase_basic_block(&mut self, block: ValueId) {
        self.replace_all_uses_with(block, None);
        while let Some(&inst) = self.basic_block(block).instructions.first() {
            self.replace_all_uses_with(inst, None);
            self.erase_instruction(inst);
        }
        assert!(
            !self.value(block).has_users(),
            "destroying a block that still has users"
        );
        self.remove_basic_block(block);
        self.values.free(block);
    }

    // ---------------------------------------------------------------------
    // Instruction placement
    // ---------------------------------------------------------------------

    /// Append an unattached instruction at the end of `block`
    pub fn append_instruction(&mut self, block: ValueId, inst: ValueId) {
        assert!(
            self.instruction(inst).parent.is_none(),
            "instruction is already attached to a block"
        );
        self.instruction_mut(inst).parent = Some(block);
        self.basic_block_mut(block).instructions.push(inst);
    }

    /// Insert an unattached instruction before `before` in its block
    pub fn insert_instruction_before(&mut self, inst: ValueId, before: ValueId) {
        assert!(
            self.instruction(inst).parent.is_none(),
            "instruction is already attached to a block"
        );
        let block = self
            .instruction(before)
            .parent
            .unwrap_or_else(|| panic!("insertion point is not attached to a block"));
        let instructions = &mut self.basic_block_mut(block).instructions;
        let pos = instructions
            .iter()
            .position(|&i| i == before)
            .unwrap_or_else(|| panic!("insertion point is not in its parent block"));
        instructions.insert(pos, inst);
        self.instruction_mut(inst).parent = Some(block);
    }

    /// Insert an unattached instruction after `after` in its block
    pub fn insert_instruction_after(&mut self, inst: ValueId, after: ValueId) {
        assert!(
            self.instruction(inst).parent.is_none(),
            "instruction is already attached to a block"
        );
        let block = self
            .instruction(after)
            .parent
            .unwrap_or_else(|| panic!("insertion point is not attached to a block"));
        let instructions = &mut self.basic_block_mut(block).instructions;
        let pos = instructions
            .iter()
            .position(|&i| i == after)
            .unwrap_or_else(|| panic!("insertion point is not in its parent block"));
        instructions.insert(pos + 1, inst);
        self.instruction_mut(inst).parent = Some(block);
    }

    /// Unlink `inst` from its block and re-insert it before `later`,
    /// possibly in a different block
    pub fn move_instruction_before(&mut self, inst: ValueId, later: ValueId) {
        if inst == later {
            return;
        }
        self.remove_instruction(inst);
        self.insert_instruction_before(inst, later);
    }

    /// Unlink an instruction from its block without destroying it
    pub fn remove_instruction(&mut self, inst: ValueId) {
        let block = self
            .instruction(inst)
            .parent
            .unwrap_or_else(|| panic!("removing an instruction that is not in a block"));
        let instructions = &mut self.basic_block_mut(block).instructions;
        let pos = instructions
            .iter()
            .position(|&i| i == inst)
            .unwrap_or_else(|| panic!("instruction is not in its parent block"));
        instructions.remove(pos);
        self.instruction_mut(inst).parent = None;
    }

    /// Erase an instruction: release its operands, unlink it if attached,
    /// destroy it
    pub fn erase_instruction(&mut self, inst: ValueId) {
        for index in 0..self.instruction(inst).num_operands() {
            self.set_operand(inst, index, None);
        }
        assert!(
            !self.value(inst).has_users(),
            "destroying an instruction that still has users"
        );
        if self.instruction(inst).parent.is_some() {
            self.remove_instruction(inst);
        }
        self.values.free(inst);
    }

    // ---------------------------------------------------------------------
    // Parameters, scopes, variables
    // ---------------------------------------------------------------------

    /// Create a parameter of `function`
    ///
    /// A parameter named `this` becomes the function's `this` parameter;
    /// any other name is appended to the ordered parameter list. Callers
    /// never branch on the name themselves.
    pub fn create_parameter(&mut self, function: ValueId, name: Identifier) -> ValueId {
        let param = self.values.alloc(Value::new_parameter(Parameter {
            parent: function,
            name,
        }));
        if self.ctx.ident_str(name) == "this" {
            self.function_mut(function).this_parameter = Some(param);
        } else {
            self.function_mut(function).parameters.push(param);
        }
        param
    }

    /// Whether `param` is its function's `this` parameter
    pub fn is_this_parameter(&self, param: ValueId) -> bool {
        let function = self.parameter(param).parent;
        self.function(function).this_parameter == Some(param)
    }

    /// Position of `param` in its function's parameter list
    pub fn parameter_index(&self, param: ValueId) -> usize {
        let function = self.parameter(param).parent;
        self.function(function)
            .parameters
            .iter()
            .position(|&p| p == param)
            .unwrap_or_else(|| panic!("cannot find parameter in the function"))
    }

    /// Create an external scope of `function` at a strictly negative depth
    pub fn create_external_scope(&mut self, function: ValueId, depth: i32) -> ValueId {
        assert!(depth < 0, "invalid external scope depth {}", depth);
        let scope = self.values.alloc(Value::new_scope(
            ValueKind::ExternalScope,
            VariableScope {
                function,
                depth,
                variables: Vec::new(),
            },
        ));
        self.function_mut(function).external_scopes.push(scope);
        scope
    }

    /// Create a variable appended to `scope`
    pub fn create_variable(&mut self, scope: ValueId, name: Identifier) -> ValueId {
        let var = self.values.alloc(Value::new_variable(Variable {
            parent: scope,
            name,
        }));
        self.scope_mut(scope).variables.push(var);
        var
    }

    /// Position of `var` in its scope's variable list
    pub fn variable_index(&self, var: ValueId) -> usize {
        let scope = self.variable(var).parent;
        self.scope(scope)
            .variables
            .iter()
            .position(|&v| v == var)
            .unwrap_or_else(|| panic!("cannot find variable in the variable list"))
    }

    /// Whether `scope` is the function scope of the module's global function
    pub fn is_global_scope(&self, scope: ValueId) -> bool {
        let function = self.function(self.scope(scope).function);
        function.is_global && function.function_scope == scope
    }

    // ---------------------------------------------------------------------
    // Literals
    // ---------------------------------------------------------------------

    /// The canonical number literal for `value`, uniqued by bit pattern
    ///
    /// `+0.0` and `-0.0` are distinct; NaNs with distinct payloads are
    /// distinct.
    pub fn get_literal_number(&mut self, value: f64) -> ValueId {
        let bits = value.to_bits();
        if let Some(&id) = self.literal_numbers.get(&bits) {
            return id;
        }
        let id = self.values.alloc(Value::new_literal(
            ValueKind::LiteralNumber,
            Literal::Number(value),
            Type::number(),
        ));
        self.literal_numbers.insert(bits, id);
        id
    }

    /// The canonical string literal for `value`, uniqued by identifier
    pub fn get_literal_string(&mut self, value: Identifier) -> ValueId {
        if let Some(&id) = self.literal_strings.get(&value) {
            return id;
        }
        let id = self.values.alloc(Value::new_literal(
            ValueKind::LiteralString,
            Literal::String(value),
            Type::string(),
        ));
        self.literal_strings.insert(value, id);
        id
    }

    /// One of the two pre-allocated boolean singletons
    pub fn get_literal_bool(&self, value: bool) -> ValueId {
        if value {
            self.literal_true
        } else {
            self.literal_false
        }
    }

    /// The pre-allocated empty literal
    pub fn get_literal_empty(&self) -> ValueId {
        self.literal_empty
    }

    /// The pre-allocated null literal
    pub fn get_literal_null(&self) -> ValueId {
        self.literal_null
    }

    /// The pre-allocated undefined literal
    pub fn get_literal_undefined(&self) -> ValueId {
        self.literal_undefined
    }

    /// The global object sentinel
    pub fn get_global_object(&self) -> ValueId {
        self.global_object
    }

    // ---------------------------------------------------------------------
    // Global properties
    // ---------------------------------------------------------------------

    /// Global properties in insertion order
    pub fn global_properties(&self) -> &[ValueId] {
        &self.global_property_list
    }

    /// Look up a global property by name
    pub fn find_global_property(&self, name: Identifier) -> Option<ValueId> {
        self.global_property_map.get(&name).copied()
    }

    /// Insert or update a global property
    ///
    /// On first insertion the property is appended to the ordered list; on
    /// later calls `declared` is OR-ed in, so the flag is monotone.
    pub fn add_global_property(&mut self, name: Identifier, declared: bool) -> ValueId {
        if let Some(&prop) = self.global_property_map.get(&name) {
            if declared {
                self.value_mut(prop)
                    .as_global_property_mut()
                    .expect("global property map points at a non-property")
                    .declared = true;
            }
            return prop;
        }
        let name_literal = self.get_literal_string(name);
        let prop = self.values.alloc(Value::new_global_property(GlobalObjectProperty {
            name: name_literal,
            declared,
        }));
        self.global_property_map.insert(name, prop);
        self.global_property_list.push(prop);
        prop
    }

    /// Remove and destroy a global property
    pub fn erase_global_property(&mut self, prop: ValueId) {
        let name_literal = self.global_property(prop).name;
        let name = match self.value(name_literal).as_literal() {
            Some(&Literal::String(name)) => name,
            _ => panic!("global property name is not a literal string"),
        };
        self.global_property_map.remove(&name);
        if let Some(pos) = self.global_property_list.iter().position(|&p| p == prop) {
            self.global_property_list.remove(pos);
            self.values.free(prop);
        }
    }

    // ---------------------------------------------------------------------
    // Internal names
    // ---------------------------------------------------------------------

    /// Derive a module-unique internal name from `original_name`
    ///
    /// A trailing `" <digits>#"` suffix is stripped first, so re-deriving
    /// from an already-derived name never stacks suffixes. The first
    /// occurrence of a base name is returned verbatim; each later
    /// occurrence gets `" <n>#"` with a per-base counter.
    pub fn derive_unique_internal_name(&mut self, original_name: Identifier) -> Identifier {
        let stripped: String = strip_internal_name_suffix(self.ctx.ident_str(original_name)).into();
        let base = self.ctx.get_identifier(&stripped);
        match self.internal_names.entry(base) {
            Entry::Vacant(entry) => {
                entry.insert(0);
                base
            }
            Entry::Occupied(mut entry) => {
                *entry.get_mut() += 1;
                let suffixed = format!("{} {}#", stripped, entry.get());
                self.ctx.get_identifier(&suffixed)
            }
        }
    }

    // ---------------------------------------------------------------------
    // CommonJS segments
    // ---------------------------------------------------------------------

    /// Record a CommonJS module wrapped by `function`
    pub fn add_cjs_module(&mut self, function: ValueId, filename: Identifier) {
        debug_assert!(
            self.value(function).as_function().is_some(),
            "CJS module record must wrap a function"
        );
        self.cjs_modules.push(CJSModule { function, filename });
    }

    /// CommonJS module records in index order
    pub fn cjs_modules(&self) -> &[CJSModule] {
        &self.cjs_modules
    }

    /// Build the reverse call graph once: an edge `g -> f` for every
    /// function `f` used by an instruction whose enclosing function is `g`.
    fn populate_cjs_module_use_graph(&mut self) {
        if !self.cjs_module_use_graph.is_empty() {
            return;
        }
        let functions = self.functions.clone();
        for function in functions {
            let users = self.value(function).users().to_vec();
            for user in users {
                let block = self
                    .instruction(user)
                    .parent
                    .unwrap_or_else(|| panic!("user of a function is not attached to a block"));
                let enclosing = self.basic_block(block).parent;
                self.cjs_module_use_graph
                    .entry(enclosing)
                    .or_default()
                    .insert(function);
            }
        }
        tracing::debug!(
            functions = self.functions.len(),
            "populated CJS module use graph"
        );
    }

    /// Every function that must be emitted with the segment covering the
    /// CJS module indices in `range` (inclusive on both ends)
    ///
    /// Worklist closure over the use graph; visitation order is not
    /// observable. O(V + E) over the reachable sub-graph.
    pub fn functions_in_segment(&mut self, range: SegmentRange) -> FxHashSet<ValueId> {
        self.populate_cjs_module_use_graph();

        let mut result = FxHashSet::default();
        let mut worklist: Vec<ValueId> = (range.first..=range.last)
            .map(|i| self.cjs_modules[i as usize].function)
            .collect();
        while let Some(current) = worklist.pop() {
            if !result.insert(current) {
                continue;
            }
            if let Some(targets) = self.cjs_module_use_graph.get(&current) {
                worklist.extend(targets.iter().copied());
            }
        }
        tracing::trace!(
            first = range.first,
            last = range.last,
            functions = result.len(),
            "collected segment functions"
        );
        result
    }
}

/// Strip a trailing `" <digits>#"` produced by internal name derivation
///
/// The digits must be directly preceded by a single space; anything else is
/// returned unchanged.
fn strip_internal_name_suffix(name: &str) -> &str {
    let bytes = name.as_bytes();
    let n = bytes.len();
    if !(n >= 3 && bytes[n - 1] == b'#' && bytes[n - 2].is_ascii_digit()) {
        return name;
    }
    let mut e = n - 2;
    while e > 0 && bytes[e - 1].is_ascii_digit() {
        e -= 1;
    }
    if e == 0 || bytes[e - 1] != b' ' {
        return name;
    }
    &name[..e - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_module() -> Module {
        Module::new(Context::new())
    }

    fn ident(module: &mut Module, s: &str) -> Identifier {
        module.context_mut().get_identifier(s)
    }

    #[test]
    fn test_strip_internal_name_suffix() {
        assert_eq!(strip_internal_name_suffix("foo 3#"), "foo");
        assert_eq!(strip_internal_name_suffix("foo 123#"), "foo");
        // Digits must be preceded by a space.
        assert_eq!(strip_internal_name_suffix("foo3#"), "foo3#");
        // A '#' without digits is not a suffix.
        assert_eq!(strip_internal_name_suffix("foo #"), "foo #");
        assert_eq!(strip_internal_name_suffix("foo"), "foo");
        assert_eq!(strip_internal_name_suffix("#"), "#");
    }

    #[test]
    fn test_derive_unique_internal_name() {
        let mut module = test_module();
        let foo = ident(&mut module, "foo");

        let first = module.derive_unique_internal_name(foo);
        assert_eq!(module.context().ident_str(first), "foo");

        let second = module.derive_unique_internal_name(foo);
        assert_eq!(module.context().ident_str(second), "foo 1#");

        // Re-deriving from a derived name strips before counting.
        let third = module.derive_unique_internal_name(second);
        assert_eq!(module.context().ident_str(third), "foo 2#");

        let stale = ident(&mut module, "foo 5#");
        let fourth = module.derive_unique_internal_name(stale);
        assert_eq!(module.context().ident_str(fourth), "foo 3#");
    }

    #[test]
    fn test_literal_number_uniquing() {
        let mut module = test_module();
        assert_eq!(module.get_literal_number(1.0), module.get_literal_number(1.0));
        // Bit patterns, not numeric equality.
        assert_ne!(module.get_literal_number(0.0), module.get_literal_number(-0.0));
        let nan_a = f64::from_bits(0x7ff8_0000_0000_0000);
        let nan_b = f64::from_bits(0x7ff8_0000_0000_0001);
        assert_ne!(module.get_literal_number(nan_a), module.get_literal_number(nan_b));
        assert_eq!(module.get_literal_number(nan_a), module.get_literal_number(nan_a));
    }

    #[test]
    fn test_literal_string_uniquing_and_singletons() {
        let mut module = test_module();
        let a = ident(&mut module, "a");
        let b = ident(&mut module, "b");
        assert_eq!(module.get_literal_string(a), module.get_literal_string(a));
        assert_ne!(module.get_literal_string(a), module.get_literal_string(b));

        assert_eq!(module.get_literal_bool(true), module.get_literal_bool(true));
        assert_ne!(module.get_literal_bool(true), module.get_literal_bool(false));
        assert_eq!(
            module.value(module.get_literal_undefined()).kind(),
            ValueKind::LiteralUndefined
        );
        assert_eq!(
            module.value(module.get_global_object()).kind(),
            ValueKind::GlobalObject
        );
    }

    #[test]
    fn test_global_property_declared_is_monotone() {
        let mut module = test_module();
        let name = ident(&mut module, "print");

        let prop = module.add_global_property(name, false);
        assert!(!module.global_property(prop).is_declared());

        let again = module.add_global_property(name, true);
        assert_eq!(prop, again);
        assert!(module.global_property(prop).is_declared());

        // Once true, false never clears it.
        module.add_global_property(name, false);
        assert!(module.global_property(prop).is_declared());
    }

    #[test]
    fn test_global_property_erase() {
        let mut module = test_module();
        let name = ident(&mut module, "x");
        let prop = module.add_global_property(name, true);
        assert_eq!(module.find_global_property(name), Some(prop));
        assert_eq!(module.global_properties(), &[prop]);

        module.erase_global_property(prop);
        assert_eq!(module.find_global_property(name), None);
        assert!(module.global_properties().is_empty());
    }

    #[test]
    fn test_this_parameter_placement() {
        let mut module = test_module();
        let name = ident(&mut module, "f");
        let func = module.create_function(
            name,
            DefinitionKind::Es5Function,
            false,
            false,
            SourceRange::INVALID,
            None,
        );
        let this_name = ident(&mut module, "this");
        let a_name = ident(&mut module, "a");

        let this_param = module.create_parameter(func, this_name);
        let a_param = module.create_parameter(func, a_name);

        assert_eq!(module.function(func).this_parameter(), Some(this_param));
        assert_eq!(module.function(func).parameters(), &[a_param]);
        assert!(module.is_this_parameter(this_param));
        assert!(!module.is_this_parameter(a_param));
        assert_eq!(module.parameter_index(a_param), 0);
    }

    #[test]
    fn test_function_insert_before() {
        let mut module = test_module();
        let a = ident(&mut module, "a");
        let b = ident(&mut module, "b");
        let fa = module.create_function(
            a,
            DefinitionKind::Es5Function,
            false,
            false,
            SourceRange::INVALID,
            None,
        );
        let fb = module.create_function(
            b,
            DefinitionKind::Es5Function,
            false,
            false,
            SourceRange::INVALID,
            Some(fa),
        );
        assert_eq!(module.functions(), &[fb, fa]);
    }

    #[test]
    #[should_panic(expected = "invalid external scope depth")]
    fn test_external_scope_rejects_non_negative_depth() {
        let mut module = test_module();
        let name = ident(&mut module, "f");
        let func = module.create_function(
            name,
            DefinitionKind::Es5Function,
            false,
            false,
            SourceRange::INVALID,
            None,
        );
        module.create_external_scope(func, 0);
    }

    #[test]
    fn test_scopes_and_variables() {
        let mut module = test_module();
        let name = ident(&mut module, "global");
        let func = module.create_function(
            name,
            DefinitionKind::Es5Function,
            true,
            true,
            SourceRange::INVALID,
            None,
        );
        let scope = module.function(func).function_scope();
        assert!(module.is_global_scope(scope));
        assert_eq!(module.scope(scope).depth(), 0);

        let outer = module.create_external_scope(func, -1);
        assert!(!module.is_global_scope(outer));
        assert_eq!(module.scope(outer).depth(), -1);
        assert_eq!(module.function(func).external_scopes(), &[outer]);

        let x = ident(&mut module, "x");
        let y = ident(&mut module, "y");
        let vx = module.create_variable(scope, x);
        let vy = module.create_variable(scope, y);
        assert_eq!(module.variable_index(vx), 0);
        assert_eq!(module.variable_index(vy), 1);
    }

    #[test]
    fn test_terminator_query() {
        let mut module = test_module();
        let name = ident(&mut module, "f");
        let func = module.create_function(
            name,
            DefinitionKind::Es5Function,
            false,
            false,
            SourceRange::INVALID,
            None,
        );
        let block = module.create_basic_block(func);
        assert_eq!(module.terminator(block), None);

        let undef = module.get_literal_undefined();
        let mov = module.create_mov_inst(undef);
        module.append_instruction(block, mov);
        // A non-terminator in last position is not a terminator.
        assert_eq!(module.terminator(block), None);

        let ret = module.create_return_inst(undef);
        module.append_instruction(block, ret);
        assert_eq!(module.terminator(block), Some(ret));
    }
}
