//! Per-unit lowering state.
//!
//! One [`LowerContext`] lives for exactly one traversal of one translation
//! unit. It owns the module under construction (through [`TopBuilder`]),
//! the diagnostic sink and every cache the components share.


use alloc::{collections::BTreeMap, string::String, vec::Vec};

use topir::{Block, FuncRef, GlobalVar, MdNode, Precision, TypeId, Value};

use crate::{
    ast::{Node, SymbolId, TranslationUnit},
    codegen::TopBuilder,
    config::LowerOptions,
    diagnostics::Diagnostics,
    error::LowerResult,
    lower::lower_node,
    metadata::precision_of,
    stage::ShaderStage,
};

/// Where a symbol lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Global(GlobalVar),
    /// Pointer valid inside one function: an `alloca` or a parameter
    Local(Value),
}

/// Lowering state for one translation unit.
pub struct LowerContext<'a> {
    pub top: TopBuilder,
    pub options: LowerOptions,
    pub stage: ShaderStage,
    /// The front end can size pipeline variables in locations
    pub location_sizes: bool,
    pub diags: Diagnostics,

    /// IR struct per AST member list, keyed by list address
    pub(crate) struct_types: BTreeMap<usize, TypeId>,
    /// Block member index remap, AST member index to IR index
    pub(crate) remaps: BTreeMap<usize, Vec<Option<u32>>>,
    /// Result structs of multi-value intrinsics, keyed by member types
    pub(crate) result_types: BTreeMap<Vec<TypeId>, TypeId>,

    pub(crate) symbols: BTreeMap<SymbolId, Storage>,
    pub(crate) functions: BTreeMap<String, FuncRef>,

    pub(crate) slots: BTreeMap<String, (i32, u32)>,
    pub(crate) next_slot: i32,
    pub(crate) uniform_md: BTreeMap<String, MdNode>,
    pub(crate) input_md: BTreeMap<i32, MdNode>,

    /// Innermost breakable construct is a loop (`true`) or a switch
    pub(crate) break_for_loop: Vec<bool>,
    /// Post-step of each enclosing loop
    pub(crate) loop_terminals: Vec<Option<&'a Node>>,

    pub(crate) main: FuncRef,
    pub(crate) main_body: Block,
    /// Where global initializers are emitted
    pub(crate) init_block: Block,
    /// Last block of the entry point's body
    pub(crate) last_body_block: Block,
    pub(crate) in_main: bool,
    /// Visiting declarations that are never referenced by code
    pub(crate) linkage_only: bool,
    /// Symbol on the left of the assignment being lowered
    pub(crate) left_name: Option<String>,
}

impl<'a> LowerContext<'a> {
    pub fn new(unit: &TranslationUnit, options: LowerOptions) -> Self {
        let mut top = TopBuilder::new();
        let main = top.current_function();
        let init_block = top.current_block();
        let main_body = top.builder().create_block("mainBody");
        Self {
            top,
            options,
            stage: unit.stage,
            location_sizes: unit.location_sizes,
            diags: Diagnostics::new(),
            struct_types: BTreeMap::new(),
            remaps: BTreeMap::new(),
            result_types: BTreeMap::new(),
            symbols: BTreeMap::new(),
            functions: BTreeMap::new(),
            slots: BTreeMap::new(),
            next_slot: topir::metadata::MAX_USER_LAYOUT_LOCATION,
            uniform_md: BTreeMap::new(),
            input_md: BTreeMap::new(),
            break_for_loop: Vec::new(),
            loop_terminals: Vec::new(),
            main,
            main_body,
            init_block,
            last_body_block: main_body,
            in_main: false,
            linkage_only: false,
            left_name: None,
        }
    }

    /// Lower `node` and load its value.
    pub fn rvalue(&mut self, node: &'a Node) -> LowerResult<Value> {
        self.top.clear_chain();
        lower_node(self, node)?;
        self.top.chain_load(precision_of(&node.ty))
    }

    /// Make `value` the result of the current expression.
    pub fn set_rvalue(&mut self, value: Value) {
        self.top.clear_chain();
        self.top.chain.set_r(value);
    }

    /// Report an unsupported construct and continue.
    pub fn unsupported(&mut self, msg: impl Into<String>) {
        self.diags.unsupported(msg);
    }

    /// Result value standing in for something that could not be lowered.
    pub fn placeholder(&mut self, ty: TypeId) -> Value {
        self.top.builder().zero(ty)
    }

    pub fn set_precision(&mut self, value: Value, precision: Precision) {
        self.top.builder().set_precision(value, precision);
    }
}
