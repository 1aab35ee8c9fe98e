//! Top builder.
//!
//! Sits above [`FunctionBuilder`]: owns the module being built, the
//! insertion cursor and the access chain, and offers the structured
//! helpers lowering needs (if/switch/loop builders, matrix arithmetic,
//! compare-and-reduce, output shadow copy-out).

use alloc::{format, vec, vec::Vec};

use topir::{
    BinaryOp, Block, Cursor, FloatCC, FuncRef, FunctionBuilder, GlobalVar, IntCC, Intrinsic,
    MdNode, Module, Precision, Signature, TypeData, TypeId, Value,
};

use crate::{
    codegen::{
        access_chain::AccessChain,
        r#loop::{LoopInfo, LoopStack},
    },
    error::{LowerError, LowerResult},
};

/// A pipeline output and the shadow global standing in for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputShadow {
    pub global: GlobalVar,
    pub md: Option<MdNode>,
    pub slot: i32,
    pub num_slots: u32,
    /// Written somewhere in the shader
    pub active: bool,
}

/// Blocks of an open `if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfBuilder {
    else_block: Option<Block>,
    merge: Block,
}

/// Blocks of an open `switch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchBuilder {
    segments: Vec<Block>,
    merge: Block,
}

impl SwitchBuilder {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// Module under construction plus insertion state.
pub struct TopBuilder {
    pub module: Module,
    pub cursor: Cursor,
    pub chain: AccessChain,
    outputs: Vec<OutputShadow>,
    /// Outputs were flushed by an explicit emit; skip the copy-out at exit
    explicit_copy_out: bool,
    loops: LoopStack,
    switch_merges: Vec<Block>,
}

impl TopBuilder {
    /// Create a module holding an entry-point function `main` with an
    /// `entry` block, and position the cursor there.
    pub fn new() -> Self {
        let mut module = Module::new();
        let void = module.types.void();
        let main = module.declare_function("main", Signature::new(Vec::new(), void));
        let func = module.function_mut(main);
        func.attrs.entry_point = true;
        let entry = func.create_block("entry");
        Self {
            module,
            cursor: Cursor {
                func: main,
                block: entry,
            },
            chain: AccessChain::new(),
            outputs: Vec::new(),
            explicit_copy_out: false,
            loops: LoopStack::new(),
            switch_merges: Vec::new(),
        }
    }

    /// Instruction builder at the cursor.
    pub fn builder(&mut self) -> FunctionBuilder<'_> {
        FunctionBuilder::new(&mut self.module, &mut self.cursor)
    }

    pub fn finish(self) -> Module {
        self.module
    }

    pub fn current_function(&self) -> FuncRef {
        self.cursor.func
    }

    pub fn current_block(&self) -> Block {
        self.cursor.block
    }

    pub fn set_insert_point(&mut self, func: FuncRef, block: Block) {
        self.cursor = Cursor { func, block };
    }

    pub fn is_terminated(&self) -> bool {
        self.module.function(self.cursor.func).is_terminated(self.cursor.block)
    }

    pub fn value_type(&self, value: Value) -> TypeId {
        self.module.function(self.cursor.func).dfg.values[value].ty
    }

    /// Scalar type under any arrays and vectors of `ty`.
    pub fn basic_type(&self, ty: TypeId) -> TypeId {
        let types = &self.module.types;
        let mut ty = ty;
        while let TypeData::Array { elem, .. } = types.data(ty) {
            ty = *elem;
        }
        types.scalar_of(ty)
    }

    pub fn is_float_value(&self, value: Value) -> bool {
        let basic = self.basic_type(self.value_type(value));
        self.module.types.is_float(basic)
    }

    pub fn is_aggregate_value(&self, value: Value) -> bool {
        self.module.types.is_aggregate(self.value_type(value))
    }

    pub fn component_count(&self, value: Value) -> u32 {
        self.module.types.component_count(self.value_type(value))
    }

    fn jump_if_open(&mut self, dest: Block) {
        if !self.is_terminated() {
            self.builder().jump(dest);
        }
    }

    // Access chain

    pub fn clear_chain(&mut self) {
        self.chain.clear();
    }

    pub fn chain_load(&mut self, precision: Precision) -> LowerResult<Value> {
        let mut b = FunctionBuilder::new(&mut self.module, &mut self.cursor);
        self.chain.load(&mut b, precision)
    }

    pub fn chain_store(&mut self, value: Value) -> LowerResult<()> {
        let mut b = FunctionBuilder::new(&mut self.module, &mut self.cursor);
        self.chain.store(&mut b, value)?;
        if let Some(output) = self.chain.tracked() {
            self.mark_active(output);
        }
        Ok(())
    }

    pub fn chain_get_l(&mut self) -> LowerResult<Value> {
        let mut b = FunctionBuilder::new(&mut self.module, &mut self.cursor);
        self.chain.get_l(&mut b)
    }

    pub fn chain_evolve_to_runtime_array_base(&mut self) -> LowerResult<()> {
        let mut b = FunctionBuilder::new(&mut self.module, &mut self.cursor);
        self.chain.evolve_to_runtime_array_base(&mut b)
    }

    // Pipeline outputs

    pub fn add_output(&mut self, global: GlobalVar, md: Option<MdNode>, slot: i32, num_slots: u32) {
        self.outputs.push(OutputShadow {
            global,
            md,
            slot,
            num_slots,
            active: false,
        });
    }

    pub fn outputs(&self) -> &[OutputShadow] {
        &self.outputs
    }

    fn mark_active(&mut self, global: GlobalVar) {
        if let Some(output) = self.outputs.iter_mut().find(|o| o.global == global) {
            output.active = true;
        }
    }

    /// Outputs are flushed by explicit emits; no implicit copy-out at exit.
    pub fn set_explicit_copy_out(&mut self) {
        self.explicit_copy_out = true;
    }

    /// Write every active output shadow to its pipeline slot.
    pub fn copy_out_pipeline(&mut self) -> LowerResult<()> {
        let active: Vec<OutputShadow> = self.outputs.iter().filter(|o| o.active).cloned().collect();
        let mut b = self.builder();
        for output in active {
            let ptr = b.global_addr(output.global);
            let value = b.load(ptr)?;
            b.write_pipeline(value, output.slot, output.md, -1);
        }
        Ok(())
    }

    // Function exits

    /// `return` from the entry point: flush outputs, then return.
    pub fn make_main_return(&mut self) -> LowerResult<()> {
        if !self.explicit_copy_out {
            self.copy_out_pipeline()?;
        }
        self.builder().return_(None);
        Ok(())
    }

    pub fn make_return(&mut self, value: Option<Value>) {
        self.builder().return_(value);
    }

    pub fn make_discard(&mut self) {
        self.builder().discard();
    }

    /// Close the current function at the cursor if control can still fall
    /// off its end.
    pub fn leave_function(&mut self, main: bool) -> LowerResult<()> {
        if self.is_terminated() {
            return Ok(());
        }
        if main {
            return self.make_main_return();
        }
        let ret = self.module.function(self.cursor.func).signature.ret;
        let value = match self.module.types.data(ret) {
            TypeData::Void => None,
            _ => Some(self.builder().zero(ret)),
        };
        self.builder().return_(value);
        Ok(())
    }

    // Arithmetic helpers

    /// Broadcast whichever operand is a scalar to the other's vector width.
    pub fn promote_scalar(&mut self, left: Value, right: Value) -> (Value, Value) {
        let lw = self.component_count(left);
        let rw = self.component_count(right);
        let types = &self.module.types;
        let l_scalar = types.is_scalar(self.value_type(left));
        let r_scalar = types.is_scalar(self.value_type(right));
        if l_scalar && rw > 1 {
            (self.builder().splat(left, rw), right)
        } else if r_scalar && lw > 1 {
            (left, self.builder().splat(right, lw))
        } else {
            (left, right)
        }
    }

    /// Smear a scalar to match the shape of `like`.
    pub fn smear_scalar(&mut self, scalar: Value, like: TypeId) -> Value {
        let width = self.module.types.component_count(like);
        if width > 1 {
            self.builder().splat(scalar, width)
        } else {
            scalar
        }
    }

    /// Matrix product of matrices, vectors and scalars.
    pub fn create_matrix_multiply(
        &mut self,
        precision: Precision,
        left: Value,
        right: Value,
        result_ty: TypeId,
    ) -> LowerResult<Value> {
        let value = self
            .builder()
            .intrinsic(Intrinsic::FMatrixMultiply, vec![left, right], result_ty)
            .ok_or_else(|| LowerError::invariant("matrix multiply with a void result"))?;
        self.builder().set_precision(value, precision);
        Ok(value)
    }

    /// Component-wise `op` over matrices, column by column. Either operand
    /// may be a scalar, which is applied to every column.
    pub fn create_matrix_op(
        &mut self,
        precision: Precision,
        op: BinaryOp,
        left: Value,
        right: Value,
    ) -> LowerResult<Value> {
        let matrix = if self.is_aggregate_value(left) { left } else { right };
        let matrix_ty = self.value_type(matrix);
        let columns = self.module.types.member_count(matrix_ty);
        let mut result = self.builder().zero(matrix_ty);
        for col in 0..columns {
            let l = self.matrix_column(left, col)?;
            let r = self.matrix_column(right, col)?;
            let (l, r) = self.promote_scalar(l, r);
            let mut b = self.builder();
            let column = b.binary(op, l, r);
            b.set_precision(column, precision);
            result = b.insert_value(result, column, col);
        }
        Ok(result)
    }

    fn matrix_column(&mut self, value: Value, col: u32) -> LowerResult<Value> {
        if self.is_aggregate_value(value) {
            Ok(self.builder().extract_value(value, col)?)
        } else {
            Ok(value)
        }
    }

    pub fn create_matrix_construct(
        &mut self,
        precision: Precision,
        args: Vec<Value>,
        ty: TypeId,
    ) -> LowerResult<Value> {
        let value = self
            .builder()
            .intrinsic(Intrinsic::FMatrixConstruct, args, ty)
            .ok_or_else(|| LowerError::invariant("matrix constructor of void"))?;
        self.builder().set_precision(value, precision);
        Ok(value)
    }

    /// Whole-value `==` (or `!=`) reduced to a single bool.
    pub fn create_compare(
        &mut self,
        precision: Precision,
        left: Value,
        right: Value,
        equal: bool,
    ) -> LowerResult<Value> {
        let ty = self.value_type(left);
        let types = &self.module.types;
        if types.is_aggregate(ty) {
            let count = types.member_count(ty);
            let combine = if equal { BinaryOp::And } else { BinaryOp::Or };
            let mut acc: Option<Value> = None;
            for i in 0..count {
                let l = self.builder().extract_value(left, i)?;
                let r = self.builder().extract_value(right, i)?;
                let member = self.create_compare(precision, l, r, equal)?;
                acc = Some(match acc {
                    Some(prev) => self.builder().binary(combine, prev, member),
                    None => member,
                });
            }
            return Ok(match acc {
                Some(v) => v,
                None => self.builder().bconst(equal),
            });
        }

        let is_vector = types.is_vector(ty);
        let float = self.is_float_value(left);
        let mut b = self.builder();
        let cmp = match (float, equal) {
            (true, true) => b.fcmp(FloatCC::Equal, left, right),
            (true, false) => b.fcmp(FloatCC::NotEqual, left, right),
            (false, true) => b.icmp(IntCC::Equal, left, right),
            (false, false) => b.icmp(IntCC::NotEqual, left, right),
        };
        b.set_precision(cmp, precision);
        if !is_vector {
            return Ok(cmp);
        }
        let reduce = if equal { Intrinsic::All } else { Intrinsic::Any };
        let bool_ty = b.module().types.bool();
        b.intrinsic(reduce, vec![cmp], bool_ty)
            .ok_or_else(|| LowerError::invariant("vector compare reduced to void"))
    }

    // If builder

    /// Branch on `cond` into a fresh `then` block.
    pub fn make_if(&mut self, cond: Value, with_else: bool) -> IfBuilder {
        let mut b = self.builder();
        let then_block = b.create_block("then");
        let else_block = with_else.then(|| b.create_block("else"));
        let merge = b.create_block("ifmerge");
        b.br(cond, then_block, else_block.unwrap_or(merge));
        b.switch_to_block(then_block);
        IfBuilder { else_block, merge }
    }

    pub fn make_else(&mut self, if_builder: &IfBuilder) {
        self.jump_if_open(if_builder.merge);
        if let Some(else_block) = if_builder.else_block {
            self.builder().switch_to_block(else_block);
        }
    }

    pub fn close_if(&mut self, if_builder: IfBuilder) {
        self.jump_if_open(if_builder.merge);
        let mut b = self.builder();
        b.move_block_to_end(if_builder.merge);
        b.switch_to_block(if_builder.merge);
    }

    // Switch builder

    /// Emit a multi-way branch over `num_segments` code segments.
    ///
    /// `cases` maps each case value to the segment it starts; a missing
    /// default branches to the merge block.
    pub fn make_switch(
        &mut self,
        selector: Value,
        num_segments: usize,
        cases: &[(i32, usize)],
        default_segment: Option<usize>,
    ) -> LowerResult<SwitchBuilder> {
        let mut b = self.builder();
        let segments: Vec<Block> = (0..num_segments)
            .map(|_| b.create_block("switch-segment"))
            .collect();
        let merge = b.create_block("switch-merge");
        let segment = |s: usize| {
            segments
                .get(s)
                .copied()
                .ok_or_else(|| LowerError::invariant(format!("switch segment {} out of range", s)))
        };
        let targets = cases
            .iter()
            .map(|(value, s)| segment(*s).map(|block| (*value, block)))
            .collect::<LowerResult<Vec<_>>>()?;
        let default = match default_segment {
            Some(s) => segment(s)?,
            None => merge,
        };
        b.switch(selector, targets, default);
        self.switch_merges.push(merge);
        Ok(SwitchBuilder { segments, merge })
    }

    /// Start segment `s`, falling through from the previous one.
    pub fn next_switch_segment(&mut self, switch: &SwitchBuilder, s: usize) {
        let block = switch.segments[s];
        if s > 0 {
            self.jump_if_open(block);
        }
        self.builder().switch_to_block(block);
    }

    pub fn add_switch_break(&mut self) -> LowerResult<()> {
        let merge = *self
            .switch_merges
            .last()
            .ok_or_else(|| LowerError::invariant("switch break outside a switch"))?;
        self.builder().jump(merge);
        Ok(())
    }

    pub fn end_switch(&mut self, switch: SwitchBuilder) {
        self.jump_if_open(switch.merge);
        self.switch_merges.pop();
        let mut b = self.builder();
        b.move_block_to_end(switch.merge);
        b.switch_to_block(switch.merge);
    }

    // Loop builder

    /// Open a loop: branch into a new header block. A test-last loop also
    /// gets a separate end-test block.
    pub fn make_new_loop(&mut self, test_first: bool) {
        let mut b = self.builder();
        let header = b.create_block("loop-header");
        let exit = b.create_block("loop-merge");
        let info = if test_first {
            LoopInfo::new(header, exit)
        } else {
            let test = b.create_block("loop-test");
            LoopInfo::with_test(header, exit, test)
        };
        b.jump(header);
        b.switch_to_block(header);
        self.loops.push(info);
    }

    /// End of a test-last body: fall into the end test.
    pub fn make_branch_to_loop_end_test(&mut self) -> LowerResult<()> {
        let test = self
            .loops
            .current()
            .and_then(|l| l.test())
            .ok_or_else(|| LowerError::invariant("end test outside a test-last loop"))?;
        self.jump_if_open(test);
        self.builder().switch_to_block(test);
        Ok(())
    }

    /// Branch on the loop condition. Test-first loops continue into a new
    /// body block; test-last loops branch back to the header.
    pub fn make_loop_test(&mut self, cond: Value) -> LowerResult<()> {
        let info = *self
            .loops
            .current()
            .ok_or_else(|| LowerError::invariant("loop test outside a loop"))?;
        let mut b = self.builder();
        if info.test().is_some() {
            b.br(cond, info.header(), info.exit());
        } else {
            let body = b.create_block("loop-body");
            b.br(cond, body, info.exit());
            b.switch_to_block(body);
        }
        Ok(())
    }

    /// `break` out of the innermost loop.
    pub fn make_loop_exit(&mut self) -> LowerResult<()> {
        let exit = self
            .loops
            .find_break_target()
            .ok_or_else(|| LowerError::invariant("break outside a loop"))?;
        self.builder().jump(exit);
        Ok(())
    }

    /// `continue` in the innermost loop.
    pub fn make_loop_back_edge(&mut self) -> LowerResult<()> {
        let target = self
            .loops
            .find_continue_target()
            .ok_or_else(|| LowerError::invariant("continue outside a loop"))?;
        self.builder().jump(target);
        Ok(())
    }

    /// Take the back edge if the body falls off its end, then continue
    /// after the loop.
    pub fn close_loop(&mut self) -> LowerResult<()> {
        let info = self
            .loops
            .pop()
            .ok_or_else(|| LowerError::invariant("loop closed twice"))?;
        self.jump_if_open(info.header());
        let mut b = self.builder();
        b.move_block_to_end(info.exit());
        b.switch_to_block(info.exit());
        Ok(())
    }
}

impl Default for TopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
