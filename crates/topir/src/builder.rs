//! Positioned instruction builder.
//!
//! A [`FunctionBuilder`] borrows a module and a [`Cursor`] naming the
//! function and block that receive new instructions. Emitting into a block
//! that already ends in a terminator opens a fresh, unreachable block, so
//! statements that follow a `break` or `return` still have somewhere to go.

use alloc::{format, string::ToString, vec, vec::Vec};

use crate::{
    condcodes::{FloatCC, IntCC},
    dfg::{BinaryOp, CastOp, GepIndex, InstData, Opcode, PipelineRead, UnaryOp},
    entity::{Block, Constant, FuncRef, GlobalVar, Inst, MdNode, TypeId, Value},
    error::IrError,
    function::Function,
    intrinsic::Intrinsic,
    metadata::{InterpolationMode, Precision},
    module::Module,
    texture::{ImageOp, QueryOp, SamplerType, TextureFlags, TextureParams},
    types::TypeData,
};

/// Insertion position: a function and a block inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub func: FuncRef,
    pub block: Block,
}

/// A `gep` step as given to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GepStep {
    Const(u32),
    Value(Value),
}

/// Instruction builder for one function of a module.
pub struct FunctionBuilder<'a> {
    module: &'a mut Module,
    cursor: &'a mut Cursor,
}

impl<'a> FunctionBuilder<'a> {
    /// Create a builder inserting at `cursor`.
    pub fn new(module: &'a mut Module, cursor: &'a mut Cursor) -> Self {
        Self { module, cursor }
    }

    pub fn module(&mut self) -> &mut Module {
        self.module
    }

    pub fn func(&self) -> &Function {
        self.module.function(self.cursor.func)
    }

    fn func_mut(&mut self) -> &mut Function {
        self.module.function_mut(self.cursor.func)
    }

    /// Current insertion block.
    pub fn current_block(&self) -> Block {
        self.cursor.block
    }

    /// Create a new block in the current function.
    pub fn create_block(&mut self, name: &str) -> Block {
        self.func_mut().create_block(name)
    }

    /// Move `block` after every other block of the function.
    pub fn move_block_to_end(&mut self, block: Block) {
        self.func_mut().move_block_to_end(block);
    }

    /// Move the insertion point to the end of `block`.
    pub fn switch_to_block(&mut self, block: Block) {
        self.cursor.block = block;
    }

    /// True if the current block already ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.func().is_terminated(self.cursor.block)
    }

    /// Type of a value in the current function.
    pub fn value_type(&self, value: Value) -> TypeId {
        self.func().dfg.values[value].ty
    }

    fn ensure_open_block(&mut self) -> Block {
        if self.is_terminated() {
            log::trace!(
                "%{}: {} is terminated, opening an unreachable block",
                self.func().name,
                self.cursor.block
            );
            let dead = self.create_block("unreachable");
            self.switch_to_block(dead);
        }
        self.cursor.block
    }

    fn value_inst(&mut self, opcode: Opcode, args: Vec<Value>, ty: TypeId) -> Value {
        let block = self.ensure_open_block();
        let func = self.func_mut();
        let (inst, value) = func.dfg.create_value_inst(InstData::new(opcode, args), ty);
        func.append_inst(inst, block);
        value
    }

    fn effect_inst(&mut self, opcode: Opcode, args: Vec<Value>) -> Inst {
        let block = self.ensure_open_block();
        let func = self.func_mut();
        let inst = func.dfg.create_inst(InstData::new(opcode, args));
        func.append_inst(inst, block);
        inst
    }

    /// Tag the instruction defining `value` with a precision.
    pub fn set_precision(&mut self, value: Value, precision: Precision) {
        let func = self.func_mut();
        if let Some(inst) = func.dfg.defining_inst(value) {
            func.dfg.insts[inst].precision = precision;
        }
    }

    /// Attach a metadata node to the instruction defining `value`.
    pub fn attach_md(&mut self, value: Value, md: MdNode) {
        let func = self.func_mut();
        if let Some(inst) = func.dfg.defining_inst(value) {
            func.dfg.insts[inst].md = Some(md);
        }
    }

    // Values

    /// Materialize a pool constant.
    pub fn constant(&mut self, constant: Constant) -> Value {
        let ty = self.module.constants.ty(constant);
        self.value_inst(Opcode::Const { constant }, Vec::new(), ty)
    }

    pub fn iconst(&mut self, value: i32) -> Value {
        let c = self.module.const_i32(value);
        self.constant(c)
    }

    pub fn uconst(&mut self, value: u32) -> Value {
        let c = self.module.const_u32(value);
        self.constant(c)
    }

    pub fn fconst(&mut self, value: f32) -> Value {
        let c = self.module.const_f32(value);
        self.constant(c)
    }

    pub fn bconst(&mut self, value: bool) -> Value {
        let c = self.module.const_bool(value);
        self.constant(c)
    }

    pub fn zero(&mut self, ty: TypeId) -> Value {
        let c = self.module.const_zero(ty);
        self.constant(c)
    }

    /// Address of a global.
    pub fn global_addr(&mut self, global: GlobalVar) -> Value {
        let ty = self.module.global(global).ty;
        let ptr = self.module.types.pointer(ty);
        self.value_inst(Opcode::GlobalAddr { global }, Vec::new(), ptr)
    }

    /// Function-local variable, placed at the top of the entry block.
    pub fn alloca(&mut self, name: &str, ty: TypeId) -> Value {
        let ptr = self.module.types.pointer(ty);
        let func = self.func_mut();
        let (inst, value) = func.dfg.create_value_inst(
            InstData::nullary(Opcode::Alloca {
                name: name.to_string(),
                ty,
            }),
            ptr,
        );
        func.insert_alloca(inst);
        value
    }

    // Memory

    pub fn load(&mut self, ptr: Value) -> Result<Value, IrError> {
        let ptr_ty = self.value_type(ptr);
        let ty = self.module.types.pointee(ptr_ty).ok_or_else(|| {
            IrError::Malformed(format!("load from non-pointer {}", ptr))
        })?;
        Ok(self.value_inst(Opcode::Load, vec![ptr], ty))
    }

    pub fn store(&mut self, value: Value, ptr: Value) -> Inst {
        self.effect_inst(Opcode::Store, vec![value, ptr])
    }

    /// Address of a member or element of the aggregate `base` points to.
    pub fn gep(&mut self, base: Value, steps: &[GepStep]) -> Result<Value, IrError> {
        let base_ty = self.value_type(base);
        let mut ty = self
            .module
            .types
            .pointee(base_ty)
            .ok_or_else(|| IrError::Malformed(format!("gep on non-pointer {}", base)))?;
        let mut path = Vec::with_capacity(steps.len());
        let mut args = vec![base];
        for step in steps {
            let index = match step {
                GepStep::Const(i) => {
                    path.push(GepIndex::Const(*i));
                    Some(*i)
                }
                GepStep::Value(v) => {
                    path.push(GepIndex::Dynamic);
                    args.push(*v);
                    None
                }
            };
            ty = self.module.types.member_type(ty, index).ok_or_else(|| {
                IrError::Malformed(format!(
                    "gep steps into {}",
                    self.module.types.display(ty)
                ))
            })?;
        }
        let ptr = self.module.types.pointer(ty);
        Ok(self.value_inst(Opcode::Gep { path }, args, ptr))
    }

    /// Address of element `index` of a runtime-sized array starting at `base`.
    pub fn element_addr(&mut self, base: Value, index: Value) -> Value {
        let ty = self.value_type(base);
        self.value_inst(Opcode::ElementAddr, vec![base, index], ty)
    }

    // Arithmetic

    pub fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        let ty = self.value_type(lhs);
        self.value_inst(Opcode::Binary(op), vec![lhs, rhs], ty)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Value) -> Value {
        let ty = self.value_type(operand);
        self.value_inst(Opcode::Unary(op), vec![operand], ty)
    }

    pub fn cast(&mut self, op: CastOp, operand: Value, ty: TypeId) -> Value {
        self.value_inst(Opcode::Cast(op), vec![operand], ty)
    }

    fn bool_like(&mut self, value: Value) -> TypeId {
        let ty = self.value_type(value);
        let width = self.module.types.component_count(ty);
        let b = self.module.types.bool();
        self.module.types.vector(b, width)
    }

    /// Integer comparison; vectors compare per component.
    pub fn icmp(&mut self, cc: IntCC, lhs: Value, rhs: Value) -> Value {
        let ty = self.bool_like(lhs);
        self.value_inst(Opcode::Icmp(cc), vec![lhs, rhs], ty)
    }

    /// Ordered float comparison; vectors compare per component.
    pub fn fcmp(&mut self, cc: FloatCC, lhs: Value, rhs: Value) -> Value {
        let ty = self.bool_like(lhs);
        self.value_inst(Opcode::Fcmp(cc), vec![lhs, rhs], ty)
    }

    pub fn select(&mut self, cond: Value, if_true: Value, if_false: Value) -> Value {
        let ty = self.value_type(if_true);
        self.value_inst(Opcode::Select, vec![cond, if_true, if_false], ty)
    }

    // Aggregates and vectors

    pub fn extract_value(&mut self, aggregate: Value, index: u32) -> Result<Value, IrError> {
        let agg_ty = self.value_type(aggregate);
        let ty = self
            .module
            .types
            .member_type(agg_ty, Some(index))
            .ok_or_else(|| IrError::Malformed(format!("extract_value from {}", aggregate)))?;
        Ok(self.value_inst(Opcode::ExtractValue { index }, vec![aggregate], ty))
    }

    pub fn insert_value(&mut self, aggregate: Value, member: Value, index: u32) -> Value {
        let ty = self.value_type(aggregate);
        self.value_inst(Opcode::InsertValue { index }, vec![aggregate, member], ty)
    }

    pub fn extract_element(&mut self, vector: Value, index: Value) -> Value {
        let vec_ty = self.value_type(vector);
        let ty = self.module.types.scalar_of(vec_ty);
        self.value_inst(Opcode::ExtractElement, vec![vector, index], ty)
    }

    pub fn insert_element(&mut self, vector: Value, scalar: Value, index: Value) -> Value {
        let ty = self.value_type(vector);
        self.value_inst(Opcode::InsertElement, vec![vector, scalar, index], ty)
    }

    /// Select components of a vector (or smear a scalar) into a new vector.
    pub fn swizzle(&mut self, vector: Value, components: &[u32]) -> Value {
        let vec_ty = self.value_type(vector);
        let scalar = self.module.types.scalar_of(vec_ty);
        let ty = self.module.types.vector(scalar, components.len() as u32);
        self.value_inst(
            Opcode::Swizzle {
                components: components.to_vec(),
            },
            vec![vector],
            ty,
        )
    }

    /// Write the lanes of `source` into the listed lanes of `target`.
    pub fn insert_lanes(&mut self, target: Value, source: Value, lanes: &[u32]) -> Value {
        let ty = self.value_type(target);
        self.value_inst(
            Opcode::InsertLanes {
                lanes: lanes.to_vec(),
            },
            vec![target, source],
            ty,
        )
    }

    /// Broadcast a scalar to a vector of `width` lanes.
    pub fn splat(&mut self, scalar: Value, width: u32) -> Value {
        let scalar_ty = self.value_type(scalar);
        let ty = self.module.types.vector(scalar_ty, width);
        self.value_inst(Opcode::Splat, vec![scalar], ty)
    }

    // Calls

    /// Call a user function; `None` for a void callee.
    pub fn call(&mut self, callee: FuncRef, args: Vec<Value>) -> Option<Value> {
        let ret = self.module.function(callee).signature.ret;
        self.call_like(Opcode::Call { callee }, args, ret)
    }

    /// Call an intrinsic; `None` when `ret` is void.
    pub fn intrinsic(&mut self, intrinsic: Intrinsic, args: Vec<Value>, ret: TypeId) -> Option<Value> {
        self.call_like(Opcode::Intrinsic(intrinsic), args, ret)
    }

    fn call_like(&mut self, opcode: Opcode, args: Vec<Value>, ret: TypeId) -> Option<Value> {
        if matches!(self.module.types.data(ret), TypeData::Void) {
            self.effect_inst(opcode, args);
            None
        } else {
            Some(self.value_inst(opcode, args, ret))
        }
    }

    // Pipeline

    #[allow(clippy::too_many_arguments)]
    pub fn read_pipeline(
        &mut self,
        ty: TypeId,
        name: &str,
        slot: i32,
        md: Option<MdNode>,
        mask: i32,
        interpolation: InterpolationMode,
        precision: Precision,
    ) -> Value {
        let value = self.value_inst(
            Opcode::ReadPipeline(PipelineRead {
                name: name.to_string(),
                slot,
                md,
                mask,
                interpolation,
            }),
            Vec::new(),
            ty,
        );
        self.set_precision(value, precision);
        value
    }

    pub fn write_pipeline(&mut self, value: Value, slot: i32, md: Option<MdNode>, mask: i32) -> Inst {
        self.effect_inst(Opcode::WritePipeline { slot, md, mask }, vec![value])
    }

    // Textures

    pub fn texture(
        &mut self,
        sampler: SamplerType,
        flags: TextureFlags,
        params: TextureParams,
        ty: TypeId,
    ) -> Value {
        let args = params.operands();
        self.value_inst(
            Opcode::Texture {
                sampler,
                flags,
                params,
            },
            args,
            ty,
        )
    }

    /// Image access; `None` for a store.
    pub fn image(
        &mut self,
        sampler: SamplerType,
        op: ImageOp,
        params: TextureParams,
        ty: TypeId,
    ) -> Option<Value> {
        let args = params.operands();
        self.call_like(Opcode::Image { sampler, op, params }, args, ty)
    }

    pub fn texture_query(
        &mut self,
        sampler: SamplerType,
        op: QueryOp,
        args: Vec<Value>,
        ty: TypeId,
    ) -> Value {
        self.value_inst(Opcode::TextureQuery { sampler, op }, args, ty)
    }

    // Control flow

    pub fn jump(&mut self, dest: Block) -> Inst {
        self.effect_inst(Opcode::Jump { dest }, Vec::new())
    }

    pub fn br(&mut self, cond: Value, then_dest: Block, else_dest: Block) -> Inst {
        self.effect_inst(
            Opcode::Br {
                then_dest,
                else_dest,
            },
            vec![cond],
        )
    }

    pub fn switch(&mut self, selector: Value, cases: Vec<(i32, Block)>, default: Block) -> Inst {
        self.effect_inst(Opcode::Switch { cases, default }, vec![selector])
    }

    pub fn return_(&mut self, value: Option<Value>) -> Inst {
        self.effect_inst(Opcode::Return, value.into_iter().collect())
    }

    pub fn discard(&mut self) -> Inst {
        self.effect_inst(Opcode::Discard, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{function::Signature, module::StorageClass};

    fn setup() -> (Module, Cursor) {
        let mut module = Module::new();
        let void = module.types.void();
        let func = module.declare_function("main", Signature::new(vec![], void));
        let block = module.function_mut(func).create_block("entry");
        (module, Cursor { func, block })
    }

    #[test]
    fn test_gep_result_type() {
        let (mut module, mut cursor) = setup();
        let f32 = module.types.f32();
        let v3 = module.types.vector(f32, 3);
        let s = module.types.declare_struct("S");
        module.types.set_struct_body(s, vec![f32, v3]).unwrap();
        let g = module.add_global("s", s, StorageClass::Global, None);

        let mut b = FunctionBuilder::new(&mut module, &mut cursor);
        let base = b.global_addr(g);
        let field = b.gep(base, &[GepStep::Const(1)]).unwrap();
        let loaded = b.load(field).unwrap();
        assert_eq!(b.value_type(loaded), v3);
    }

    #[test]
    fn test_emit_after_terminator_opens_block() {
        let (mut module, mut cursor) = setup();
        let mut b = FunctionBuilder::new(&mut module, &mut cursor);
        let entry = b.current_block();
        b.return_(None);
        b.iconst(1);
        assert_ne!(b.current_block(), entry);
        assert_eq!(b.func().block_name(b.current_block()), "unreachable");
    }

    #[test]
    fn test_allocas_hoisted() {
        let (mut module, mut cursor) = setup();
        let i32 = module.types.i32();
        let mut b = FunctionBuilder::new(&mut module, &mut cursor);
        b.iconst(3);
        let slot = b.alloca("x", i32);
        let entry = b.func().entry_block().unwrap();
        let first = b.func().block_insts(entry)[0];
        assert_eq!(b.func().dfg.insts[first].result, Some(slot));
    }

    #[test]
    fn test_vector_compare_is_bool_vector() {
        let (mut module, mut cursor) = setup();
        let f32 = module.types.f32();
        let v2 = module.types.vector(f32, 2);
        let mut b = FunctionBuilder::new(&mut module, &mut cursor);
        let z = b.zero(v2);
        let cmp = b.fcmp(FloatCC::Equal, z, z);
        let ty = b.value_type(cmp);
        assert_eq!(b.module().types.component_count(ty), 2);
        assert!(b.module().types.is_bool(ty));
    }
}
