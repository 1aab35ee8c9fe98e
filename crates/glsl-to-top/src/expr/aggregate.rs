//! Built-in operators carried by aggregate nodes: constructors,
//! component-wise compares, the multi-result built-ins and every other
//! built-in function.

use alloc::{format, string::ToString, vec, vec::Vec};

use topir::{BinaryOp, GepStep, Intrinsic, StorageClass, TypeId, Value};

use crate::{
    ast::{BasicType, Node, Operator},
    context::LowerContext,
    error::{LowerError, LowerResult},
    lower::lower_node,
    metadata::precision_of,
    texture::lower_texture_call,
    types::convert_type,
};

use super::{
    intrinsics::{call_intrinsic, nary_intrinsic, nullary_intrinsic, takes_lvalue_first, unary_intrinsic},
    operators::create_binary_operation,
};

/// Lower a built-in aggregate operator `op` applied to `sequence`.
pub fn lower_builtin<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    op: Operator,
    sequence: &'a [Node],
) -> LowerResult<()> {
    use Operator::*;

    if op.is_texture() || op.is_image() {
        let result = lower_texture_call(ctx, node)?;
        ctx.top.clear_chain();
        if let Some(value) = result {
            ctx.set_rvalue(value);
        }
        return Ok(());
    }

    match op {
        Construct => return lower_construct(ctx, node, sequence),
        Modf | Frexp => return lower_with_out_params(ctx, node, op, sequence, 1, &[(1, 1)]),
        AddCarry | SubBorrow => return lower_with_out_params(ctx, node, op, sequence, 2, &[(1, 2)]),
        IMulExtended | UMulExtended => {
            return lower_with_out_params(ctx, node, op, sequence, 2, &[(0, 2), (1, 3)])
        }
        ArrayLength => {
            let length = sequence.first().map_or(0, |n| n.ty.outer_array_size());
            let value = ctx.top.builder().iconst(length as i32);
            ctx.set_rvalue(value);
            return Ok(());
        }
        Ftransform => return lower_ftransform(ctx, node),
        _ => {}
    }

    // Operators that are plain binary arithmetic in aggregate form.
    let binary = match op {
        LessThan | GreaterThan | LessThanEqual | GreaterThanEqual => Some((op, false)),
        VectorEqual => Some((Equal, false)),
        VectorNotEqual => Some((NotEqual, false)),
        Mul | OuterProduct | Mod => Some((op, true)),
        Dot if sequence.first().is_some_and(|n| !n.ty.is_vector()) => Some((Mul, true)),
        _ => None,
    };
    if let Some((bin_op, reduce)) = binary {
        return lower_binary_builtin(ctx, node, bin_op, sequence, reduce);
    }

    lower_intrinsic_call(ctx, node, op, sequence)
}

fn operand<'a>(sequence: &'a [Node], index: usize) -> LowerResult<&'a Node> {
    sequence
        .get(index)
        .ok_or_else(|| LowerError::invariant(format!("missing operand {}", index)))
}

fn lower_binary_builtin<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    op: Operator,
    sequence: &'a [Node],
    reduce_comparison: bool,
) -> LowerResult<()> {
    let left_node = operand(sequence, 0)?;
    let left = ctx.rvalue(left_node)?;
    let right = ctx.rvalue(operand(sequence, 1)?)?;
    let precision = precision_of(&node.ty);

    let result = if op == Operator::OuterProduct {
        let ty = convert_type(ctx, &node.ty);
        ctx.top.create_matrix_multiply(precision, left, right, ty)?
    } else if op == Operator::Mul && ctx.top.is_aggregate_value(left) {
        ctx.top.create_matrix_op(precision, BinaryOp::FMul, left, right)?
    } else {
        let is_unsigned = left_node.ty.basic == BasicType::Uint;
        create_binary_operation(ctx, op, precision, left, right, is_unsigned, reduce_comparison)?
            .ok_or_else(|| LowerError::invariant(format!("{:?} has no arithmetic form", op)))?
    };
    ctx.set_rvalue(result);
    Ok(())
}

fn lower_construct<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    sequence: &'a [Node],
) -> LowerResult<()> {
    let mut args = Vec::with_capacity(sequence.len());
    for arg in sequence {
        args.push(ctx.rvalue(arg)?);
    }
    let ty = convert_type(ctx, &node.ty);
    let precision = precision_of(&node.ty);

    if node.ty.is_struct() || node.ty.is_array() {
        let name = ctx.left_name.clone().unwrap_or_else(|| "constructed".to_string());
        let mut b = ctx.top.builder();
        let constructed = b.alloca(&name, ty);
        for (field, arg) in args.into_iter().enumerate() {
            let dest = b.gep(constructed, &[GepStep::Const(field as u32)])?;
            b.store(arg, dest);
        }
        ctx.top.clear_chain();
        ctx.top.chain.set_l(constructed);
        return Ok(());
    }

    let value = if node.ty.is_matrix() {
        ctx.top.create_matrix_construct(precision, args, ty)?
    } else {
        call_intrinsic(ctx, Intrinsic::Construct, precision, args, ty)?
            .ok_or_else(|| LowerError::invariant("constructor of void"))?
    };
    ctx.set_rvalue(value);
    Ok(())
}

/// Struct type holding the results of a multi-result built-in.
fn result_struct(ctx: &mut LowerContext<'_>, members: Vec<TypeId>) -> LowerResult<TypeId> {
    if let Some(ty) = ctx.result_types.get(&members) {
        return Ok(*ty);
    }
    let types = &mut ctx.top.module.types;
    let ty = types.declare_struct("resultStruct");
    types.set_struct_body(ty, members.clone())?;
    ctx.result_types.insert(members, ty);
    Ok(ty)
}

/// Built-ins returning extra results through `out` operands.
///
/// The first `inputs` operands are loaded and passed to the intrinsic,
/// which returns a struct. Each `(member, operand)` pair stores a member
/// into an operand. When member 0 is not stored, it becomes the value of
/// the call.
fn lower_with_out_params<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    op: Operator,
    sequence: &'a [Node],
    inputs: usize,
    outs: &[(u32, usize)],
) -> LowerResult<()> {
    let mut args = Vec::with_capacity(inputs);
    for index in 0..inputs {
        args.push(ctx.rvalue(operand(sequence, index)?)?);
    }

    let returns_first = outs.iter().all(|(member, _)| *member != 0);
    let mut members = Vec::with_capacity(2);
    if returns_first {
        members.push(convert_type(ctx, &node.ty));
    }
    for (_, index) in outs {
        let ty = &operand(sequence, *index)?.ty;
        members.push(convert_type(ctx, ty));
    }
    let ret = result_struct(ctx, members)?;

    let first_basic = operand(sequence, 0)?.ty.basic;
    let intrinsic = if inputs == 1 {
        let is_float = ctx.top.is_float_value(args[0]);
        unary_intrinsic(op, is_float)
    } else {
        nary_intrinsic(ctx, op, &args, first_basic == BasicType::Uint)?
    }
    .ok_or_else(|| LowerError::invariant(format!("{:?} has no intrinsic", op)))?;

    let precision = precision_of(&node.ty);
    let structure = call_intrinsic(ctx, intrinsic, precision, args, ret)?
        .ok_or_else(|| LowerError::invariant(format!("{:?} returned nothing", op)))?;

    for (member, index) in outs {
        let part = ctx.top.builder().extract_value(structure, *member)?;
        ctx.top.clear_chain();
        lower_node(ctx, operand(sequence, *index)?)?;
        ctx.top.chain_store(part)?;
    }

    ctx.top.clear_chain();
    if returns_first {
        let value = ctx.top.builder().extract_value(structure, 0)?;
        ctx.set_rvalue(value);
    }
    Ok(())
}

/// `ftransform()` reads simulated fixed-function globals; back ends
/// consuming the intrinsic whole never look at them.
fn lower_ftransform(ctx: &mut LowerContext<'_>, node: &Node) -> LowerResult<()> {
    let vertex = simulated_global(ctx, "gl_Vertex_sim", false)?;
    let matrix = simulated_global(ctx, "gl_ModelViewProjectionMatrix_sim", true)?;
    let ret = convert_type(ctx, &node.ty);
    let value = call_intrinsic(
        ctx,
        Intrinsic::FFixedTransform,
        precision_of(&node.ty),
        vec![vertex, matrix],
        ret,
    )?
    .ok_or_else(|| LowerError::invariant("ftransform returned nothing"))?;
    ctx.set_rvalue(value);
    Ok(())
}

fn simulated_global(ctx: &mut LowerContext<'_>, name: &str, matrix: bool) -> LowerResult<Value> {
    let module = &mut ctx.top.module;
    let global = match module.find_global(name) {
        Some(global) => global,
        None => {
            let ty = if matrix {
                module.types.matrix(4, 4)
            } else {
                let f32_ty = module.types.f32();
                module.types.vector(f32_ty, 4)
            };
            module.add_global(name, ty, StorageClass::Global, None)
        }
    };
    let mut b = ctx.top.builder();
    let ptr = b.global_addr(global);
    Ok(b.load(ptr)?)
}

fn lower_intrinsic_call<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    op: Operator,
    sequence: &'a [Node],
) -> LowerResult<()> {
    let mut operands = Vec::with_capacity(sequence.len());
    for (index, arg) in sequence.iter().enumerate() {
        ctx.top.clear_chain();
        lower_node(ctx, arg)?;
        let value = if index == 0 && takes_lvalue_first(op) {
            ctx.top.chain_get_l()?
        } else {
            ctx.top.chain_load(precision_of(&arg.ty))?
        };
        operands.push(value);
    }

    // mix() with a boolean selector over non-float values is a select.
    if op == Operator::Mix && operands.len() == 3 && !ctx.top.is_float_value(operands[0]) {
        let value = ctx
            .top
            .builder()
            .select(operands[2], operands[1], operands[0]);
        ctx.set_rvalue(value);
        return Ok(());
    }

    let intrinsic = match operands.as_slice() {
        [] => nullary_intrinsic(op),
        [single] => {
            let is_float = ctx.top.is_float_value(*single);
            unary_intrinsic(op, is_float)
        }
        _ => {
            let is_unsigned = sequence[0].ty.basic == BasicType::Uint;
            nary_intrinsic(ctx, op, &operands, is_unsigned)?
        }
    };

    let precision = precision_of(&node.ty);
    let ret = convert_type(ctx, &node.ty);
    ctx.top.clear_chain();
    match intrinsic {
        Some(intrinsic) => {
            if let Some(value) = call_intrinsic(ctx, intrinsic, precision, operands, ret)? {
                ctx.set_rvalue(value);
            }
        }
        None => {
            ctx.unsupported(format!("built-in {:?}", op));
            if node.ty.basic != BasicType::Void {
                let value = ctx.placeholder(ret);
                ctx.set_rvalue(value);
            }
        }
    }
    Ok(())
}
