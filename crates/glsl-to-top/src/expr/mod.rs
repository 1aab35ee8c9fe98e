//! Expression lowering: binary and unary nodes, and the built-in
//! aggregate operators.
//!
//! Every routine leaves its result in the access chain, either as an
//! r-value or as an l-value still to be loaded or stored by the caller.

pub mod aggregate;
pub mod intrinsics;
pub mod operators;

use alloc::{format, string::ToString, vec, vec::Vec};

use topir::Intrinsic;

use crate::{
    ast::{BasicType, Node, NodeKind, Operator},
    codegen::ChainIndex,
    context::LowerContext,
    error::{LowerError, LowerResult},
    lower::lower_node,
    metadata::precision_of,
    texture::lower_texture_call,
    types::{convert_type, is_runtime_array, remap_member},
};

use self::{
    intrinsics::{call_intrinsic, unary_intrinsic},
    operators::{create_binary_operation, create_conversion, create_unary_operation},
};

/// Lower a binary node: assignment, indexing, swizzle or arithmetic.
pub fn lower_binary<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    op: Operator,
    left: &'a Node,
    right: &'a Node,
) -> LowerResult<()> {
    if op.is_assignment() {
        return lower_assignment(ctx, node, op, left, right);
    }
    match op {
        Operator::IndexDirect | Operator::IndexDirectStruct => {
            lower_direct_index(ctx, node, op, left, right)
        }
        Operator::IndexIndirect => {
            ctx.top.clear_chain();
            lower_node(ctx, left)?;
            let partial = ctx.top.chain.clone();
            let index = ctx.rvalue(right)?;
            ctx.top.chain = partial;
            if !left.ty.is_array() && left.ty.is_vector() {
                ctx.top.chain.push_component(index)
            } else {
                ctx.top.chain.push_index(ChainIndex::Value(index))
            }
        }
        Operator::VectorSwizzle => {
            ctx.top.clear_chain();
            lower_node(ctx, left)?;
            let NodeKind::Aggregate { sequence, .. } = &right.kind else {
                return Err(LowerError::invariant("swizzle without a selector list"));
            };
            let components = sequence
                .iter()
                .map(|n| n.as_constant().and_then(|c| c.first()).map(|c| c.as_u32()))
                .collect::<Option<Vec<u32>>>()
                .ok_or_else(|| LowerError::invariant("swizzle selector is not constant"))?;
            let result_ty = convert_type(ctx, &node.ty);
            ctx.top
                .chain
                .push_swizzle(&components, result_ty, left.ty.vector_size)
        }
        _ => lower_arithmetic(ctx, node, op, left, right),
    }
}

fn lower_assignment<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    op: Operator,
    left: &'a Node,
    right: &'a Node,
) -> LowerResult<()> {
    ctx.top.clear_chain();
    lower_node(ctx, left)?;
    let lvalue = ctx.top.chain.clone();
    ctx.left_name = left.base_symbol_name().map(str::to_string);

    let mut value = ctx.rvalue(right)?;
    if op != Operator::Assign {
        ctx.top.chain = lvalue.clone();
        let current = ctx.top.chain_load(precision_of(&left.ty))?;
        let is_unsigned = node.ty.basic == BasicType::Uint;
        value = create_binary_operation(
            ctx,
            op,
            precision_of(&node.ty),
            current,
            value,
            is_unsigned,
            true,
        )?
        .ok_or_else(|| LowerError::invariant(format!("{:?} has no arithmetic form", op)))?;
    }

    ctx.top.chain = lvalue;
    ctx.top.chain_store(value)?;
    ctx.set_rvalue(value);
    ctx.left_name = None;
    Ok(())
}

fn lower_direct_index<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    op: Operator,
    left: &'a Node,
    right: &'a Node,
) -> LowerResult<()> {
    ctx.top.clear_chain();
    lower_node(ctx, left)?;

    let mut index = match right.as_constant().and_then(|c| c.first()) {
        Some(c) => c.as_u32(),
        None => {
            ctx.unsupported("direct index without a constant");
            0
        }
    };

    if left.ty.basic == BasicType::Block && op == Operator::IndexDirectStruct {
        match remap_member(ctx, &left.ty, index) {
            Some(remapped) => index = remapped,
            None => ctx
                .diags
                .invariant(format!("block {} without member remapping", left.ty.type_name)),
        }
    }

    if !left.ty.is_array() && left.ty.is_vector() && op == Operator::IndexDirect {
        let result_ty = convert_type(ctx, &node.ty);
        ctx.top
            .chain
            .push_swizzle(&[index], result_ty, left.ty.vector_size)?;
    } else {
        ctx.top.chain.push_field(index)?;
    }

    // The open tail of a buffer block is addressed element by element.
    if is_runtime_array(&node.ty) {
        ctx.top.chain_evolve_to_runtime_array_base()?;
    }
    Ok(())
}

fn lower_arithmetic<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    op: Operator,
    left: &'a Node,
    right: &'a Node,
) -> LowerResult<()> {
    let l = ctx.rvalue(left)?;
    let r = ctx.rvalue(right)?;
    let precision = precision_of(&node.ty);

    let result = match op {
        Operator::VectorTimesMatrix
        | Operator::MatrixTimesVector
        | Operator::MatrixTimesScalar
        | Operator::MatrixTimesMatrix => {
            let ty = convert_type(ctx, &node.ty);
            Some(ctx.top.create_matrix_multiply(precision, l, r, ty)?)
        }
        Operator::VectorEqual | Operator::VectorNotEqual => {
            let op = if op == Operator::VectorEqual {
                Operator::Equal
            } else {
                Operator::NotEqual
            };
            create_binary_operation(ctx, op, precision, l, r, false, false)?
        }
        _ => {
            let is_unsigned = left.ty.basic == BasicType::Uint;
            create_binary_operation(ctx, op, precision, l, r, is_unsigned, true)?
        }
    };

    let value = match result {
        Some(value) => value,
        None => {
            ctx.unsupported(format!("binary operator {:?}", op));
            let ty = convert_type(ctx, &node.ty);
            ctx.placeholder(ty)
        }
    };
    ctx.set_rvalue(value);
    Ok(())
}

/// Lower a unary node: texture queries, conversions, operators,
/// single-operand built-ins and the increments.
pub fn lower_unary<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    op: Operator,
    operand: &'a Node,
) -> LowerResult<()> {
    if op.is_texture() || op.is_image() {
        let result = lower_texture_call(ctx, node)?;
        ctx.top.clear_chain();
        if let Some(value) = result {
            ctx.set_rvalue(value);
        }
        return Ok(());
    }

    ctx.top.clear_chain();
    lower_node(ctx, operand)?;

    if op == Operator::ArrayLength {
        let ptr = ctx.top.chain_get_l()?;
        let i32_ty = ctx.top.module.types.i32();
        let length = call_intrinsic(ctx, Intrinsic::ArrayLength, precision_of(&node.ty), vec![ptr], i32_ty)?
            .ok_or_else(|| LowerError::invariant("array length without a value"))?;
        ctx.set_rvalue(length);
        return Ok(());
    }

    let value = ctx.top.chain_load(precision_of(&operand.ty))?;
    let precision = precision_of(&node.ty);
    let dest = convert_type(ctx, &node.ty);

    let mut result = create_conversion(ctx, op, precision, dest, value)?;
    if result.is_none() {
        result = create_unary_operation(ctx, op, precision, value)?;
    }
    if result.is_none() {
        let is_float = ctx.top.is_float_value(value);
        if let Some(intrinsic) = unary_intrinsic(op, is_float) {
            let called = call_intrinsic(ctx, intrinsic, precision, vec![value], dest)?;
            ctx.top.clear_chain();
            if let Some(called) = called {
                ctx.set_rvalue(called);
            }
            return Ok(());
        }
    }
    if let Some(result) = result {
        ctx.set_rvalue(result);
        return Ok(());
    }

    match op {
        Operator::PostIncrement
        | Operator::PostDecrement
        | Operator::PreIncrement
        | Operator::PreDecrement => {
            // The chain still addresses the operand.
            let basic = ctx.top.basic_type(ctx.top.value_type(value));
            let is_float = ctx.top.module.types.is_float(basic);
            let is_unsigned = ctx.top.module.types.is_unsigned(basic);
            let one = if is_float {
                ctx.top.builder().fconst(1.0)
            } else if is_unsigned {
                ctx.top.builder().uconst(1)
            } else {
                ctx.top.builder().iconst(1)
            };
            let arith = if matches!(op, Operator::PostIncrement | Operator::PreIncrement) {
                Operator::Add
            } else {
                Operator::Sub
            };
            let updated = create_binary_operation(ctx, arith, precision, value, one, false, true)?
                .ok_or_else(|| LowerError::invariant("increment without an add"))?;
            ctx.top.chain_store(updated)?;
            let result = if matches!(op, Operator::PreIncrement | Operator::PreDecrement) {
                updated
            } else {
                value
            };
            ctx.set_rvalue(result);
        }
        _ => {
            ctx.unsupported(format!("unary operator {:?}", op));
            let placeholder = ctx.placeholder(dest);
            ctx.set_rvalue(placeholder);
        }
    }
    Ok(())
}
