//! Constant materialization from flattened constant unions.

use alloc::{format, vec::Vec};

use topir::Constant;

use crate::{
    ast::{AstType, BasicType, ConstValue},
    context::LowerContext,
    types::convert_type,
};

/// Build a constant of type `ty` from `values`, starting at `*next`.
///
/// Scalars are consumed in declaration order; a short list is padded with
/// zeros.
pub fn build_constant(
    ctx: &mut LowerContext<'_>,
    ty: &AstType,
    values: &[ConstValue],
    next: &mut usize,
) -> Constant {
    let ir_ty = convert_type(ctx, ty);

    let members: Vec<Constant> = if ty.is_array() {
        let element = ty.element_type();
        let count = ctx.top.module.types.member_count(ir_ty);
        (0..count)
            .map(|_| build_constant(ctx, &element, values, next))
            .collect()
    } else if ty.is_matrix() {
        let column = ty.column_type();
        (0..ty.matrix_cols)
            .map(|_| build_constant(ctx, &column, values, next))
            .collect()
    } else if ty.is_struct() {
        ty.members()
            .iter()
            .filter(|member| !member.hidden)
            .map(|member| build_constant(ctx, member, values, next))
            .collect()
    } else {
        let scalars: Vec<Constant> = (0..ty.vector_size)
            .map(|_| {
                let value = values.get(*next).copied();
                *next += 1;
                scalar_constant(ctx, ty.basic, value)
            })
            .collect();
        if let [scalar] = scalars[..] {
            return scalar;
        }
        scalars
    };
    ctx.top.module.const_aggregate(ir_ty, members)
}

fn scalar_constant(ctx: &mut LowerContext<'_>, basic: BasicType, value: Option<ConstValue>) -> Constant {
    let module = &mut ctx.top.module;
    match basic {
        BasicType::Int => module.const_i32(value.map_or(0, ConstValue::as_i32)),
        BasicType::Uint => module.const_u32(value.map_or(0, ConstValue::as_u32)),
        BasicType::Float | BasicType::Double => {
            module.const_f32(value.map_or(0.0, |v| v.as_f64() as f32))
        }
        BasicType::Bool => module.const_bool(value.is_some_and(ConstValue::as_bool)),
        other => {
            ctx.unsupported(format!("constant of basic type {:?}", other));
            ctx.top.module.const_i32(0)
        }
    }
}
