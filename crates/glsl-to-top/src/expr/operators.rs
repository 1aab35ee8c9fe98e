//! Arithmetic, comparison, unary and conversion operators.
//!
//! Each helper returns `Ok(None)` when the operator is not one it handles,
//! so callers can fall through to the next table.

use alloc::vec;

use topir::{BinaryOp, CastOp, FloatCC, IntCC, Intrinsic, Precision, TypeId, UnaryOp, Value};

use crate::{ast::Operator, context::LowerContext, error::LowerResult};

/// Lower a binary arithmetic, bitwise, logical or comparison operator.
///
/// `is_unsigned` selects the unsigned forms of division, remainder, right
/// shift and ordered compares. With `reduce_comparison`, `==` and `!=` on
/// vectors and aggregates produce a single bool.
pub fn create_binary_operation(
    ctx: &mut LowerContext<'_>,
    op: Operator,
    precision: Precision,
    left: Value,
    right: Value,
    is_unsigned: bool,
    reduce_comparison: bool,
) -> LowerResult<Option<Value>> {
    use Operator::*;

    let left_is_float = ctx.top.is_float_value(left);
    let pick = |float: BinaryOp, unsigned: BinaryOp, signed: BinaryOp| {
        if left_is_float {
            float
        } else if is_unsigned {
            unsigned
        } else {
            signed
        }
    };

    let mut needs_promotion = true;
    let bin_op = match op {
        Add | AddAssign => Some(pick(BinaryOp::FAdd, BinaryOp::Add, BinaryOp::Add)),
        Sub | SubAssign => Some(pick(BinaryOp::FSub, BinaryOp::Sub, BinaryOp::Sub)),
        Mul
        | MulAssign
        | VectorTimesScalar
        | VectorTimesScalarAssign
        | VectorTimesMatrixAssign
        | MatrixTimesScalarAssign
        | MatrixTimesMatrixAssign => Some(pick(BinaryOp::FMul, BinaryOp::Mul, BinaryOp::Mul)),
        Div | DivAssign => Some(pick(BinaryOp::FDiv, BinaryOp::UDiv, BinaryOp::SDiv)),
        Mod | ModAssign => Some(pick(BinaryOp::FRem, BinaryOp::URem, BinaryOp::SRem)),
        RightShift | RightShiftAssign => Some(if is_unsigned {
            BinaryOp::LShr
        } else {
            BinaryOp::AShr
        }),
        LeftShift | LeftShiftAssign => Some(BinaryOp::Shl),
        And | AndAssign => Some(BinaryOp::And),
        InclusiveOr | InclusiveOrAssign | LogicalOr => Some(BinaryOp::Or),
        ExclusiveOr | ExclusiveOrAssign | LogicalXor => Some(BinaryOp::Xor),
        LogicalAnd => {
            // Scalar bools only.
            needs_promotion = false;
            Some(BinaryOp::And)
        }
        _ => None,
    };

    if let Some(bin_op) = bin_op {
        if ctx.top.is_aggregate_value(left) || ctx.top.is_aggregate_value(right) {
            let value = match op {
                VectorTimesMatrixAssign | MatrixTimesScalarAssign | MatrixTimesMatrixAssign => {
                    let result_ty = ctx.top.value_type(left);
                    ctx.top.create_matrix_multiply(precision, left, right, result_ty)?
                }
                _ => ctx.top.create_matrix_op(precision, bin_op, left, right)?,
            };
            return Ok(Some(value));
        }

        let (left, right) = if needs_promotion {
            ctx.top.promote_scalar(left, right)
        } else {
            (left, right)
        };
        let mut b = ctx.top.builder();
        let value = b.binary(bin_op, left, right);
        b.set_precision(value, precision);
        return Ok(Some(value));
    }

    if !matches!(
        op,
        LessThan | GreaterThan | LessThanEqual | GreaterThanEqual | Equal | NotEqual
    ) {
        return Ok(None);
    }

    let left_ty = ctx.top.value_type(left);
    let types = &ctx.top.module.types;
    if reduce_comparison && (types.is_vector(left_ty) || types.is_aggregate(left_ty)) {
        return ctx
            .top
            .create_compare(precision, left, right, op == Equal)
            .map(Some);
    }

    let mut b = ctx.top.builder();
    let value = if left_is_float {
        let cc = match op {
            LessThan => FloatCC::LessThan,
            GreaterThan => FloatCC::GreaterThan,
            LessThanEqual => FloatCC::LessThanOrEqual,
            GreaterThanEqual => FloatCC::GreaterThanOrEqual,
            Equal => FloatCC::Equal,
            _ => FloatCC::NotEqual,
        };
        b.fcmp(cc, left, right)
    } else {
        let cc = match (op, is_unsigned) {
            (LessThan, true) => IntCC::UnsignedLessThan,
            (GreaterThan, true) => IntCC::UnsignedGreaterThan,
            (LessThanEqual, true) => IntCC::UnsignedLessThanOrEqual,
            (GreaterThanEqual, true) => IntCC::UnsignedGreaterThanOrEqual,
            (LessThan, false) => IntCC::SignedLessThan,
            (GreaterThan, false) => IntCC::SignedGreaterThan,
            (LessThanEqual, false) => IntCC::SignedLessThanOrEqual,
            (GreaterThanEqual, false) => IntCC::SignedGreaterThanOrEqual,
            (Equal, _) => IntCC::Equal,
            _ => IntCC::NotEqual,
        };
        b.icmp(cc, left, right)
    };
    b.set_precision(value, precision);
    Ok(Some(value))
}

/// Negation, logical and bitwise not, and the unary matrix operations.
pub fn create_unary_operation(
    ctx: &mut LowerContext<'_>,
    op: Operator,
    precision: Precision,
    operand: Value,
) -> LowerResult<Option<Value>> {
    match op {
        Operator::Negative => {
            if ctx.top.is_aggregate_value(operand) {
                // 0.0 - m, column by column
                let zero = ctx.top.builder().fconst(0.0);
                let value = ctx
                    .top
                    .create_matrix_op(precision, BinaryOp::FSub, zero, operand)?;
                return Ok(Some(value));
            }
            let neg = if ctx.top.is_float_value(operand) {
                UnaryOp::FNeg
            } else {
                UnaryOp::Neg
            };
            let mut b = ctx.top.builder();
            let value = b.unary(neg, operand);
            b.set_precision(value, precision);
            Ok(Some(value))
        }
        Operator::LogicalNot | Operator::VectorLogicalNot | Operator::BitwiseNot => {
            Ok(Some(ctx.top.builder().unary(UnaryOp::Not, operand)))
        }
        Operator::Determinant => {
            let f32 = ctx.top.module.types.f32();
            Ok(matrix_intrinsic(ctx, Intrinsic::FDeterminant, precision, operand, f32))
        }
        Operator::MatrixInverse => {
            let ty = ctx.top.value_type(operand);
            Ok(matrix_intrinsic(ctx, Intrinsic::FMatrixInverse, precision, operand, ty))
        }
        Operator::Transpose => {
            let ty = ctx.top.value_type(operand);
            let types = &mut ctx.top.module.types;
            let cols = types.member_count(ty);
            let rows = types
                .member_type(ty, Some(0))
                .map_or(cols, |column| types.component_count(column));
            let transposed = types.matrix(rows, cols);
            Ok(matrix_intrinsic(ctx, Intrinsic::FTranspose, precision, operand, transposed))
        }
        _ => Ok(None),
    }
}

fn matrix_intrinsic(
    ctx: &mut LowerContext<'_>,
    intrinsic: Intrinsic,
    precision: Precision,
    operand: Value,
    ret: TypeId,
) -> Option<Value> {
    let mut b = ctx.top.builder();
    let value = b.intrinsic(intrinsic, vec![operand], ret)?;
    b.set_precision(value, precision);
    Some(value)
}

/// Type conversions. `dest` is the converted type.
pub fn create_conversion(
    ctx: &mut LowerContext<'_>,
    op: Operator,
    precision: Precision,
    dest: TypeId,
    operand: Value,
) -> LowerResult<Option<Value>> {
    use Operator::*;

    let cast = match op {
        ConvIntToBool | ConvUintToBool | ConvFloatToBool => {
            // Anything non-zero is true.
            let mut zero = {
                let mut b = ctx.top.builder();
                match op {
                    ConvFloatToBool => b.fconst(0.0),
                    ConvUintToBool => b.uconst(0),
                    _ => b.iconst(0),
                }
            };
            if ctx.top.component_count(operand) > 1 {
                let ty = ctx.top.value_type(operand);
                zero = ctx.top.smear_scalar(zero, ty);
            }
            return create_binary_operation(ctx, NotEqual, precision, operand, zero, false, false);
        }
        ConvIntToFloat => CastOp::SIToFP,
        ConvBoolToFloat | ConvUintToFloat => CastOp::UIToFP,
        ConvFloatToInt => CastOp::FPToSI,
        // true converts to 1
        ConvBoolToInt | ConvBoolToUint => CastOp::ZExt,
        ConvFloatToUint => CastOp::FPToUI,
        // Same width, same bits.
        ConvUintToInt | ConvIntToUint => return Ok(Some(operand)),
        ConvDoubleToInt | ConvDoubleToBool | ConvDoubleToFloat | ConvDoubleToUint
        | ConvIntToDouble | ConvUintToDouble | ConvFloatToDouble | ConvBoolToDouble => {
            ctx.unsupported("double conversion");
            return Ok(Some(ctx.placeholder(dest)));
        }
        _ => return Ok(None),
    };

    let mut b = ctx.top.builder();
    let value = b.cast(cast, operand, dest);
    b.set_precision(value, precision);
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use topir::Opcode;

    use super::*;
    use crate::{
        ast::{Node, TranslationUnit},
        config::LowerOptions,
        stage::ShaderStage,
    };

    fn context() -> LowerContext<'static> {
        let unit = TranslationUnit::new(ShaderStage::Fragment, Node::sequence(Vec::new()));
        LowerContext::new(&unit, LowerOptions::default())
    }

    fn opcode(ctx: &LowerContext<'_>, value: Value) -> Opcode {
        let func = ctx.top.module.function(ctx.top.current_function());
        let inst = func.dfg.defining_inst(value).expect("instruction result");
        func.dfg.insts[inst].opcode.clone()
    }

    #[test]
    fn test_division_by_signedness() {
        let mut ctx = context();
        let (a, b) = {
            let mut fb = ctx.top.builder();
            (fb.uconst(7), fb.uconst(2))
        };
        let p = Precision::None;
        let udiv = create_binary_operation(&mut ctx, Operator::Div, p, a, b, true, true)
            .unwrap()
            .unwrap();
        let sdiv = create_binary_operation(&mut ctx, Operator::Div, p, a, b, false, true)
            .unwrap()
            .unwrap();
        assert_eq!(opcode(&ctx, udiv), Opcode::Binary(BinaryOp::UDiv));
        assert_eq!(opcode(&ctx, sdiv), Opcode::Binary(BinaryOp::SDiv));
    }

    #[test]
    fn test_scalar_is_promoted() {
        let mut ctx = context();
        let vec3 = {
            let types = &mut ctx.top.module.types;
            let f32 = types.f32();
            types.vector(f32, 3)
        };
        let (v, s) = {
            let mut b = ctx.top.builder();
            (b.zero(vec3), b.fconst(2.0))
        };
        let r = create_binary_operation(&mut ctx, Operator::Mul, Precision::High, v, s, false, true)
            .unwrap()
            .unwrap();
        assert_eq!(ctx.top.value_type(r), vec3);
        assert_eq!(opcode(&ctx, r), Opcode::Binary(BinaryOp::FMul));
    }

    #[test]
    fn test_vector_equality_reduces_unless_asked_not_to() {
        let mut ctx = context();
        let ivec2 = {
            let types = &mut ctx.top.module.types;
            let i32 = types.i32();
            types.vector(i32, 2)
        };
        let (l, r) = {
            let mut b = ctx.top.builder();
            (b.zero(ivec2), b.zero(ivec2))
        };
        let p = Precision::None;
        let reduced = create_binary_operation(&mut ctx, Operator::Equal, p, l, r, false, true)
            .unwrap()
            .unwrap();
        let bool_ty = ctx.top.module.types.bool();
        assert_eq!(ctx.top.value_type(reduced), bool_ty);

        let lanes = create_binary_operation(&mut ctx, Operator::Equal, p, l, r, false, false)
            .unwrap()
            .unwrap();
        assert_eq!(opcode(&ctx, lanes), Opcode::Icmp(IntCC::Equal));
        assert_eq!(ctx.top.component_count(lanes), 2);
    }

    #[test]
    fn test_unknown_operator_falls_through() {
        let mut ctx = context();
        let v = ctx.top.builder().iconst(1);
        let none = create_binary_operation(&mut ctx, Operator::Sin, Precision::None, v, v, false, true)
            .unwrap();
        assert!(none.is_none());
        assert!(create_unary_operation(&mut ctx, Operator::Sin, Precision::None, v)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_conversions() {
        let mut ctx = context();
        let f32 = ctx.top.module.types.f32();
        let bool_ty = ctx.top.module.types.bool();
        let i = ctx.top.builder().iconst(3);
        let p = Precision::None;

        let f = create_conversion(&mut ctx, Operator::ConvIntToFloat, p, f32, i)
            .unwrap()
            .unwrap();
        assert_eq!(opcode(&ctx, f), Opcode::Cast(CastOp::SIToFP));

        let b = create_conversion(&mut ctx, Operator::ConvIntToBool, p, bool_ty, i)
            .unwrap()
            .unwrap();
        assert_eq!(opcode(&ctx, b), Opcode::Icmp(IntCC::NotEqual));

        let u32_ty = ctx.top.module.types.u32();
        let same = create_conversion(&mut ctx, Operator::ConvIntToUint, p, u32_ty, i)
            .unwrap()
            .unwrap();
        assert_eq!(same, i);
    }

    #[test]
    fn test_double_conversion_is_unsupported() {
        let mut ctx = context();
        let f32 = ctx.top.module.types.f32();
        let x = ctx.top.builder().fconst(1.0);
        let v = create_conversion(&mut ctx, Operator::ConvFloatToDouble, Precision::None, f32, x)
            .unwrap();
        assert!(v.is_some());
        assert_eq!(ctx.diags.entries().len(), 1);
    }
}
