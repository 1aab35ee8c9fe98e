//! Built-in functions that map onto a single named intrinsic.

use alloc::{format, vec::Vec};

use topir::{Intrinsic, Precision, TypeId, Value};

use crate::{
    ast::Operator,
    context::LowerContext,
    error::{LowerError, LowerResult},
};

/// Intrinsic of a one-operand built-in. Abs and sign pick their float or
/// integer form from the operand.
pub fn unary_intrinsic(op: Operator, operand_is_float: bool) -> Option<Intrinsic> {
    use Operator::*;

    let intrinsic = match op {
        Radians => Intrinsic::FRadians,
        Degrees => Intrinsic::FDegrees,
        Sin => Intrinsic::FSin,
        Cos => Intrinsic::FCos,
        Tan => Intrinsic::FTan,
        Acos => Intrinsic::FAcos,
        Asin => Intrinsic::FAsin,
        Atan => Intrinsic::FAtan,
        Acosh => Intrinsic::FAcosh,
        Asinh => Intrinsic::FAsinh,
        Atanh => Intrinsic::FAtanh,
        Tanh => Intrinsic::FTanh,
        Cosh => Intrinsic::FCosh,
        Sinh => Intrinsic::FSinh,

        Length => Intrinsic::FLength,
        Normalize => Intrinsic::FNormalize,

        Exp => Intrinsic::FExp,
        Log => Intrinsic::FLog,
        Exp2 => Intrinsic::FExp2,
        Log2 => Intrinsic::FLog2,
        Sqrt => Intrinsic::FSqrt,
        InverseSqrt => Intrinsic::FInverseSqrt,

        Floor => Intrinsic::FFloor,
        Trunc => Intrinsic::FRoundZero,
        Round => Intrinsic::FRoundFast,
        RoundEven => Intrinsic::FRoundEven,
        Ceil => Intrinsic::FCeiling,
        Fract => Intrinsic::FFraction,
        IsNan => Intrinsic::FIsNan,
        IsInf => Intrinsic::FIsInf,

        FloatBitsToInt | FloatBitsToUint => Intrinsic::FFloatBitsToInt,
        IntBitsToFloat | UintBitsToFloat => Intrinsic::FIntBitsToFloat,
        PackSnorm2x16 => Intrinsic::FPackSnorm2x16,
        UnpackSnorm2x16 => Intrinsic::FUnpackSnorm2x16,
        PackUnorm2x16 => Intrinsic::FPackUnorm2x16,
        UnpackUnorm2x16 => Intrinsic::FUnpackUnorm2x16,
        PackHalf2x16 => Intrinsic::FPackHalf2x16,
        UnpackHalf2x16 => Intrinsic::FUnpackHalf2x16,
        PackUnorm4x8 => Intrinsic::FPackUnorm4x8,
        UnpackUnorm4x8 => Intrinsic::FUnpackUnorm4x8,
        PackSnorm4x8 => Intrinsic::FPackSnorm4x8,
        UnpackSnorm4x8 => Intrinsic::FUnpackSnorm4x8,

        DPdx => Intrinsic::FDFdx,
        DPdy => Intrinsic::FDFdy,
        Fwidth => Intrinsic::FFilterWidth,
        InterpolateAtCentroid => Intrinsic::InterpolateAtCentroid,

        Any => Intrinsic::Any,
        All => Intrinsic::All,

        Abs if operand_is_float => Intrinsic::FAbs,
        Abs => Intrinsic::Abs,
        Sign if operand_is_float => Intrinsic::FSign,
        Sign => Intrinsic::Sign,
        Modf => Intrinsic::FModF,
        Frexp => Intrinsic::FFrexp,

        EmitStreamVertex => Intrinsic::EmitStreamVertex,
        EndStreamPrimitive => Intrinsic::EndStreamPrimitive,

        AtomicCounterIncrement => Intrinsic::AtomicCounterIncrement,
        AtomicCounterDecrement => Intrinsic::AtomicCounterDecrement,
        AtomicCounter => Intrinsic::AtomicCounterLoad,
        BitFieldReverse => Intrinsic::BitReverse,
        BitCount => Intrinsic::BitCount,
        FindLSB => Intrinsic::FindLSB,
        FindMSB => Intrinsic::SFindMSB,

        _ => return None,
    };
    Some(intrinsic)
}

/// Intrinsic of a built-in taking two or more operands.
///
/// The first operand's basic type and `is_unsigned` pick between float,
/// signed and unsigned forms.
pub fn nary_intrinsic(
    ctx: &LowerContext<'_>,
    op: Operator,
    operands: &[Value],
    is_unsigned: bool,
) -> LowerResult<Option<Intrinsic>> {
    use Operator::*;

    let Some(first) = operands.first().copied() else {
        return Ok(None);
    };
    let float = ctx.top.is_float_value(first);
    let by_kind = |f: Intrinsic, u: Intrinsic, s: Intrinsic| {
        if float {
            f
        } else if is_unsigned {
            u
        } else {
            s
        }
    };

    let intrinsic = match op {
        Min => by_kind(Intrinsic::FMin, Intrinsic::UMin, Intrinsic::SMin),
        Max => by_kind(Intrinsic::FMax, Intrinsic::UMax, Intrinsic::SMax),
        Clamp => by_kind(Intrinsic::FClamp, Intrinsic::UClamp, Intrinsic::SClamp),
        Fma => by_kind(Intrinsic::FFma, Intrinsic::UFma, Intrinsic::SFma),
        Pow if float => Intrinsic::FPow,
        Pow => Intrinsic::FPowi,
        Dot => match ctx.top.component_count(first) {
            2 => Intrinsic::FDot2,
            3 => Intrinsic::FDot3,
            4 => Intrinsic::FDot4,
            n => {
                return Err(LowerError::invariant(format!(
                    "dot product of {} components",
                    n
                )))
            }
        },
        Ldexp => Intrinsic::FLdexp,
        AddCarry => Intrinsic::AddCarry,
        SubBorrow => Intrinsic::SubBorrow,
        UMulExtended => Intrinsic::UMulExtended,
        IMulExtended => Intrinsic::SMulExtended,
        BitfieldExtract if is_unsigned => Intrinsic::UBitFieldExtract,
        BitfieldExtract => Intrinsic::SBitFieldExtract,
        BitfieldInsert => Intrinsic::BitFieldInsert,

        Atan => Intrinsic::FAtan2,

        Mix => {
            if !float {
                return Err(LowerError::invariant("integer mix reached the intrinsic table"));
            }
            let last_is_bool = operands.last().is_some_and(|last| {
                let ty = ctx.top.value_type(*last);
                let basic = ctx.top.basic_type(ty);
                ctx.top.module.types.is_bool(basic)
            });
            if last_is_bool {
                Intrinsic::FbMix
            } else {
                Intrinsic::FMix
            }
        }
        Step => Intrinsic::FStep,
        SmoothStep => Intrinsic::FSmoothStep,

        Distance => Intrinsic::FDistance,
        Cross => Intrinsic::FCross,
        FaceForward => Intrinsic::FFaceForward,
        Reflect => Intrinsic::FReflect,
        Refract => Intrinsic::FRefract,
        InterpolateAtOffset => Intrinsic::InterpolateAtOffset,
        InterpolateAtSample => Intrinsic::InterpolateAtSample,

        AtomicAdd => Intrinsic::AtomicAdd,
        AtomicMin if is_unsigned => Intrinsic::UAtomicMin,
        AtomicMin => Intrinsic::SAtomicMin,
        AtomicMax if is_unsigned => Intrinsic::UAtomicMax,
        AtomicMax => Intrinsic::SAtomicMax,
        AtomicAnd => Intrinsic::AtomicAnd,
        AtomicOr => Intrinsic::AtomicOr,
        AtomicXor => Intrinsic::AtomicXor,
        AtomicExchange => Intrinsic::AtomicExchange,
        AtomicCompSwap => Intrinsic::AtomicCompExchange,

        _ => return Ok(None),
    };
    Ok(Some(intrinsic))
}

/// Intrinsic of a built-in taking no operands.
pub fn nullary_intrinsic(op: Operator) -> Option<Intrinsic> {
    use Operator::*;

    let intrinsic = match op {
        EmitVertex => Intrinsic::EmitVertex,
        EndPrimitive => Intrinsic::EndPrimitive,
        Barrier => Intrinsic::Barrier,
        MemoryBarrier => Intrinsic::MemoryBarrier,
        MemoryBarrierAtomicCounter => Intrinsic::MemoryBarrierAtomicCounter,
        MemoryBarrierBuffer => Intrinsic::MemoryBarrierBuffer,
        MemoryBarrierImage => Intrinsic::MemoryBarrierImage,
        MemoryBarrierShared => Intrinsic::MemoryBarrierShared,
        GroupMemoryBarrier => Intrinsic::GroupMemoryBarrier,
        _ => return None,
    };
    Some(intrinsic)
}

/// Operators with the atomic read-modify-write shape: the first argument
/// is the memory operated on, so it is passed by address.
pub fn takes_lvalue_first(op: Operator) -> bool {
    matches!(
        op,
        Operator::AtomicAdd
            | Operator::AtomicMin
            | Operator::AtomicMax
            | Operator::AtomicAnd
            | Operator::AtomicOr
            | Operator::AtomicXor
            | Operator::AtomicExchange
            | Operator::AtomicCompSwap
    )
}

/// Emit `intrinsic`. Before an emit, every active output shadow is written
/// to the pipeline and the implicit copy-out at exit is turned off.
pub fn call_intrinsic(
    ctx: &mut LowerContext<'_>,
    intrinsic: Intrinsic,
    precision: Precision,
    args: Vec<Value>,
    ret: TypeId,
) -> LowerResult<Option<Value>> {
    if matches!(intrinsic, Intrinsic::EmitVertex | Intrinsic::EmitStreamVertex) {
        ctx.top.set_explicit_copy_out();
        ctx.top.copy_out_pipeline()?;
    }
    let mut b = ctx.top.builder();
    let value = b.intrinsic(intrinsic, args, ret);
    if let Some(value) = value {
        b.set_precision(value, precision);
    }
    Ok(value)
}
