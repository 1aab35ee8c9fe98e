//! Named intrinsic operations.
//!
//! Every GLSL built-in that does not map onto a plain arithmetic or
//! memory instruction becomes an `intrinsic` instruction carrying one of
//! these identifiers. The prefix encodes the operand class: `f` for float,
//! `s`/`u` for signed/unsigned integer, `fb` for float with bool selector.

use core::fmt;

macro_rules! intrinsics {
    ($($(#[$attr:meta])* $variant:ident => $name:literal,)*) => {
        /// Intrinsic identifier.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Intrinsic {
            $($(#[$attr])* $variant,)*
        }

        impl Intrinsic {
            /// Textual name of the intrinsic.
            pub fn name(self) -> &'static str {
                match self {
                    $(Intrinsic::$variant => $name,)*
                }
            }

            /// Look an intrinsic up by its textual name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Intrinsic::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

intrinsics! {
    // Angle and trigonometry
    FRadians => "fRadians",
    FDegrees => "fDegrees",
    FSin => "fSin",
    FCos => "fCos",
    FTan => "fTan",
    FAsin => "fAsin",
    FAcos => "fAcos",
    FAtan => "fAtan",
    FAtan2 => "fAtan2",
    FSinh => "fSinh",
    FCosh => "fCosh",
    FTanh => "fTanh",
    FAsinh => "fAsinh",
    FAcosh => "fAcosh",
    FAtanh => "fAtanh",

    // Exponential
    FPow => "fPow",
    /// Power with an integer exponent
    FPowi => "fPowi",
    FExp => "fExp",
    FLog => "fLog",
    FExp2 => "fExp2",
    FLog2 => "fLog2",
    FSqrt => "fSqrt",
    FInverseSqrt => "fInverseSqrt",

    // Common
    FAbs => "fAbs",
    Abs => "abs",
    FSign => "fSign",
    Sign => "sign",
    FFloor => "fFloor",
    FRoundZero => "fRoundZero",
    FRoundFast => "fRoundFast",
    FRoundEven => "fRoundEven",
    FCeiling => "fCeiling",
    FFraction => "fFraction",
    /// Returns `{fraction, whole}`
    FModF => "fModF",
    /// Returns `{significand, exponent}`
    FFrexp => "fFrexp",
    FLdexp => "fLdexp",
    FMin => "fMin",
    SMin => "sMin",
    UMin => "uMin",
    FMax => "fMax",
    SMax => "sMax",
    UMax => "uMax",
    FClamp => "fClamp",
    SClamp => "sClamp",
    UClamp => "uClamp",
    FMix => "fMix",
    /// Mix selected per component by a boolean vector
    FbMix => "fbMix",
    FStep => "fStep",
    FSmoothStep => "fSmoothStep",
    FIsNan => "fIsNan",
    FIsInf => "fIsInf",
    FFma => "fFma",
    SFma => "sFma",
    UFma => "uFma",
    FFloatBitsToInt => "fFloatBitsToInt",
    FIntBitsToFloat => "fIntBitsTofloat",

    // Packing
    FPackSnorm2x16 => "fPackSnorm2x16",
    FUnpackSnorm2x16 => "fUnpackSnorm2x16",
    FPackUnorm2x16 => "fPackUnorm2x16",
    FUnpackUnorm2x16 => "fUnpackUnorm2x16",
    FPackHalf2x16 => "fPackHalf2x16",
    FUnpackHalf2x16 => "fUnpackHalf2x16",
    FPackUnorm4x8 => "fPackUnorm4x8",
    FUnpackUnorm4x8 => "fUnpackUnorm4x8",
    FPackSnorm4x8 => "fPackSnorm4x8",
    FUnpackSnorm4x8 => "fUnpackSnorm4x8",

    // Geometric
    FLength => "fLength",
    FDistance => "fDistance",
    FDot2 => "fDot2",
    FDot3 => "fDot3",
    FDot4 => "fDot4",
    FCross => "fCross",
    FNormalize => "fNormalize",
    FFaceForward => "fFaceForward",
    FReflect => "fReflect",
    FRefract => "fRefract",
    /// Fixed-function vertex transform (`ftransform`)
    FFixedTransform => "fFixedTransform",

    // Matrix
    FMatrixMultiply => "fMatrixMultiply",
    FDeterminant => "fDeterminant",
    FMatrixInverse => "fMatrixInverse",
    FTranspose => "fTranspose",
    FMatrixConstruct => "fMatrixConstruct",
    /// Scalar and vector constructor over a flat argument list
    Construct => "construct",

    // Vector relational
    Any => "any",
    All => "all",

    // Integer
    AddCarry => "addCarry",
    SubBorrow => "subBorrow",
    UMulExtended => "umulExtended",
    SMulExtended => "smulExtended",
    SBitFieldExtract => "sBitFieldExtract",
    UBitFieldExtract => "uBitFieldExtract",
    BitFieldInsert => "bitFieldInsert",
    BitReverse => "bitReverse",
    BitCount => "bitCount",
    FindLSB => "findLSB",
    SFindMSB => "sFindMSB",

    // Derivatives and interpolation
    FDFdx => "fDFdx",
    FDFdy => "fDFdy",
    FFilterWidth => "fFilterWidth",
    InterpolateAtCentroid => "interpolateAtCentroid",
    InterpolateAtSample => "interpolateAtSample",
    InterpolateAtOffset => "interpolateAtOffset",

    // Atomic counters
    AtomicCounterIncrement => "atomicCounterIncrement",
    AtomicCounterDecrement => "atomicCounterDecrement",
    AtomicCounterLoad => "atomicCounterLoad",

    // Atomic memory
    AtomicAdd => "atomicAdd",
    SAtomicMin => "sAtomicMin",
    UAtomicMin => "uAtomicMin",
    SAtomicMax => "sAtomicMax",
    UAtomicMax => "uAtomicMax",
    AtomicAnd => "atomicAnd",
    AtomicOr => "atomicOr",
    AtomicXor => "atomicXor",
    AtomicExchange => "atomicExchange",
    AtomicCompExchange => "atomicCompExchange",

    // Geometry stage
    EmitVertex => "emitVertex",
    EndPrimitive => "endPrimitive",
    EmitStreamVertex => "emitStreamVertex",
    EndStreamPrimitive => "endStreamPrimitive",

    // Barriers
    Barrier => "barrier",
    MemoryBarrier => "memoryBarrier",
    MemoryBarrierAtomicCounter => "memoryBarrierAtomicCounter",
    MemoryBarrierBuffer => "memoryBarrierBuffer",
    MemoryBarrierImage => "memoryBarrierImage",
    MemoryBarrierShared => "memoryBarrierShared",
    GroupMemoryBarrier => "groupMemoryBarrier",

    /// Element count of a runtime-sized array
    ArrayLength => "arraylength",
}

impl Intrinsic {
    /// Intrinsics with side effects that must not be removed when unused.
    pub fn has_side_effects(self) -> bool {
        matches!(
            self,
            Intrinsic::EmitVertex
                | Intrinsic::EndPrimitive
                | Intrinsic::EmitStreamVertex
                | Intrinsic::EndStreamPrimitive
                | Intrinsic::Barrier
                | Intrinsic::MemoryBarrier
                | Intrinsic::MemoryBarrierAtomicCounter
                | Intrinsic::MemoryBarrierBuffer
                | Intrinsic::MemoryBarrierImage
                | Intrinsic::MemoryBarrierShared
                | Intrinsic::GroupMemoryBarrier
                | Intrinsic::AtomicCounterIncrement
                | Intrinsic::AtomicCounterDecrement
                | Intrinsic::AtomicAdd
                | Intrinsic::SAtomicMin
                | Intrinsic::UAtomicMin
                | Intrinsic::SAtomicMax
                | Intrinsic::UAtomicMax
                | Intrinsic::AtomicAnd
                | Intrinsic::AtomicOr
                | Intrinsic::AtomicXor
                | Intrinsic::AtomicExchange
                | Intrinsic::AtomicCompExchange
        )
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
