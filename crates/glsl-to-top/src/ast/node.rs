//! Typed tree nodes and operators.

use alloc::{boxed::Box, string::{String, ToString}, vec, vec::Vec};

use crate::ast::{
    qualifier::StorageQualifier,
    types::{AstType, BasicType},
};

/// Front-end symbol identity. Distinct declarations have distinct ids even
/// when their names collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// One scalar of a flattened constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i32),
    Uint(u32),
    Float(f64),
    Double(f64),
    Bool(bool),
}

impl ConstValue {
    pub fn as_i32(self) -> i32 {
        match self {
            ConstValue::Int(v) => v,
            ConstValue::Uint(v) => v as i32,
            ConstValue::Float(v) | ConstValue::Double(v) => v as i32,
            ConstValue::Bool(v) => v as i32,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            ConstValue::Int(v) => v as u32,
            ConstValue::Uint(v) => v,
            ConstValue::Float(v) | ConstValue::Double(v) => v as u32,
            ConstValue::Bool(v) => v as u32,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            ConstValue::Int(v) => v as f64,
            ConstValue::Uint(v) => v as f64,
            ConstValue::Float(v) | ConstValue::Double(v) => v,
            ConstValue::Bool(v) => v as u8 as f64,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            ConstValue::Bool(v) => v,
            other => other.as_f64() != 0.0,
        }
    }
}

/// Branch and case-label kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowOp {
    /// `discard`
    Kill,
    Break,
    Continue,
    Return,
    /// `case` label; the expression carries the value
    Case,
    Default,
}

/// Front-end operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Null,
    Sequence,
    LinkerObjects,
    FunctionCall,
    Function,
    Parameters,
    Comma,

    // Unary
    Negative,
    LogicalNot,
    VectorLogicalNot,
    BitwiseNot,
    PostIncrement,
    PostDecrement,
    PreIncrement,
    PreDecrement,

    // Conversions
    ConvIntToBool,
    ConvUintToBool,
    ConvFloatToBool,
    ConvDoubleToBool,
    ConvBoolToFloat,
    ConvIntToFloat,
    ConvUintToFloat,
    ConvDoubleToFloat,
    ConvBoolToInt,
    ConvFloatToInt,
    ConvUintToInt,
    ConvDoubleToInt,
    ConvBoolToUint,
    ConvFloatToUint,
    ConvIntToUint,
    ConvDoubleToUint,
    ConvBoolToDouble,
    ConvIntToDouble,
    ConvUintToDouble,
    ConvFloatToDouble,

    // Binary
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    RightShift,
    LeftShift,
    And,
    InclusiveOr,
    ExclusiveOr,
    Equal,
    NotEqual,
    VectorEqual,
    VectorNotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    VectorTimesScalar,
    VectorTimesMatrix,
    MatrixTimesVector,
    MatrixTimesScalar,
    MatrixTimesMatrix,
    LogicalOr,
    LogicalXor,
    LogicalAnd,
    IndexDirect,
    IndexIndirect,
    IndexDirectStruct,
    VectorSwizzle,

    // Assignments
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    VectorTimesMatrixAssign,
    VectorTimesScalarAssign,
    MatrixTimesScalarAssign,
    MatrixTimesMatrixAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    InclusiveOrAssign,
    ExclusiveOrAssign,
    LeftShiftAssign,
    RightShiftAssign,

    /// Constructor of the node's type from the operand list
    Construct,

    // Angle and trigonometry
    Radians,
    Degrees,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,

    // Exponential
    Pow,
    Exp,
    Log,
    Exp2,
    Log2,
    Sqrt,
    InverseSqrt,

    // Common
    Abs,
    Sign,
    Floor,
    Trunc,
    Round,
    RoundEven,
    Ceil,
    Fract,
    Modf,
    Min,
    Max,
    Clamp,
    Mix,
    Step,
    SmoothStep,
    IsNan,
    IsInf,
    Fma,
    Frexp,
    Ldexp,
    FloatBitsToInt,
    FloatBitsToUint,
    IntBitsToFloat,
    UintBitsToFloat,
    PackSnorm2x16,
    UnpackSnorm2x16,
    PackUnorm2x16,
    UnpackUnorm2x16,
    PackSnorm4x8,
    UnpackSnorm4x8,
    PackUnorm4x8,
    UnpackUnorm4x8,
    PackHalf2x16,
    UnpackHalf2x16,

    // Geometric
    Length,
    Distance,
    Dot,
    Cross,
    Normalize,
    FaceForward,
    Reflect,
    Refract,
    Ftransform,

    // Matrix
    Determinant,
    MatrixInverse,
    Transpose,
    OuterProduct,

    // Vector relational
    Any,
    All,

    // Integer
    AddCarry,
    SubBorrow,
    UMulExtended,
    IMulExtended,
    BitfieldExtract,
    BitfieldInsert,
    BitFieldReverse,
    BitCount,
    FindLSB,
    FindMSB,

    // Fragment
    DPdx,
    DPdy,
    Fwidth,
    InterpolateAtCentroid,
    InterpolateAtSample,
    InterpolateAtOffset,

    // Geometry
    EmitVertex,
    EndPrimitive,
    EmitStreamVertex,
    EndStreamPrimitive,

    // Barriers
    Barrier,
    MemoryBarrier,
    MemoryBarrierAtomicCounter,
    MemoryBarrierBuffer,
    MemoryBarrierImage,
    MemoryBarrierShared,
    GroupMemoryBarrier,

    // Atomics
    AtomicAdd,
    AtomicMin,
    AtomicMax,
    AtomicAnd,
    AtomicOr,
    AtomicXor,
    AtomicExchange,
    AtomicCompSwap,
    AtomicCounterIncrement,
    AtomicCounterDecrement,
    AtomicCounter,

    /// `.length()`
    ArrayLength,

    // Texture queries
    TextureQuerySize,
    TextureQueryLod,
    TextureQueryLevels,
    TextureQuerySamples,

    // Texture access
    Texture,
    TextureProj,
    TextureLod,
    TextureOffset,
    TextureFetch,
    TextureFetchOffset,
    TextureProjOffset,
    TextureLodOffset,
    TextureProjLod,
    TextureProjLodOffset,
    TextureGrad,
    TextureGradOffset,
    TextureProjGrad,
    TextureProjGradOffset,
    TextureGather,
    TextureGatherOffset,
    TextureGatherOffsets,

    // Images
    ImageQuerySize,
    ImageQuerySamples,
    ImageLoad,
    ImageStore,
    ImageAtomicAdd,
    ImageAtomicMin,
    ImageAtomicMax,
    ImageAtomicAnd,
    ImageAtomicOr,
    ImageAtomicXor,
    ImageAtomicExchange,
    ImageAtomicCompSwap,
}

impl Operator {
    pub fn is_texture(self) -> bool {
        use Operator::*;
        matches!(
            self,
            TextureQuerySize
                | TextureQueryLod
                | TextureQueryLevels
                | TextureQuerySamples
                | Texture
                | TextureProj
                | TextureLod
                | TextureOffset
                | TextureFetch
                | TextureFetchOffset
                | TextureProjOffset
                | TextureLodOffset
                | TextureProjLod
                | TextureProjLodOffset
                | TextureGrad
                | TextureGradOffset
                | TextureProjGrad
                | TextureProjGradOffset
                | TextureGather
                | TextureGatherOffset
                | TextureGatherOffsets
        )
    }

    pub fn is_image(self) -> bool {
        use Operator::*;
        matches!(
            self,
            ImageQuerySize
                | ImageQuerySamples
                | ImageLoad
                | ImageStore
                | ImageAtomicAdd
                | ImageAtomicMin
                | ImageAtomicMax
                | ImageAtomicAnd
                | ImageAtomicOr
                | ImageAtomicXor
                | ImageAtomicExchange
                | ImageAtomicCompSwap
        )
    }

    /// Plain and compound assignments.
    pub fn is_assignment(self) -> bool {
        use Operator::*;
        matches!(
            self,
            Assign
                | AddAssign
                | SubAssign
                | MulAssign
                | VectorTimesMatrixAssign
                | VectorTimesScalarAssign
                | MatrixTimesScalarAssign
                | MatrixTimesMatrixAssign
                | DivAssign
                | ModAssign
                | AndAssign
                | InclusiveOrAssign
                | ExclusiveOrAssign
                | LeftShiftAssign
                | RightShiftAssign
        )
    }
}

/// A node of the typed tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub ty: AstType,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Symbol {
        id: SymbolId,
        name: String,
    },
    /// Flattened scalars in declaration order
    Constant(Vec<ConstValue>),
    Binary {
        op: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: Operator,
        operand: Box<Node>,
    },
    Aggregate {
        op: Operator,
        sequence: Vec<Node>,
        /// Function name for definitions and calls
        name: String,
        /// Parameter qualifiers of a user call
        qualifiers: Vec<StorageQualifier>,
    },
    /// `if` statement or `?:` (when the type is not void)
    Selection {
        cond: Box<Node>,
        true_block: Option<Box<Node>>,
        false_block: Option<Box<Node>>,
    },
    Switch {
        cond: Box<Node>,
        /// Statements interleaved with case and default labels
        body: Vec<Node>,
    },
    Loop {
        test: Option<Box<Node>>,
        body: Option<Box<Node>>,
        /// `for` post-step
        terminal: Option<Box<Node>>,
        test_first: bool,
    },
    Branch {
        op: FlowOp,
        expr: Option<Box<Node>>,
    },
}

impl Node {
    pub fn new(ty: AstType, kind: NodeKind) -> Self {
        Self { ty, kind }
    }

    pub fn symbol(id: u32, name: &str, ty: AstType) -> Self {
        Self::new(
            ty,
            NodeKind::Symbol {
                id: SymbolId(id),
                name: name.to_string(),
            },
        )
    }

    pub fn constant(ty: AstType, values: Vec<ConstValue>) -> Self {
        Self::new(ty.storage(StorageQualifier::Const), NodeKind::Constant(values))
    }

    pub fn float(value: f64) -> Self {
        Self::constant(AstType::float(), vec![ConstValue::Float(value)])
    }

    pub fn int(value: i32) -> Self {
        Self::constant(AstType::int(), vec![ConstValue::Int(value)])
    }

    pub fn uint(value: u32) -> Self {
        Self::constant(AstType::uint(), vec![ConstValue::Uint(value)])
    }

    pub fn bool(value: bool) -> Self {
        Self::constant(AstType::bool(), vec![ConstValue::Bool(value)])
    }

    pub fn binary(op: Operator, ty: AstType, left: Node, right: Node) -> Self {
        Self::new(
            ty,
            NodeKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    /// `left = right`, typed by the left side.
    pub fn assign(left: Node, right: Node) -> Self {
        let ty = left.ty.clone();
        Self::binary(Operator::Assign, ty, left, right)
    }

    /// Direct index with a constant selector.
    pub fn index(op: Operator, ty: AstType, base: Node, index: i32) -> Self {
        Self::binary(op, ty, base, Node::int(index))
    }

    /// Swizzle of `base` selecting `components`.
    pub fn swizzle(base: Node, components: &[u32]) -> Self {
        let ty = AstType::vector(base.ty.basic, components.len() as u32);
        let selectors = components.iter().map(|c| Node::int(*c as i32)).collect();
        let right = Node::aggregate(Operator::Sequence, AstType::void(), selectors);
        Self::binary(Operator::VectorSwizzle, ty, base, right)
    }

    pub fn unary(op: Operator, ty: AstType, operand: Node) -> Self {
        Self::new(
            ty,
            NodeKind::Unary {
                op,
                operand: Box::new(operand),
            },
        )
    }

    pub fn aggregate(op: Operator, ty: AstType, sequence: Vec<Node>) -> Self {
        Self::new(
            ty,
            NodeKind::Aggregate {
                op,
                sequence,
                name: String::new(),
                qualifiers: Vec::new(),
            },
        )
    }

    pub fn sequence(statements: Vec<Node>) -> Self {
        Self::aggregate(Operator::Sequence, AstType::void(), statements)
    }

    /// Function definition: `name` is the mangled name, e.g. `main(`.
    pub fn function(name: &str, ret: AstType, params: Vec<Node>, body: Vec<Node>) -> Self {
        let params = Node::aggregate(Operator::Parameters, AstType::void(), params);
        Self::new(
            ret,
            NodeKind::Aggregate {
                op: Operator::Function,
                sequence: vec![params, Node::sequence(body)],
                name: name.to_string(),
                qualifiers: Vec::new(),
            },
        )
    }

    /// Call of a user function.
    pub fn call(name: &str, ret: AstType, args: Vec<Node>, qualifiers: Vec<StorageQualifier>) -> Self {
        Self::new(
            ret,
            NodeKind::Aggregate {
                op: Operator::FunctionCall,
                sequence: args,
                name: name.to_string(),
                qualifiers,
            },
        )
    }

    pub fn selection(ty: AstType, cond: Node, true_block: Option<Node>, false_block: Option<Node>) -> Self {
        Self::new(
            ty,
            NodeKind::Selection {
                cond: Box::new(cond),
                true_block: true_block.map(Box::new),
                false_block: false_block.map(Box::new),
            },
        )
    }

    pub fn switch(cond: Node, body: Vec<Node>) -> Self {
        Self::new(
            AstType::void(),
            NodeKind::Switch {
                cond: Box::new(cond),
                body,
            },
        )
    }

    pub fn case(value: i32) -> Self {
        Self::branch(FlowOp::Case, Some(Node::int(value)))
    }

    pub fn default_label() -> Self {
        Self::branch(FlowOp::Default, None)
    }

    pub fn loop_(test: Option<Node>, body: Option<Node>, terminal: Option<Node>, test_first: bool) -> Self {
        Self::new(
            AstType::void(),
            NodeKind::Loop {
                test: test.map(Box::new),
                body: body.map(Box::new),
                terminal: terminal.map(Box::new),
                test_first,
            },
        )
    }

    pub fn branch(op: FlowOp, expr: Option<Node>) -> Self {
        Self::new(
            AstType::void(),
            NodeKind::Branch {
                op,
                expr: expr.map(Box::new),
            },
        )
    }

    /// Operator of a binary, unary or aggregate node.
    pub fn op(&self) -> Operator {
        match &self.kind {
            NodeKind::Binary { op, .. }
            | NodeKind::Unary { op, .. }
            | NodeKind::Aggregate { op, .. } => *op,
            _ => Operator::Null,
        }
    }

    pub fn as_constant(&self) -> Option<&[ConstValue]> {
        match &self.kind {
            NodeKind::Constant(values) => Some(values),
            _ => None,
        }
    }

    /// Name of the symbol at the root of an access path such as `a.b[i].x`.
    pub fn base_symbol_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Symbol { name, .. } => Some(name),
            NodeKind::Binary { op, left, .. }
                if matches!(
                    op,
                    Operator::IndexDirect
                        | Operator::IndexIndirect
                        | Operator::IndexDirectStruct
                        | Operator::VectorSwizzle
                ) =>
            {
                left.base_symbol_name()
            }
            _ => None,
        }
    }

    pub fn is_integer_typed(&self) -> bool {
        matches!(self.ty.basic, BasicType::Int | BasicType::Uint | BasicType::Bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_symbol_name() {
        let v = Node::symbol(1, "v", AstType::vec(4));
        let swz = Node::swizzle(v, &[0, 2]);
        assert_eq!(swz.base_symbol_name(), Some("v"));
        assert_eq!(swz.ty.vector_size, 2);
        assert_eq!(Node::float(1.0).base_symbol_name(), None);
    }

    #[test]
    fn test_const_coercions() {
        assert_eq!(ConstValue::Float(2.7).as_i32(), 2);
        assert!(ConstValue::Int(3).as_bool());
        assert_eq!(ConstValue::Bool(true).as_u32(), 1);
    }

    #[test]
    fn test_operator_classes() {
        assert!(Operator::TextureGradOffset.is_texture());
        assert!(Operator::ImageAtomicAdd.is_image());
        assert!(!Operator::ImageLoad.is_texture());
        assert!(Operator::MatrixTimesScalarAssign.is_assignment());
    }
}
