//! Instruction opcodes.

use alloc::{format, string::{String, ToString}, vec, vec::Vec};
use core::fmt;

use crate::{
    condcodes::{FloatCC, IntCC},
    entity::{Block, Constant, FuncRef, GlobalVar, MdNode, TypeId},
    intrinsic::Intrinsic,
    metadata::InterpolationMode,
    texture::{ImageOp, QueryOp, SamplerType, TextureFlags, TextureParams},
};

/// Two-operand arithmetic and bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SRem => "srem",
            BinaryOp::URem => "urem",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::FRem => "frem",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        };
        f.write_str(s)
    }
}

/// One-operand arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    FNeg,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Neg => "neg",
            UnaryOp::FNeg => "fneg",
            UnaryOp::Not => "not",
        };
        f.write_str(s)
    }
}

/// Numeric conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    SIToFP,
    UIToFP,
    FPToSI,
    FPToUI,
    ZExt,
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CastOp::SIToFP => "sitofp",
            CastOp::UIToFP => "uitofp",
            CastOp::FPToSI => "fptosi",
            CastOp::FPToUI => "fptoui",
            CastOp::ZExt => "zext",
        };
        f.write_str(s)
    }
}

/// One step of a `gep` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GepIndex {
    /// Compile-time member or element index
    Const(u32),
    /// Index taken from the next dynamic operand
    Dynamic,
}

/// A pipeline read's fixed attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineRead {
    pub name: String,
    pub slot: i32,
    pub md: Option<MdNode>,
    /// Component mask, `-1` for all components
    pub mask: i32,
    pub interpolation: InterpolationMode,
}

/// Instruction opcode
///
/// This enum represents the operation that an instruction performs.
/// Operands are stored in `InstData::args`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Values
    /// Constant from the module pool: result = constant
    Const { constant: Constant },
    /// Address of a module global: result = &global
    GlobalAddr { global: GlobalVar },
    /// Function-local variable: result = &local (always in the entry block)
    Alloca { name: String, ty: TypeId },

    // Memory
    /// Load from memory: result = *arg0
    Load,
    /// Store to memory: *arg1 = arg0
    Store,
    /// Address arithmetic: result = &arg0[path...]
    Gep { path: Vec<GepIndex> },
    /// Pointer offset into a runtime-sized array: result = &arg0[arg1],
    /// where arg0 points at element zero
    ElementAddr,

    // Arithmetic
    /// result = arg0 op arg1
    Binary(BinaryOp),
    /// result = op arg0
    Unary(UnaryOp),
    /// result = cast arg0
    Cast(CastOp),
    /// Integer comparison: result = (arg0 cond arg1)
    Icmp(IntCC),
    /// Ordered float comparison: result = (arg0 cond arg1)
    Fcmp(FloatCC),
    /// result = arg0 ? arg1 : arg2
    Select,

    // Aggregates and vectors
    /// result = arg0.index
    ExtractValue { index: u32 },
    /// result = arg0 with member index replaced by arg1
    InsertValue { index: u32 },
    /// result = arg0[arg1]
    ExtractElement,
    /// result = arg0 with lane arg2 replaced by arg1
    InsertElement,
    /// result = vector of arg0's components in the given order
    Swizzle { components: Vec<u32> },
    /// result = arg0 with lanes[i] replaced by arg1[i]
    InsertLanes { lanes: Vec<u32> },
    /// result = vector with every lane set to arg0
    Splat,

    // Calls
    /// User function call: result = callee(args...)
    Call { callee: FuncRef },
    /// Named intrinsic: result = intrinsic(args...)
    Intrinsic(Intrinsic),

    // Pipeline
    /// Read one slot of a pipeline input
    ReadPipeline(PipelineRead),
    /// Write arg0 to one slot of a pipeline output
    WritePipeline {
        slot: i32,
        md: Option<MdNode>,
        mask: i32,
    },

    // Textures and images
    /// Texture sample or fetch; identity given by the flag set
    Texture {
        sampler: SamplerType,
        flags: TextureFlags,
        params: TextureParams,
    },
    /// Image load, store, or atomic
    Image {
        sampler: SamplerType,
        op: ImageOp,
        params: TextureParams,
    },
    /// Size or level-of-detail query: args are sampler and optional lod/coords
    TextureQuery { sampler: SamplerType, op: QueryOp },

    // Control flow
    /// Jump to block
    Jump { dest: Block },
    /// Conditional branch: if arg0, jump to then_dest, else else_dest
    Br { then_dest: Block, else_dest: Block },
    /// Multi-way branch on arg0
    Switch {
        cases: Vec<(i32, Block)>,
        default: Block,
    },
    /// Return, with the value in arg0 if any
    Return,
    /// Terminate the invocation (fragment discard)
    Discard,
}

impl Opcode {
    /// True if this opcode ends a block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Opcode::Jump { .. }
                | Opcode::Br { .. }
                | Opcode::Switch { .. }
                | Opcode::Return
                | Opcode::Discard
        )
    }

    /// Blocks this terminator may transfer control to.
    pub fn successors(&self) -> Vec<Block> {
        match self {
            Opcode::Jump { dest } => vec![*dest],
            Opcode::Br {
                then_dest,
                else_dest,
            } => vec![*then_dest, *else_dest],
            Opcode::Switch { cases, default } => {
                let mut targets: Vec<Block> = cases.iter().map(|(_, b)| *b).collect();
                targets.push(*default);
                targets
            }
            _ => Vec::new(),
        }
    }

    /// Mnemonic used by the textual writer.
    pub fn mnemonic(&self) -> String {
        match self {
            Opcode::Const { .. } => "const".into(),
            Opcode::GlobalAddr { .. } => "global_addr".into(),
            Opcode::Alloca { .. } => "alloca".into(),
            Opcode::Load => "load".into(),
            Opcode::Store => "store".into(),
            Opcode::Gep { .. } => "gep".into(),
            Opcode::ElementAddr => "element_addr".into(),
            Opcode::Binary(op) => op.to_string(),
            Opcode::Unary(op) => op.to_string(),
            Opcode::Cast(op) => op.to_string(),
            Opcode::Icmp(cc) => format!("icmp {}", cc),
            Opcode::Fcmp(cc) => format!("fcmp {}", cc),
            Opcode::Select => "select".into(),
            Opcode::ExtractValue { .. } => "extract_value".into(),
            Opcode::InsertValue { .. } => "insert_value".into(),
            Opcode::ExtractElement => "extract_element".into(),
            Opcode::InsertElement => "insert_element".into(),
            Opcode::Swizzle { .. } => "swizzle".into(),
            Opcode::InsertLanes { .. } => "insert_lanes".into(),
            Opcode::Splat => "splat".into(),
            Opcode::Call { .. } => "call".into(),
            Opcode::Intrinsic(i) => format!("intrinsic {}", i),
            Opcode::ReadPipeline(_) => "read_pipeline".into(),
            Opcode::WritePipeline { .. } => "write_pipeline".into(),
            Opcode::Texture { .. } => "texture".into(),
            Opcode::Image { op, .. } => format!("image {}", op),
            Opcode::TextureQuery { op, .. } => format!("texture_query {}", op),
            Opcode::Jump { .. } => "jump".into(),
            Opcode::Br { .. } => "br".into(),
            Opcode::Switch { .. } => "switch".into(),
            Opcode::Return => "return".into(),
            Opcode::Discard => "discard".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminators() {
        assert!(Opcode::Return.is_terminator());
        assert!(Opcode::Discard.is_terminator());
        assert!(!Opcode::Load.is_terminator());
    }

    #[test]
    fn test_switch_successors() {
        let op = Opcode::Switch {
            cases: vec![(0, Block::new(1)), (1, Block::new(2))],
            default: Block::new(3),
        };
        assert_eq!(
            op.successors(),
            vec![Block::new(1), Block::new(2), Block::new(3)]
        );
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Opcode::Fcmp(FloatCC::LessThan).mnemonic(), "fcmp olt");
        assert_eq!(
            Opcode::Intrinsic(Intrinsic::FDot3).mnemonic(),
            "intrinsic fDot3"
        );
    }
}
