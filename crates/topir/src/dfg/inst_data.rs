//! Instruction data structure.

use alloc::{vec, vec::Vec};

use crate::{
    dfg::opcode::Opcode,
    entity::{MdNode, Value},
    metadata::Precision,
};

/// Instruction data (opcode + operands)
///
/// This structure stores what an instruction does, separate from
/// where it appears in the block order.
#[derive(Debug, Clone, PartialEq)]
pub struct InstData {
    /// The operation this instruction performs
    pub opcode: Opcode,
    /// Input values (arguments)
    pub args: Vec<Value>,
    /// Output value, if the instruction produces one
    pub result: Option<Value>,
    /// Precision tag attached after emission
    pub precision: Precision,
    /// Metadata attachment (e.g. the uniform a load reads)
    pub md: Option<MdNode>,
}

impl InstData {
    /// Create instruction data with the given opcode and operands
    pub fn new(opcode: Opcode, args: Vec<Value>) -> Self {
        Self {
            opcode,
            args,
            result: None,
            precision: Precision::None,
            md: None,
        }
    }

    /// Create a two-operand instruction
    pub fn binary(opcode: Opcode, lhs: Value, rhs: Value) -> Self {
        Self::new(opcode, vec![lhs, rhs])
    }

    /// Create an operand-less instruction
    pub fn nullary(opcode: Opcode) -> Self {
        Self::new(opcode, Vec::new())
    }

    pub fn is_terminator(&self) -> bool {
        self.opcode.is_terminator()
    }
}
