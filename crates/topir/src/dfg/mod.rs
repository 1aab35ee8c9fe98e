//! Data Flow Graph (instruction and value data).

use crate::{
    entity::{Inst, TypeId, Value},
    entity_map::PrimaryMap,
};

pub mod inst_data;
pub mod opcode;

pub use inst_data::InstData;
pub use opcode::{BinaryOp, CastOp, GepIndex, Opcode, PipelineRead, UnaryOp};

/// Where an SSA value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDef {
    /// The n-th function parameter
    Param(u32),
    /// The result of an instruction
    Result(Inst),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueData {
    pub ty: TypeId,
    pub def: ValueDef,
}

/// Data Flow Graph - stores instruction data and value types
///
/// The DFG stores what instructions do (opcode + operands), separate
/// from the block order they appear in.
#[derive(Debug, Clone, Default)]
pub struct DFG {
    /// Instruction data
    pub insts: PrimaryMap<Inst, InstData>,
    /// Value types and definitions
    pub values: PrimaryMap<Value, ValueData>,
}

impl DFG {
    /// Create a new empty DFG
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an instruction without a result and return its entity.
    pub fn create_inst(&mut self, data: InstData) -> Inst {
        self.insts.push(data)
    }

    /// Create an instruction with a fresh result value of type `ty`.
    pub fn create_value_inst(&mut self, mut data: InstData, ty: TypeId) -> (Inst, Value) {
        let inst = self.insts.next_key();
        let value = self.values.push(ValueData {
            ty,
            def: ValueDef::Result(inst),
        });
        data.result = Some(value);
        (self.insts.push(data), value)
    }

    /// Create a parameter value.
    pub fn make_param(&mut self, index: u32, ty: TypeId) -> Value {
        self.values.push(ValueData {
            ty,
            def: ValueDef::Param(index),
        })
    }

    /// Get instruction data
    pub fn inst_data(&self, inst: Inst) -> Option<&InstData> {
        self.insts.get(inst)
    }

    /// Get mutable instruction data
    pub fn inst_data_mut(&mut self, inst: Inst) -> Option<&mut InstData> {
        self.insts.get_mut(inst)
    }

    /// Type of a value
    pub fn value_type(&self, value: Value) -> Option<TypeId> {
        self.values.get(value).map(|v| v.ty)
    }

    /// Definition of a value
    pub fn value_def(&self, value: Value) -> Option<ValueDef> {
        self.values.get(value).map(|v| v.def)
    }

    /// The instruction producing a value, if it is an instruction result.
    pub fn defining_inst(&self, value: Value) -> Option<Inst> {
        match self.value_def(value)? {
            ValueDef::Result(inst) => Some(inst),
            ValueDef::Param(_) => None,
        }
    }

    pub fn num_insts(&self) -> usize {
        self.insts.len()
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeStore;

    #[test]
    fn test_create_inst_with_result() {
        let mut types = TypeStore::new();
        let i32 = types.i32();
        let mut dfg = DFG::new();
        let p = dfg.make_param(0, i32);
        let (inst, result) =
            dfg.create_value_inst(InstData::binary(Opcode::Binary(BinaryOp::Add), p, p), i32);
        assert_eq!(dfg.value_type(result), Some(i32));
        assert_eq!(dfg.defining_inst(result), Some(inst));
        assert_eq!(dfg.value_def(p), Some(ValueDef::Param(0)));
    }
}
