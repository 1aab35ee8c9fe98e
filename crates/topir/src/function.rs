//! Functions.

use alloc::{string::String, vec::Vec};

use crate::{
    dfg::DFG,
    entity::{Block, Inst, TypeId, Value},
    entity_map::PrimaryMap,
};

/// Function signature: parameter types and a return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

impl Signature {
    pub fn new(params: Vec<TypeId>, ret: TypeId) -> Self {
        Self { params, ret }
    }
}

/// Function attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionAttrs {
    /// Must be inlined into every caller
    pub always_inline: bool,
    /// The shader entry point
    pub entry_point: bool,
}

/// A basic block: a name and an ordered list of instructions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockData {
    pub name: String,
    pub insts: Vec<Inst>,
}

/// A function in the IR
///
/// A function consists of:
/// - A signature (parameters and return type)
/// - Parameter values
/// - Blocks, in layout order
/// - the DFG, holding instruction and value data
#[derive(Debug, Clone)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Function signature
    pub signature: Signature,
    pub attrs: FunctionAttrs,
    /// Formal parameter values, one per signature parameter
    pub params: Vec<Value>,
    /// Block data
    pub blocks: PrimaryMap<Block, BlockData>,
    /// Block order
    pub layout: Vec<Block>,
    /// Instruction and value storage
    pub dfg: DFG,
    /// Number of allocas at the top of the entry block
    alloca_count: usize,
}

impl Function {
    /// Create a new function with the given name and signature.
    ///
    /// One parameter value is created per signature parameter.
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        let mut dfg = DFG::new();
        let params = signature
            .params
            .iter()
            .enumerate()
            .map(|(i, ty)| dfg.make_param(i as u32, *ty))
            .collect();
        Self {
            name: name.into(),
            signature,
            attrs: FunctionAttrs::default(),
            params,
            blocks: PrimaryMap::new(),
            layout: Vec::new(),
            dfg,
            alloca_count: 0,
        }
    }

    /// Get the function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a new block at the end of the layout.
    pub fn create_block(&mut self, name: impl Into<String>) -> Block {
        let block = self.blocks.push(BlockData {
            name: name.into(),
            insts: Vec::new(),
        });
        self.layout.push(block);
        block
    }

    /// Move `block` to the end of the layout.
    pub fn move_block_to_end(&mut self, block: Block) {
        if let Some(pos) = self.layout.iter().position(|b| *b == block) {
            self.layout.remove(pos);
            self.layout.push(block);
        }
    }

    /// Push `inst` onto `block`.
    pub fn append_inst(&mut self, inst: Inst, block: Block) {
        self.blocks[block].insts.push(inst);
    }

    /// Insert an alloca after any earlier allocas in the entry block.
    pub fn insert_alloca(&mut self, inst: Inst) {
        if let Some(entry) = self.entry_block() {
            let at = self.alloca_count.min(self.blocks[entry].insts.len());
            self.blocks[entry].insts.insert(at, inst);
            self.alloca_count += 1;
        }
    }

    /// First block in layout order.
    pub fn entry_block(&self) -> Option<Block> {
        self.layout.first().copied()
    }

    /// Blocks in layout order.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.layout.iter().copied()
    }

    pub fn block_count(&self) -> usize {
        self.layout.len()
    }

    /// Instructions of a block in order
    pub fn block_insts(&self, block: Block) -> &[Inst] {
        self.blocks
            .get(block)
            .map(|b| b.insts.as_slice())
            .unwrap_or(&[])
    }

    pub fn block_name(&self, block: Block) -> &str {
        self.blocks.get(block).map(|b| b.name.as_str()).unwrap_or("")
    }

    /// First block with the given name.
    pub fn block_by_name(&self, name: &str) -> Option<Block> {
        self.blocks().find(|b| self.block_name(*b) == name)
    }

    /// The terminator of a block, if it has one.
    pub fn terminator(&self, block: Block) -> Option<Inst> {
        let last = *self.block_insts(block).last()?;
        self.dfg
            .inst_data(last)
            .filter(|d| d.is_terminator())
            .map(|_| last)
    }

    pub fn is_terminated(&self, block: Block) -> bool {
        self.terminator(block).is_some()
    }

    /// Every instruction in layout order.
    pub fn insts(&self) -> impl Iterator<Item = Inst> + '_ {
        self.blocks()
            .flat_map(move |b| self.block_insts(b).iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::{
        dfg::{InstData, Opcode},
        types::TypeStore,
    };

    #[test]
    fn test_function_creation() {
        let mut types = TypeStore::new();
        let i32 = types.i32();
        let func = Function::new("f", Signature::new(vec![i32, i32], i32));
        assert_eq!(func.name(), "f");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.block_count(), 0);
    }

    #[test]
    fn test_allocas_stay_on_top() {
        let mut types = TypeStore::new();
        let void = types.void();
        let i32 = types.i32();
        let mut func = Function::new("f", Signature::new(vec![], void));
        let entry = func.create_block("entry");
        let ret = func.dfg.create_inst(InstData::nullary(Opcode::Return));
        func.append_inst(ret, entry);
        let (a, _) = func.dfg.create_value_inst(
            InstData::nullary(Opcode::Alloca {
                name: "a".into(),
                ty: i32,
            }),
            i32,
        );
        let (b, _) = func.dfg.create_value_inst(
            InstData::nullary(Opcode::Alloca {
                name: "b".into(),
                ty: i32,
            }),
            i32,
        );
        func.insert_alloca(a);
        func.insert_alloca(b);
        assert_eq!(func.block_insts(entry), &[a, b, ret]);
        assert_eq!(func.terminator(entry), Some(ret));
    }

    #[test]
    fn test_move_block_to_end() {
        let mut types = TypeStore::new();
        let void = types.void();
        let mut func = Function::new("f", Signature::new(vec![], void));
        let a = func.create_block("a");
        let b = func.create_block("b");
        let c = func.create_block("c");
        func.move_block_to_end(b);
        assert_eq!(func.blocks().collect::<Vec<_>>(), vec![a, c, b]);
        assert_eq!(func.entry_block(), Some(a));
    }
}
