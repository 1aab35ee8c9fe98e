//! IR verifier.


use alloc::{collections::BTreeSet, format, string::{String, ToString}, vec::Vec};

use crate::{
    dfg::{Opcode, ValueDef},
    entity::Value,
    function::Function,
};

/// Verifier error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierError {
    /// What is malformed
    pub message: String,
    /// Block or instruction the problem was found at
    pub location: Option<String>,
}

impl VerifierError {
    pub fn new(message: String) -> Self {
        Self {
            message,
            location: None,
        }
    }

    pub fn with_location(message: String, location: String) -> Self {
        Self {
            message,
            location: Some(location),
        }
    }
}

/// Check the structural rules every lowered function must satisfy.
///
/// Checks that every block ends in exactly one terminator, that branch
/// targets exist, that every used value is defined in this function, and
/// that allocas only appear in the entry block.
pub fn verify(function: &Function) -> Result<(), Vec<VerifierError>> {
    let mut errors = Vec::new();

    verify_terminators(function, &mut errors);
    verify_uses(function, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn verify_terminators(function: &Function, errors: &mut Vec<VerifierError>) {
    let blocks: BTreeSet<_> = function.blocks().collect();
    for block in function.blocks() {
        let insts = function.block_insts(block);
        if insts.is_empty() {
            errors.push(VerifierError::with_location(
                "block is empty".to_string(),
                block.to_string(),
            ));
            continue;
        }
        for (i, inst) in insts.iter().enumerate() {
            let data = &function.dfg.insts[*inst];
            let last = i + 1 == insts.len();
            if data.is_terminator() && !last {
                errors.push(VerifierError::with_location(
                    format!("terminator {} in the middle of the block", data.opcode.mnemonic()),
                    format!("{} {}", block, inst),
                ));
            }
            if last && !data.is_terminator() {
                errors.push(VerifierError::with_location(
                    "block does not end in a terminator".to_string(),
                    block.to_string(),
                ));
            }
            for target in data.opcode.successors() {
                if !blocks.contains(&target) {
                    errors.push(VerifierError::with_location(
                        format!("branch to unknown block {}", target),
                        inst.to_string(),
                    ));
                }
            }
            if matches!(data.opcode, Opcode::Alloca { .. }) && Some(block) != function.entry_block() {
                errors.push(VerifierError::with_location(
                    "alloca outside the entry block".to_string(),
                    inst.to_string(),
                ));
            }
        }
    }
}

fn verify_uses(function: &Function, errors: &mut Vec<VerifierError>) {
    let mut placed = BTreeSet::new();
    for inst in function.insts() {
        placed.insert(inst);
    }
    let defined = |v: Value| match function.dfg.value_def(v) {
        Some(ValueDef::Param(_)) => true,
        Some(ValueDef::Result(inst)) => placed.contains(&inst),
        None => false,
    };
    for inst in function.insts() {
        for arg in &function.dfg.insts[inst].args {
            if !defined(*arg) {
                errors.push(VerifierError::with_location(
                    format!("use of undefined value {}", arg),
                    inst.to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::{
        builder::{Cursor, FunctionBuilder},
        function::Signature,
        module::Module,
    };

    #[test]
    fn test_missing_terminator() {
        let mut module = Module::new();
        let void = module.types.void();
        let func = module.declare_function("f", Signature::new(vec![], void));
        let block = module.function_mut(func).create_block("entry");
        let mut cursor = Cursor { func, block };
        FunctionBuilder::new(&mut module, &mut cursor).iconst(1);

        let errors = verify(module.function(func)).unwrap_err();
        assert!(errors[0].message.contains("terminator"));
    }

    #[test]
    fn test_valid_function() {
        let mut module = Module::new();
        let void = module.types.void();
        let func = module.declare_function("f", Signature::new(vec![], void));
        let block = module.function_mut(func).create_block("entry");
        let mut cursor = Cursor { func, block };
        let mut b = FunctionBuilder::new(&mut module, &mut cursor);
        let exit = b.create_block("exit");
        b.jump(exit);
        b.switch_to_block(exit);
        b.return_(None);

        assert!(verify(module.function(func)).is_ok());
    }
}
