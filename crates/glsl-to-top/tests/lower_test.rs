//! LowerTest helper for integration tests.
//!
//! Lowers a translation unit, verifies every produced function, and offers
//! structural queries over the result.

#![allow(dead_code)]

use glsl_to_top::{
    ast::{AstType, Node, TranslationUnit},
    lower, Diagnostics, LowerOptions, ShaderStage,
};
use topir::{verify, Block, Function, InstData, Module, Opcode, VerifierError};

/// Lowered module plus the diagnostics of one unit.
pub struct LowerTest {
    pub module: Module,
    pub diagnostics: Diagnostics,
}

impl LowerTest {
    /// Lower `unit` with default options and verify the result.
    pub fn new(unit: &TranslationUnit) -> Self {
        Self::with_options(unit, &LowerOptions::default())
    }

    pub fn with_options(unit: &TranslationUnit, options: &LowerOptions) -> Self {
        let out = lower(unit, options);
        let test = Self {
            module: out.module,
            diagnostics: out.diagnostics,
        };
        test.verify_all();
        test
    }

    /// Lower a unit of `stage` whose `main` runs `body`, after the global
    /// statements `globals` (function definitions, initializers).
    pub fn main(stage: ShaderStage, globals: Vec<Node>, body: Vec<Node>) -> Self {
        Self::new(&unit(stage, globals, body))
    }

    fn verify_all(&self) {
        for (_, func) in self.module.functions.iter() {
            if let Err(errors) = verify(func) {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e: &VerifierError| match &e.location {
                        Some(loc) => format!("  {}: {}", loc, e.message),
                        None => format!("  {}", e.message),
                    })
                    .collect();
                panic!(
                    "function {} failed verification:\n{}\n\n{}",
                    func.name,
                    msgs.join("\n"),
                    self.module.display_function(self.func_ref(&func.name))
                );
            }
        }
    }

    fn func_ref(&self, name: &str) -> topir::FuncRef {
        self.module
            .find_function(name)
            .unwrap_or_else(|| panic!("no function named {}", name))
    }

    pub fn function(&self, name: &str) -> &Function {
        self.module.function(self.func_ref(name))
    }

    /// Instructions of `name` in layout order.
    pub fn insts(&self, name: &str) -> Vec<&InstData> {
        let func = self.function(name);
        func.insts().map(|inst| &func.dfg.insts[inst]).collect()
    }

    pub fn opcodes(&self, name: &str) -> Vec<&Opcode> {
        self.insts(name).into_iter().map(|d| &d.opcode).collect()
    }

    pub fn count(&self, name: &str, pred: impl Fn(&Opcode) -> bool) -> usize {
        self.opcodes(name).into_iter().filter(|op| pred(*op)).count()
    }

    /// Layout index of the first instruction of `name` matching `pred`.
    pub fn position(&self, name: &str, pred: impl Fn(&Opcode) -> bool) -> Option<usize> {
        self.opcodes(name).into_iter().position(pred)
    }

    pub fn blocks_named(&self, func: &str, block: &str) -> Vec<Block> {
        let f = self.function(func);
        f.blocks().filter(|b| f.block_name(*b) == block).collect()
    }

    /// Opcodes of one block.
    pub fn block_opcodes(&self, func: &str, block: Block) -> Vec<&Opcode> {
        let f = self.function(func);
        f.block_insts(block)
            .iter()
            .map(|inst| &f.dfg.insts[*inst].opcode)
            .collect()
    }

    pub fn terminator(&self, func: &str, block: Block) -> &Opcode {
        let f = self.function(func);
        let inst = f
            .terminator(block)
            .unwrap_or_else(|| panic!("{} is not terminated", f.block_name(block)));
        &f.dfg.insts[inst].opcode
    }

    /// Printed module with blank lines and surrounding whitespace removed.
    pub fn text(&self) -> String {
        normalize(&self.module.to_string())
    }

    pub fn assert_clean(&self) {
        assert!(
            self.diagnostics.is_empty(),
            "unexpected diagnostics:\n{}",
            self.diagnostics.info_log()
        );
    }
}

/// A unit whose root holds `globals` followed by `main(`.
pub fn unit(stage: ShaderStage, globals: Vec<Node>, body: Vec<Node>) -> TranslationUnit {
    let mut statements = globals;
    statements.push(Node::function("main(", AstType::void(), Vec::new(), body));
    TranslationUnit::new(stage, Node::sequence(statements))
}

pub fn normalize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
