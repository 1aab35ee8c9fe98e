//! Shader stages and the multi-stage driver.

use alloc::{string::String, vec::Vec};
use core::fmt;

use topir::Module;

use crate::{
    ast::TranslationUnit,
    config::LowerOptions,
    diagnostics::Diagnostics,
    lower::{lower, LowerOutput},
};

/// Pipeline stage of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tessellation control",
            ShaderStage::TessEvaluation => "tessellation evaluation",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One lowered stage.
#[derive(Debug)]
pub struct StageOutput {
    pub stage: ShaderStage,
    pub module: Module,
    pub diagnostics: Diagnostics,
}

/// Lower every unit on its own; no cache is shared between stages.
pub fn lower_stages(units: &[TranslationUnit], options: &LowerOptions) -> Vec<StageOutput> {
    units
        .iter()
        .map(|unit| {
            let LowerOutput {
                module,
                diagnostics,
            } = lower(unit, options);
            StageOutput {
                stage: unit.stage,
                module,
                diagnostics,
            }
        })
        .collect()
}

/// Concatenate the info logs of `outputs`, each under a stage header.
/// Stages without diagnostics contribute nothing.
pub fn info_log(outputs: &[StageOutput]) -> String {
    let mut log = String::new();
    for output in outputs.iter().filter(|o| !o.diagnostics.is_empty()) {
        log.push_str(output.stage.name());
        log.push_str(":\n");
        log.push_str(&output.diagnostics.info_log());
    }
    log
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec};

    use super::*;
    use crate::ast::{AstType, Node, Operator};

    fn unit(stage: ShaderStage, statements: Vec<Node>) -> TranslationUnit {
        TranslationUnit::new(stage, Node::sequence(statements))
    }

    #[test]
    fn test_stages_are_independent() {
        let units = vec![
            unit(ShaderStage::Vertex, Vec::new()),
            unit(ShaderStage::Fragment, Vec::new()),
        ];
        let outputs = lower_stages(&units, &LowerOptions::default());
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].stage, ShaderStage::Vertex);
        assert_eq!(outputs[1].stage, ShaderStage::Fragment);
        assert!(outputs.iter().all(|o| o.module.find_function("main").is_some()));
        assert_eq!(info_log(&outputs), "");
    }

    #[test]
    fn test_info_log_names_the_stage() {
        let doubled = Node::unary(Operator::ConvFloatToDouble, AstType::double(), Node::float(1.0));
        let body = Node::function("main(", AstType::void(), Vec::new(), vec![doubled]);
        let units = vec![
            unit(ShaderStage::Vertex, Vec::new()),
            unit(ShaderStage::Fragment, vec![body]),
        ];
        let outputs = lower_stages(&units, &LowerOptions::default());
        let log = info_log(&outputs);
        assert!(log.starts_with("fragment:\n"));
        assert!(log.contains("WARNING: unsupported functionality"));
    }

    #[test]
    fn test_display() {
        assert_eq!(ShaderStage::TessEvaluation.to_string(), "tessellation evaluation");
    }
}
