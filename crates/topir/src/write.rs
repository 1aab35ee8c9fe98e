//! Textual form of modules and functions.

use alloc::{format, string::{String, ToString}, vec::Vec};
use core::fmt::{self, Write};

use crate::{
    dfg::{GepIndex, InstData, Opcode},
    entity::{FuncRef, Inst},
    function::Function,
    metadata::{MdNodeData, Precision},
    module::Module,
};

/// Display adapter for one function of a module.
pub struct DisplayFunction<'a> {
    module: &'a Module,
    func: &'a Function,
}

impl Module {
    /// Display a single function.
    pub fn display_function(&self, func: FuncRef) -> DisplayFunction<'_> {
        DisplayFunction {
            module: self,
            func: self.function(func),
        }
    }
}

impl fmt::Display for DisplayFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = &self.module.types;
        let func = self.func;

        write!(f, "function %{}(", func.name)?;
        for (i, (param, ty)) in func.params.iter().zip(&func.signature.params).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param, types.display(*ty))?;
        }
        write!(f, ") -> {}", types.display(func.signature.ret))?;
        if func.attrs.entry_point {
            write!(f, " entry")?;
        }
        if func.attrs.always_inline {
            write!(f, " alwaysinline")?;
        }
        writeln!(f, " {{")?;

        for block in func.blocks() {
            writeln!(f, "{}: ; {}", block, func.block_name(block))?;
            for inst in func.block_insts(block) {
                writeln!(f, "    {}", format_inst(self.module, func, *inst))?;
            }
        }

        writeln!(f, "}}")
    }
}

fn join<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format one instruction as a single line.
pub fn format_inst(module: &Module, func: &Function, inst: Inst) -> String {
    let data: &InstData = &func.dfg.insts[inst];
    let mut line = String::new();
    if let Some(result) = data.result {
        let _ = write!(line, "{} = ", result);
    }
    line.push_str(&data.opcode.mnemonic());

    let operands = match &data.opcode {
        Opcode::Const { constant } => module.constants.display(*constant).to_string(),
        Opcode::GlobalAddr { global } => {
            format!("{} \"{}\"", global, module.global(*global).name)
        }
        Opcode::Alloca { name, ty } => format!("\"{}\", {}", name, module.types.display(*ty)),
        Opcode::Gep { path } => {
            let mut dynamic = data.args.iter().skip(1);
            let steps = path.iter().map(|step| match step {
                GepIndex::Const(i) => i.to_string(),
                GepIndex::Dynamic => dynamic
                    .next()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "?".to_string()),
            });
            let base = data.args.first().map(|v| v.to_string()).unwrap_or_default();
            format!("{}[{}]", base, join(steps))
        }
        Opcode::ExtractValue { index } | Opcode::InsertValue { index } => {
            format!("{}, {}", join(&data.args), index)
        }
        Opcode::Swizzle { components } => format!("{}, [{}]", join(&data.args), join(components)),
        Opcode::InsertLanes { lanes } => format!("{}, [{}]", join(&data.args), join(lanes)),
        Opcode::Call { callee } => {
            format!("%{}({})", module.function(*callee).name, join(&data.args))
        }
        Opcode::Intrinsic(_) => format!("({})", join(&data.args)),
        Opcode::ReadPipeline(read) => format!(
            "\"{}\", slot {}, mask {}, {:?}/{:?}",
            read.name,
            read.slot,
            read.mask,
            read.interpolation.method,
            read.interpolation.location
        ),
        Opcode::WritePipeline { slot, mask, .. } => {
            format!("{}, slot {}, mask {}", join(&data.args), slot, mask)
        }
        Opcode::Texture {
            sampler,
            flags,
            params,
        } => format!(
            "{} {:#x} {{{}}}",
            sampler,
            flags.bits(),
            join(
                params
                    .named_operands()
                    .into_iter()
                    .map(|(n, v)| format!("{}: {}", n, v))
            )
        ),
        Opcode::Image { sampler, params, .. } => format!(
            "{} {{{}}}",
            sampler,
            join(
                params
                    .named_operands()
                    .into_iter()
                    .map(|(n, v)| format!("{}: {}", n, v))
            )
        ),
        Opcode::TextureQuery { sampler, .. } => format!("{} ({})", sampler, join(&data.args)),
        Opcode::Jump { dest } => dest.to_string(),
        Opcode::Br {
            then_dest,
            else_dest,
        } => format!("{}, {}, {}", join(&data.args), then_dest, else_dest),
        Opcode::Switch { cases, default } => format!(
            "{}, [{}], default {}",
            join(&data.args),
            join(cases.iter().map(|(v, b)| format!("{}: {}", v, b))),
            default
        ),
        _ => join(&data.args),
    };
    if !operands.is_empty() {
        line.push(' ');
        line.push_str(&operands);
    }

    if let Some(result) = data.result {
        let _ = write!(
            line,
            " : {}",
            module.types.display(func.dfg.values[result].ty)
        );
    }
    if data.precision != Precision::None {
        let _ = write!(line, " !{}", data.precision);
    }
    if let Some(md) = data.md {
        let _ = write!(line, " {}", md);
    }
    line
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, data) in self.types.structs() {
            if let crate::types::TypeData::Struct {
                name,
                fields: Some(fields),
            } = data
            {
                writeln!(
                    f,
                    "type %{} = {{ {} }} ; {}",
                    name,
                    join(fields.iter().map(|t| self.types.display(*t))),
                    id
                )?;
            }
        }
        for (g, data) in self.globals.iter() {
            write!(
                f,
                "{} = {} {} \"{}\"",
                g,
                data.storage,
                self.types.display(data.ty),
                data.name
            )?;
            if let Some(init) = data.initializer {
                write!(f, " = {}", self.constants.display(init))?;
            }
            writeln!(f)?;
        }
        for (p, data) in self.proxies.iter() {
            writeln!(f, "{} = proxy {} \"{}\"", p, self.types.display(data.ty), data.name)?;
        }
        for func in self.functions.keys() {
            writeln!(f)?;
            write!(f, "{}", self.display_function(func))?;
        }
        if self.metadata.node_count() > 0 {
            writeln!(f)?;
        }
        for (mode, values) in self.metadata.modes() {
            writeln!(f, "!{} = {{{}}}", mode.name(), join(values))?;
        }
        for (list, nodes) in self.metadata.lists() {
            writeln!(f, "!{} = {{{}}}", list.name(), join(nodes))?;
        }
        for (node, data) in self.metadata.nodes() {
            let summary = match data {
                MdNodeData::Io(io) => format!(
                    "io \"{}\" {:?} {:?}",
                    io.name, io.category, io.layout.type_layout
                ),
                MdNodeData::TypeTree(tree) => format!(
                    "typetree \"{}\" \"{}\" {:?} members {}",
                    tree.name,
                    tree.type_name,
                    tree.category,
                    tree.members.len()
                ),
                MdNodeData::Aggregate(agg) => format!(
                    "aggregate \"{}\" {{{}}}",
                    agg.type_name,
                    join(agg.members.iter().map(|(n, m)| format!("{}: {}", n, m)))
                ),
                MdNodeData::Sampler(s) => format!("sampler {:?} {:?}", s.kind, s.dim),
            };
            writeln!(f, "{} = {}", node, summary)?;
        }
        Ok(())
    }
}
