//! Traversal driver.
//!
//! [`lower_node`] dispatches on node kind; [`lower`] runs one translation
//! unit through it and closes the entry point.
//!
//! The entry point is built from two blocks: `entry` collects global
//! initializers as they are met, and `mainBody` receives the statements
//! of `main`. Once the tree is walked the first jumps into the second and
//! the last body block gets the exit sequence.

use alloc::{format, vec, vec::Vec};

use topir::{
    metadata::StageMode,
    Module, StorageClass, Value,
};

use crate::{
    ast::{BasicType, Node, NodeKind, Operator, StorageQualifier, SymbolId, TranslationUnit},
    config::LowerOptions,
    constants::build_constant,
    context::{LowerContext, Storage},
    control::{lower_branch, lower_loop, lower_selection, lower_switch},
    diagnostics::Diagnostics,
    error::{LowerError, LowerResult, Severity},
    expr::{aggregate::lower_builtin, lower_binary, lower_unary},
    function::{enter_function, is_entry_point, lower_function_call, make_functions},
    metadata::{
        blend_equation_mask,
        emitter::{declare_uniform_metadata, make_input_metadata, set_output_metadata},
    },
    pipeline::create_pipeline_read,
    slots::assign_slot,
    stage::ShaderStage,
    types::convert_type,
};

/// Result of lowering one translation unit.
#[derive(Debug)]
pub struct LowerOutput {
    pub module: Module,
    pub diagnostics: Diagnostics,
}

/// Lower `unit` into a fresh module.
///
/// Problems are collected in the returned diagnostics rather than
/// failing the call; an aborted traversal still returns the partial
/// module.
pub fn lower(unit: &TranslationUnit, options: &LowerOptions) -> LowerOutput {
    let mut ctx = LowerContext::new(unit, *options);
    log::debug!("lowering {} shader, version {}", unit.stage, unit.version);

    check_stage_limits(&mut ctx, unit);
    emit_stage_modes(&mut ctx, unit);
    if let Err(err) = lower_node(&mut ctx, &unit.root) {
        ctx.diags.report(err, Severity::Abort);
    }
    if let Err(err) = finish_entry_point(&mut ctx) {
        ctx.diags.report(err, Severity::Abort);
    }

    let LowerContext { top, diags, .. } = ctx;
    LowerOutput {
        module: top.finish(),
        diagnostics: diags,
    }
}

fn finish_entry_point(ctx: &mut LowerContext<'_>) -> LowerResult<()> {
    let main = ctx.main;
    ctx.top.set_insert_point(main, ctx.init_block);
    if !ctx.top.is_terminated() {
        ctx.top.builder().jump(ctx.main_body);
    }
    ctx.top.set_insert_point(main, ctx.last_body_block);
    ctx.top.leave_function(true)
}

/// Report declared stage sizes beyond the unit's resource limits. The
/// modes are still recorded as declared.
fn check_stage_limits(ctx: &mut LowerContext<'_>, unit: &TranslationUnit) {
    let limits = &unit.limits;
    let mut exceeded = Vec::new();
    match unit.stage {
        ShaderStage::TessControl if unit.modes.vertices > limits.max_patch_vertices => {
            exceeded.push(("MaxPatchVertices", unit.modes.vertices, limits.max_patch_vertices));
        }
        ShaderStage::Geometry if unit.modes.vertices > limits.max_geometry_output_vertices => {
            exceeded.push((
                "MaxGeometryOutputVertices",
                unit.modes.vertices,
                limits.max_geometry_output_vertices,
            ));
        }
        ShaderStage::Compute => {
            let maxima = [
                ("MaxComputeWorkGroupSizeX", limits.max_compute_work_group_size_x),
                ("MaxComputeWorkGroupSizeY", limits.max_compute_work_group_size_y),
                ("MaxComputeWorkGroupSizeZ", limits.max_compute_work_group_size_z),
            ];
            for (size, (name, max)) in unit.modes.local_size.iter().zip(maxima) {
                if *size as i64 > max as i64 {
                    exceeded.push((name, *size as i32, max));
                }
            }
        }
        _ => {}
    }
    for (name, value, max) in exceeded {
        ctx.unsupported(format!("{} exceeded: {} > {}", name, value, max));
    }
}

fn emit_stage_modes(ctx: &mut LowerContext<'_>, unit: &TranslationUnit) {
    let modes = &unit.modes;
    let metadata = &mut ctx.top.module.metadata;
    if modes.xfb {
        metadata.set_mode(StageMode::Xfb, vec![1]);
    }
    match unit.stage {
        ShaderStage::Vertex => {}
        ShaderStage::TessControl => {
            metadata.set_mode(StageMode::NumVertices, vec![modes.vertices]);
        }
        ShaderStage::TessEvaluation => {
            metadata.set_mode(StageMode::InputPrimitive, vec![modes.input_primitive as i32]);
            metadata.set_mode(StageMode::VertexSpacing, vec![modes.vertex_spacing as i32]);
            metadata.set_mode(StageMode::VertexOrder, vec![modes.vertex_order as i32]);
            metadata.set_mode(StageMode::PointMode, vec![modes.point_mode as i32]);
        }
        ShaderStage::Geometry => {
            metadata.set_mode(StageMode::Invocations, vec![modes.invocations]);
            metadata.set_mode(StageMode::NumVertices, vec![modes.vertices]);
            metadata.set_mode(StageMode::InputPrimitive, vec![modes.input_primitive as i32]);
            metadata.set_mode(StageMode::OutputPrimitive, vec![modes.output_primitive as i32]);
        }
        ShaderStage::Fragment => {
            if modes.pixel_center_integer {
                metadata.set_mode(StageMode::PixelCenterInteger, vec![1]);
            }
            if modes.origin_upper_left {
                metadata.set_mode(StageMode::OriginUpperLeft, vec![1]);
            }
            if !modes.blend_equations.is_empty() {
                let mask = blend_equation_mask(&modes.blend_equations);
                metadata.set_mode(StageMode::BlendEquation, vec![mask.bits() as i32]);
            }
        }
        ShaderStage::Compute => {
            let size = modes.local_size.map(|n| n as i32).to_vec();
            metadata.set_mode(StageMode::LocalSize, size);
        }
    }
}

/// Lower one node, leaving its result in the access chain.
pub fn lower_node<'a>(ctx: &mut LowerContext<'a>, node: &'a Node) -> LowerResult<()> {
    match &node.kind {
        NodeKind::Symbol { id, name } => visit_symbol(ctx, node, *id, name),
        NodeKind::Constant(values) => {
            let constant = build_constant(ctx, &node.ty, values, &mut 0);
            if node.ty.is_array() || node.ty.is_struct() || node.ty.is_matrix() {
                // Aggregates live in memory so the chain can index them.
                let ty = convert_type(ctx, &node.ty);
                let name = ctx.left_name.as_deref().unwrap_or("lconst");
                let global = ctx
                    .top
                    .module
                    .add_global(name, ty, StorageClass::Const, Some(constant));
                let ptr = ctx.top.builder().global_addr(global);
                ctx.top.clear_chain();
                ctx.top.chain.set_l(ptr);
            } else {
                let value = ctx.top.builder().constant(constant);
                ctx.set_rvalue(value);
            }
            Ok(())
        }
        NodeKind::Binary { op, left, right } => lower_binary(ctx, node, *op, left, right),
        NodeKind::Unary { op, operand } => lower_unary(ctx, node, *op, operand),
        NodeKind::Aggregate {
            op,
            sequence,
            name,
            qualifiers,
        } => match op {
            Operator::Sequence => {
                make_functions(ctx, sequence)?;
                for statement in sequence {
                    lower_node(ctx, statement)?;
                }
                Ok(())
            }
            Operator::LinkerObjects => {
                ctx.linkage_only = true;
                let result = sequence.iter().try_for_each(|object| lower_node(ctx, object));
                ctx.linkage_only = false;
                result
            }
            Operator::Comma => {
                // The right-most operand stays in the chain.
                for operand in sequence {
                    ctx.top.clear_chain();
                    lower_node(ctx, operand)?;
                }
                Ok(())
            }
            Operator::Function => lower_function(ctx, name, sequence),
            Operator::Parameters => Ok(()),
            Operator::FunctionCall => lower_function_call(ctx, node, name, sequence, qualifiers),
            _ => lower_builtin(ctx, node, *op, sequence),
        },
        NodeKind::Selection {
            cond,
            true_block,
            false_block,
        } => lower_selection(ctx, node, cond, true_block.as_deref(), false_block.as_deref()),
        NodeKind::Switch { cond, body } => lower_switch(ctx, cond, body),
        NodeKind::Loop {
            test,
            body,
            terminal,
            test_first,
        } => lower_loop(
            ctx,
            test.as_deref(),
            body.as_deref(),
            terminal.as_deref(),
            *test_first,
        ),
        NodeKind::Branch { op, expr } => lower_branch(ctx, *op, expr.as_deref()),
    }
}

fn lower_function<'a>(ctx: &mut LowerContext<'a>, name: &str, sequence: &'a [Node]) -> LowerResult<()> {
    // Global code after this function still goes before main's body.
    ctx.init_block = ctx.top.current_block();

    if is_entry_point(name) {
        ctx.in_main = true;
        ctx.top.set_insert_point(ctx.main, ctx.main_body);
        ctx.top.module.metadata.add_entry_point("main");
    } else {
        enter_function(ctx, name)?;
    }
    log::debug!("entering function {}", name);

    if let Some(body) = sequence.get(1) {
        lower_node(ctx, body)?;
    }

    if ctx.in_main {
        ctx.in_main = false;
        ctx.last_body_block = ctx.top.current_block();
    } else {
        ctx.top.leave_function(false)?;
    }
    ctx.top.set_insert_point(ctx.main, ctx.init_block);
    Ok(())
}

fn storage_class(ctx: &mut LowerContext<'_>, node: &Node) -> Option<StorageClass> {
    if node.ty.basic == BasicType::Sampler {
        return Some(StorageClass::Resource);
    }
    match node.ty.qualifier.storage {
        StorageQualifier::Temporary | StorageQualifier::Const | StorageQualifier::ConstReadOnly => None,
        StorageQualifier::Global => Some(StorageClass::Global),
        StorageQualifier::Shared => Some(StorageClass::Shared),
        StorageQualifier::Uniform => Some(StorageClass::Uniform),
        StorageQualifier::Buffer => Some(StorageClass::Buffer),
        s if s.is_pipe_input() => Some(StorageClass::Input),
        s if s.is_pipe_output() => Some(StorageClass::Output),
        other => {
            ctx.unsupported(format!("storage qualifier {:?}", other));
            None
        }
    }
}

fn create_variable(ctx: &mut LowerContext<'_>, node: &Node, name: &str) -> Storage {
    let ty = convert_type(ctx, &node.ty);
    match storage_class(ctx, node) {
        Some(class) => {
            log::trace!("global {} in {:?} storage", name, class);
            Storage::Global(ctx.top.module.add_global(name, ty, class, None))
        }
        None => Storage::Local(ctx.top.builder().alloca(name, ty)),
    }
}

fn storage_pointer(ctx: &mut LowerContext<'_>, storage: Storage) -> Value {
    match storage {
        Storage::Global(global) => ctx.top.builder().global_addr(global),
        Storage::Local(ptr) => ptr,
    }
}

/// A variable reference: allocate on first sight, describe pipeline and
/// uniform variables in metadata, re-read inputs, and start a chain at
/// the variable's storage.
fn visit_symbol(ctx: &mut LowerContext<'_>, node: &Node, id: SymbolId, name: &str) -> LowerResult<()> {
    let qualifier = node.ty.qualifier.storage;
    let input = qualifier.is_pipe_input();
    let output = qualifier.is_pipe_output();

    let (storage, first_time) = match ctx.symbols.get(&id) {
        Some(storage) => (*storage, false),
        None => {
            let storage = create_variable(ctx, node, name);
            ctx.symbols.insert(id, storage);
            (storage, true)
        }
    };
    let global = match storage {
        Storage::Global(global) => Some(global),
        Storage::Local(_) => None,
    };

    if first_time {
        if let Some(global) = global {
            if output {
                let (slot, num_slots) = assign_slot(ctx, name, &node.ty);
                set_output_metadata(ctx, name, &node.ty, global, slot, num_slots);
            } else if qualifier == StorageQualifier::Shared {
                ctx.top.module.metadata.add_shared(global);
            }
        }
    }

    let uniform_md = match global {
        Some(global) if qualifier.is_uniform_or_buffer() => {
            let storage_ty = ctx.top.module.global(global).ty;
            Some(declare_uniform_metadata(ctx, name, &node.ty, storage_ty, name))
        }
        _ => None,
    };

    let pointer = if ctx.linkage_only {
        None
    } else {
        let ptr = storage_pointer(ctx, storage);
        ctx.top.clear_chain();
        ctx.top.chain.set_l(ptr);
        if let Some(md) = uniform_md {
            ctx.top.chain.set_md(md);
        }
        if let (true, Some(global)) = (output, global) {
            ctx.top.chain.track_active(global);
        }
        Some(ptr)
    };

    if input {
        let global = global
            .ok_or_else(|| LowerError::invariant(format!("input {} without a shadow global", name)))?;
        let (slot, _) = assign_slot(ctx, name, &node.ty);
        let (proxy_ty, proxy_name) = {
            let data = ctx.top.module.global(global);
            (data.ty, data.name.clone())
        };
        let md = make_input_metadata(ctx, name, &node.ty, proxy_ty, &proxy_name, slot);
        if let Some(shadow) = pointer {
            create_pipeline_read(ctx, name, &node.ty, shadow, slot, md)?;
        }
    }
    Ok(())
}
