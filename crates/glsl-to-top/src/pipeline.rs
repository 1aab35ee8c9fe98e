//! Expansion of pipeline inputs into per-slot reads.
//!
//! Under physical I/O every reference to an input re-reads the pipeline:
//! one `read_pipeline` per slot, stored into the input's shadow global
//! through a growing chain of member indices.

use alloc::vec::Vec;

use topir::{metadata::InterpolationMode, GepStep, MdNode, Value};

use crate::{
    ast::AstType,
    context::LowerContext,
    error::LowerResult,
    metadata::{interpolation, precision_of},
    types::{convert_type, UNKNOWN_ARRAY_SIZE},
};

struct PipelineRead<'n> {
    name: &'n str,
    shadow: Value,
    md: MdNode,
    interpolation: InterpolationMode,
}

/// Fill `shadow` with fresh reads of the input `name` starting at
/// `first_slot`. Does nothing under logical I/O.
pub fn create_pipeline_read(
    ctx: &mut LowerContext<'_>,
    name: &str,
    ty: &AstType,
    shadow: Value,
    first_slot: i32,
    md: MdNode,
) -> LowerResult<()> {
    if ctx.options.use_logical_io {
        return Ok(());
    }
    let read = PipelineRead {
        name,
        shadow,
        md,
        interpolation: interpolation(ty),
    };
    let mut slot = first_slot;
    let mut path = Vec::new();
    read_subtree(ctx, &read, ty, &mut path, &mut slot)
}

fn read_subtree(
    ctx: &mut LowerContext<'_>,
    read: &PipelineRead<'_>,
    ty: &AstType,
    path: &mut Vec<u32>,
    slot: &mut i32,
) -> LowerResult<()> {
    // Arrayness first; an array of matrices is still an array.
    if ty.is_array() {
        let size = match ty.outer_array_size() {
            0 => UNKNOWN_ARRAY_SIZE,
            n => n,
        };
        let element = ty.element_type();
        for index in 0..size {
            path.push(index);
            read_subtree(ctx, read, &element, path, slot)?;
            path.pop();
        }
    } else if ty.is_struct() {
        let fields = ty.members().iter().filter(|m| !m.hidden);
        for (index, field) in fields.enumerate() {
            path.push(index as u32);
            read_subtree(ctx, read, field, path, slot)?;
            path.pop();
        }
    } else if ty.is_matrix() {
        let column = ty.column_type();
        for col in 0..ty.matrix_cols {
            path.push(col);
            read_leaf(ctx, read, &column, precision_of(ty), path, *slot)?;
            path.pop();
            *slot += 1;
        }
    } else {
        read_leaf(ctx, read, ty, precision_of(ty), path, *slot)?;
        *slot += 1;
    }
    Ok(())
}

fn read_leaf(
    ctx: &mut LowerContext<'_>,
    read: &PipelineRead<'_>,
    ty: &AstType,
    precision: topir::Precision,
    path: &[u32],
    slot: i32,
) -> LowerResult<()> {
    let read_ty = convert_type(ctx, ty);
    let mut b = ctx.top.builder();
    let value = b.read_pipeline(
        read_ty,
        read.name,
        slot,
        Some(read.md),
        -1,
        read.interpolation,
        precision,
    );
    let dest = if path.is_empty() {
        read.shadow
    } else {
        let steps: Vec<GepStep> = path.iter().map(|i| GepStep::Const(*i)).collect();
        b.gep(read.shadow, &steps)?
    };
    b.store(value, dest);
    Ok(())
}
