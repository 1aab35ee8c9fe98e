//! Texture, image and query built-ins.
//!
//! A texture call is cracked into independent dimensions (projected,
//! offset, lod, grad, gather, fetch), which become a flag set. The flags
//! then decide how the trailing arguments are distributed over the
//! texture parameters.

use alloc::{format, vec, vec::Vec};

use topir::{ImageOp, QueryOp, SamplerType, TextureFlags, TextureParams, Value};

use crate::{
    ast::{crack_texture, BasicType, CrackedTextureOp, Node, NodeKind, Operator, SamplerDesc, SamplerDim},
    context::LowerContext,
    error::{LowerError, LowerResult},
    metadata::precision_of,
    types::convert_type,
};

/// IR sampler kind of a front-end sampler shape.
pub fn sampler_type(desc: &SamplerDesc) -> SamplerType {
    if desc.ms {
        return SamplerType::Sampler2DMS;
    }
    match desc.dim {
        SamplerDim::Dim1D => SamplerType::Sampler1D,
        SamplerDim::Dim2D => SamplerType::Sampler2D,
        SamplerDim::Dim3D => SamplerType::Sampler3D,
        SamplerDim::Cube => SamplerType::SamplerCube,
        SamplerDim::Rect => SamplerType::Sampler2DRect,
        SamplerDim::Buffer => SamplerType::SamplerBuffer,
    }
}

/// Lower a texture, image or query call. `Ok(None)` when the call has
/// no value, as for `imageStore`.
pub fn lower_texture_call<'a>(ctx: &mut LowerContext<'a>, node: &'a Node) -> LowerResult<Option<Value>> {
    let (op, operands): (Operator, Vec<&'a Node>) = match &node.kind {
        NodeKind::Aggregate { op, sequence, .. } => (*op, sequence.iter().collect()),
        NodeKind::Unary { op, operand } => (*op, vec![operand.as_ref()]),
        _ => return Err(LowerError::invariant("texture call on a non-operator node")),
    };

    let desc = operands
        .first()
        .and_then(|first| first.ty.sampler)
        .ok_or_else(|| LowerError::invariant(format!("{:?} without a sampler operand", op)))?;

    let mut args = Vec::with_capacity(operands.len());
    for operand in operands {
        args.push(ctx.rvalue(operand)?);
    }

    let sampler = sampler_type(&desc);
    let cracked = crack_texture(op, &desc)
        .ok_or_else(|| LowerError::invariant(format!("{:?} is not a texture operator", op)))?;

    if cracked.query {
        return lower_query(ctx, node, op, &args, sampler).map(Some);
    }
    if desc.image {
        return lower_image_access(ctx, node, op, &args, sampler, desc.basic == BasicType::Uint);
    }

    let mut flags = TextureFlags::empty();
    if desc.arrayed {
        flags |= TextureFlags::ARRAYED;
    }
    if desc.shadow {
        flags |= TextureFlags::SHADOW;
    }
    let flags = texture_flags(&cracked, sampler, flags, args.len());
    let params = texture_params(&cracked, flags, &args)?;

    let ty = convert_type(ctx, &node.ty);
    let mut b = ctx.top.builder();
    let value = b.texture(sampler, flags, params, ty);
    b.set_precision(value, precision_of(&node.ty));
    Ok(Some(value))
}

/// Complete the flag set of a texture access from the cracked operator
/// and the argument count.
pub fn texture_flags(
    cracked: &CrackedTextureOp,
    sampler: SamplerType,
    mut flags: TextureFlags,
    arg_count: usize,
) -> TextureFlags {
    if cracked.lod {
        flags |= TextureFlags::LOD | TextureFlags::BIAS_LOD_ARG;
    }
    if cracked.proj {
        flags |= TextureFlags::PROJECTED;
    }
    if cracked.offset || cracked.offsets {
        flags |= TextureFlags::OFFSET_ARG;
        if cracked.offsets {
            flags |= TextureFlags::OFFSETS;
        }
    }
    if cracked.fetch {
        flags |= TextureFlags::FETCH;
        match sampler {
            SamplerType::Sampler1D | SamplerType::Sampler2D | SamplerType::Sampler3D => {
                flags |= TextureFlags::LOD | TextureFlags::BIAS_LOD_ARG;
            }
            SamplerType::Sampler2DMS => {
                flags |= TextureFlags::SAMPLE_ARG | TextureFlags::BIAS_LOD_ARG;
            }
            _ => {}
        }
    }
    if cracked.gather {
        flags |= TextureFlags::GATHER;
        if flags.contains(TextureFlags::SHADOW) {
            flags |= TextureFlags::REF_Z_ARG;
        }
    }

    // A trailing argument beyond the fixed ones is a bias.
    if !flags.intersects(TextureFlags::LOD | TextureFlags::GATHER | TextureFlags::SAMPLE_ARG) {
        let mut fixed = 2;
        if flags.contains(TextureFlags::OFFSET_ARG) {
            fixed += 1;
        }
        if flags.contains(TextureFlags::BIAS_LOD_ARG) {
            fixed += 1;
        }
        if cracked.grad {
            fixed += 2;
        }
        if arg_count > fixed {
            flags |= TextureFlags::BIAS | TextureFlags::BIAS_LOD_ARG;
        }
    }

    // Same for the component selector of a non-shadow gather.
    if flags.contains(TextureFlags::GATHER) && !flags.contains(TextureFlags::SHADOW) {
        let mut fixed = 2;
        if flags.contains(TextureFlags::OFFSET_ARG) {
            fixed += 1;
        }
        if arg_count > fixed {
            flags |= TextureFlags::COMPONENT_ARG;
        }
    }
    flags
}

/// Distribute `args` (sampler and coordinates first) over the texture
/// parameters in the order the flags imply.
pub fn texture_params(
    cracked: &CrackedTextureOp,
    flags: TextureFlags,
    args: &[Value],
) -> LowerResult<TextureParams> {
    let arg = |i: usize| {
        args.get(i)
            .copied()
            .ok_or_else(|| LowerError::invariant(format!("texture call missing argument {}", i)))
    };
    let mut params = TextureParams::new(arg(0)?, arg(1)?);
    let mut next = 2;
    if flags.intersects(TextureFlags::LOD | TextureFlags::SAMPLE_ARG) {
        params.bias_lod = Some(arg(next)?);
        next += 1;
    }
    if cracked.grad {
        params.grad_x = Some(arg(next)?);
        params.grad_y = Some(arg(next + 1)?);
        next += 2;
    }
    if flags.contains(TextureFlags::REF_Z_ARG) {
        params.shadow_ref = Some(arg(next)?);
        next += 1;
    }
    if flags.contains(TextureFlags::OFFSET_ARG) {
        params.offset = Some(arg(next)?);
        next += 1;
    }
    if flags.intersects(TextureFlags::BIAS | TextureFlags::COMPONENT_ARG) {
        params.bias_lod = Some(arg(next)?);
    }
    Ok(params)
}

fn lower_query(
    ctx: &mut LowerContext<'_>,
    node: &Node,
    op: Operator,
    args: &[Value],
    sampler: SamplerType,
) -> LowerResult<Value> {
    let ty = convert_type(ctx, &node.ty);
    let (query, query_args) = match op {
        Operator::ImageQuerySize => (QueryOp::ImageSize, vec![args[0]]),
        Operator::TextureQuerySize if sampler.has_no_lod() => {
            (QueryOp::TextureSizeNoLod, vec![args[0]])
        }
        Operator::TextureQuerySize => {
            let lod = args
                .get(1)
                .copied()
                .ok_or_else(|| LowerError::invariant("textureSize without a lod"))?;
            (QueryOp::TextureSize, vec![args[0], lod])
        }
        Operator::TextureQueryLod => {
            ctx.unsupported("textureQueryLod");
            let coords = args
                .get(1)
                .copied()
                .ok_or_else(|| LowerError::invariant("textureQueryLod without coordinates"))?;
            (QueryOp::TextureLod, vec![args[0], coords])
        }
        _ => {
            ctx.unsupported(format!("texture query {:?}", op));
            return Ok(ctx.placeholder(ty));
        }
    };

    let mut b = ctx.top.builder();
    let value = b.texture_query(sampler, query, query_args, ty);
    b.set_precision(value, precision_of(&node.ty));
    Ok(value)
}

fn lower_image_access(
    ctx: &mut LowerContext<'_>,
    node: &Node,
    op: Operator,
    args: &[Value],
    sampler: SamplerType,
    is_unsigned: bool,
) -> LowerResult<Option<Value>> {
    let image_op = match op {
        Operator::ImageLoad => ImageOp::Load,
        Operator::ImageStore => ImageOp::Store,
        Operator::ImageAtomicAdd => ImageOp::AtomicAdd,
        Operator::ImageAtomicMin if is_unsigned => ImageOp::AtomicUMin,
        Operator::ImageAtomicMin => ImageOp::AtomicSMin,
        Operator::ImageAtomicMax if is_unsigned => ImageOp::AtomicUMax,
        Operator::ImageAtomicMax => ImageOp::AtomicSMax,
        Operator::ImageAtomicAnd => ImageOp::AtomicAnd,
        Operator::ImageAtomicOr => ImageOp::AtomicOr,
        Operator::ImageAtomicXor => ImageOp::AtomicXor,
        Operator::ImageAtomicExchange => ImageOp::AtomicExchange,
        Operator::ImageAtomicCompSwap => ImageOp::AtomicCompSwap,
        _ => {
            ctx.unsupported(format!("image access {:?}", op));
            return Ok(None);
        }
    };

    let arg = |i: usize| {
        args.get(i)
            .copied()
            .ok_or_else(|| LowerError::invariant(format!("image call missing argument {}", i)))
    };
    let mut params = TextureParams::new(arg(0)?, arg(1)?);
    match image_op {
        ImageOp::Load => {}
        ImageOp::AtomicCompSwap => {
            params.compare = Some(arg(2)?);
            params.data = Some(arg(3)?);
        }
        _ => params.data = Some(arg(2)?),
    }

    let ty = convert_type(ctx, &node.ty);
    let mut b = ctx.top.builder();
    let value = b.image(sampler, image_op, params, ty);
    if let Some(value) = value {
        b.set_precision(value, precision_of(&node.ty));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cracked(op: Operator, desc: &SamplerDesc) -> CrackedTextureOp {
        crack_texture(op, desc).unwrap()
    }

    fn values(n: u32) -> Vec<Value> {
        (0..n).map(Value::new).collect()
    }

    #[test]
    fn test_offset_with_trailing_bias() {
        let desc = SamplerDesc::texture(SamplerDim::Dim2D);
        let c = cracked(Operator::TextureOffset, &desc);
        let flags = texture_flags(&c, SamplerType::Sampler2D, TextureFlags::empty(), 4);
        assert_eq!(flags.bits(), 0x182);

        let args = values(4);
        let params = texture_params(&c, flags, &args).unwrap();
        assert_eq!(params.offset, Some(args[2]));
        assert_eq!(params.bias_lod, Some(args[3]));
    }

    #[test]
    fn test_plain_sample_has_no_bias() {
        let desc = SamplerDesc::texture(SamplerDim::Dim2D);
        let c = cracked(Operator::Texture, &desc);
        let flags = texture_flags(&c, SamplerType::Sampler2D, TextureFlags::empty(), 2);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_fetch_takes_lod_per_dimension() {
        let desc = SamplerDesc::texture(SamplerDim::Dim2D);
        let c = cracked(Operator::TextureFetch, &desc);
        let flags = texture_flags(&c, SamplerType::Sampler2D, TextureFlags::empty(), 3);
        assert!(flags.contains(TextureFlags::FETCH | TextureFlags::LOD | TextureFlags::BIAS_LOD_ARG));

        let ms = SamplerDesc::texture(SamplerDim::Dim2D).multisample();
        let c = cracked(Operator::TextureFetch, &ms);
        let flags = texture_flags(&c, sampler_type(&ms), TextureFlags::empty(), 3);
        assert!(flags.contains(TextureFlags::SAMPLE_ARG));
        assert!(!flags.contains(TextureFlags::LOD));

        let rect = SamplerDesc::texture(SamplerDim::Rect);
        let c = cracked(Operator::TextureFetch, &rect);
        let flags = texture_flags(&c, sampler_type(&rect), TextureFlags::empty(), 2);
        assert_eq!(flags, TextureFlags::FETCH);
    }

    #[test]
    fn test_gather_arguments() {
        let shadow = SamplerDesc::texture(SamplerDim::Dim2D).shadow();
        let c = cracked(Operator::TextureGather, &shadow);
        let flags = texture_flags(&c, SamplerType::Sampler2D, TextureFlags::SHADOW, 3);
        assert!(flags.contains(TextureFlags::REF_Z_ARG));
        let args = values(3);
        let params = texture_params(&c, flags, &args).unwrap();
        assert_eq!(params.shadow_ref, Some(args[2]));

        let color = SamplerDesc::texture(SamplerDim::Dim2D);
        let c = cracked(Operator::TextureGather, &color);
        let flags = texture_flags(&c, SamplerType::Sampler2D, TextureFlags::empty(), 3);
        assert!(flags.contains(TextureFlags::COMPONENT_ARG));
        assert!(!flags.contains(TextureFlags::BIAS));
    }

    #[test]
    fn test_grad_arguments() {
        let desc = SamplerDesc::texture(SamplerDim::Dim2D);
        let c = cracked(Operator::TextureGradOffset, &desc);
        let flags = texture_flags(&c, SamplerType::Sampler2D, TextureFlags::empty(), 5);
        assert_eq!(flags, TextureFlags::OFFSET_ARG);
        let args = values(5);
        let params = texture_params(&c, flags, &args).unwrap();
        assert_eq!((params.grad_x, params.grad_y), (Some(args[2]), Some(args[3])));
        assert_eq!(params.offset, Some(args[4]));
    }

    #[test]
    fn test_sampler_types() {
        assert_eq!(sampler_type(&SamplerDesc::texture(SamplerDim::Cube)), SamplerType::SamplerCube);
        let ms = SamplerDesc::texture(SamplerDim::Dim2D).multisample().arrayed();
        assert_eq!(sampler_type(&ms), SamplerType::Sampler2DMS);
    }
}
