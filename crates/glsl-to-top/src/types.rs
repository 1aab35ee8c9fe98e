//! AST type to TopIR type translation.
//!
//! Struct and block types are materialized once per member list; blocks
//! additionally record how AST member indices map onto the IR layout
//! once hidden members are dropped.


use alloc::{format, rc::Rc, string::ToString, vec::Vec};

use topir::TypeId;

use crate::{
    ast::{AstType, BasicType, StorageQualifier, TypeList},
    context::LowerContext,
};

/// Size given to implicitly-sized arrays that cannot stay unsized.
pub const UNKNOWN_ARRAY_SIZE: u32 = 8;

/// Cache key of a struct or block: the address of its member list.
pub(crate) fn type_list_key(list: &TypeList) -> usize {
    Rc::as_ptr(list) as usize
}

/// Translate a front-end type.
pub fn convert_type(ctx: &mut LowerContext<'_>, ty: &AstType) -> TypeId {
    let mut ir = match ty.basic {
        BasicType::Void => ctx.top.module.types.void(),
        BasicType::Float => ctx.top.module.types.f32(),
        BasicType::Double => {
            ctx.unsupported("basic type: double");
            ctx.top.module.types.f32()
        }
        BasicType::Bool => ctx.top.module.types.bool(),
        BasicType::Int | BasicType::AtomicUint | BasicType::Sampler => ctx.top.module.types.i32(),
        BasicType::Uint => ctx.top.module.types.u32(),
        BasicType::Struct | BasicType::Block => convert_struct(ctx, ty),
    };

    let types = &mut ctx.top.module.types;
    if ty.is_matrix() {
        ir = types.matrix(ty.matrix_cols, ty.matrix_rows);
    } else if ty.vector_size > 1 {
        ir = types.vector(ir, ty.vector_size);
    }

    let Some(sizes) = ty.array_sizes.as_deref() else {
        return ir;
    };
    if ty.is_unsized_array() {
        if is_runtime_array(ty) {
            // The element type stands for the whole runtime-sized tail.
            return ir;
        }
        ctx.unsupported("implicitly-sized array");
    }
    let types = &mut ctx.top.module.types;
    for (dim, size) in sizes.iter().enumerate().rev() {
        let len = if *size == 0 && dim == 0 {
            UNKNOWN_ARRAY_SIZE
        } else {
            *size
        };
        ir = types.array(ir, len);
    }
    ir
}

/// An unsized array living in buffer storage: the open tail of a buffer
/// block.
pub fn is_runtime_array(ty: &AstType) -> bool {
    ty.is_unsized_array() && ty.qualifier.storage == StorageQualifier::Buffer
}

fn convert_struct(ctx: &mut LowerContext<'_>, ty: &AstType) -> TypeId {
    let Some(list) = ty.struct_type.as_ref() else {
        ctx.diags.invariant(format!("struct type {} without members", ty.type_name));
        return ctx.top.module.types.void();
    };
    let key = type_list_key(list);
    if let Some(cached) = ctx.struct_types.get(&key) {
        return *cached;
    }

    let id = ctx.top.module.types.declare_struct(ty.type_name.as_str());
    ctx.struct_types.insert(key, id);

    let is_block = ty.basic == BasicType::Block;
    let buffer_block = is_block && ty.qualifier.storage == StorageQualifier::Buffer;
    let mut remap = Vec::with_capacity(list.len());
    let mut fields = Vec::with_capacity(list.len());
    for member in list.iter() {
        if member.hidden {
            remap.push(None);
            continue;
        }
        remap.push(Some(fields.len() as u32));
        let field = if buffer_block && member.is_unsized_array() && !is_runtime_array(member) {
            let mut member = member.clone();
            member.qualifier.storage = StorageQualifier::Buffer;
            convert_type(ctx, &member)
        } else {
            convert_type(ctx, member)
        };
        fields.push(field);
    }
    if is_block {
        ctx.remaps.insert(key, remap);
    }

    log::debug!(
        "materialized struct %{} with {} of {} members",
        ty.type_name,
        fields.len(),
        list.len()
    );
    if let Err(err) = ctx.top.module.types.set_struct_body(id, fields) {
        ctx.diags.invariant(err.to_string());
    }
    id
}

/// IR member index of AST member `index` of a block.
///
/// Plain structs keep their indices. `None` when the block was never
/// converted or the member is hidden.
pub fn remap_member(ctx: &LowerContext<'_>, ty: &AstType, index: u32) -> Option<u32> {
    if ty.basic != BasicType::Block {
        return Some(index);
    }
    let list = ty.struct_type.as_ref()?;
    let remap = ctx.remaps.get(&type_list_key(list))?;
    remap.get(index as usize).copied().flatten()
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use topir::TypeData;

    use super::*;
    use crate::{
        ast::{Node, SamplerDesc, SamplerDim, TranslationUnit},
        config::LowerOptions,
        stage::ShaderStage,
    };

    fn context() -> LowerContext<'static> {
        let unit = TranslationUnit::new(ShaderStage::Fragment, Node::sequence(Vec::new()));
        LowerContext::new(&unit, LowerOptions::default())
    }

    #[test]
    fn test_shapes() {
        let mut ctx = context();
        let vec3 = convert_type(&mut ctx, &AstType::vec(3));
        let mat = convert_type(&mut ctx, &AstType::mat(4, 3));
        let arr = convert_type(&mut ctx, &AstType::ivec(2).array(3).array(5));

        let types = &mut ctx.top.module.types;
        let f32 = types.f32();
        assert_eq!(vec3, types.vector(f32, 3));
        assert_eq!(mat, types.matrix(4, 3));
        let i32 = types.i32();
        let ivec2 = types.vector(i32, 2);
        let inner = types.array(ivec2, 3);
        assert_eq!(arr, types.array(inner, 5));
    }

    #[test]
    fn test_opaque_types_are_int() {
        let mut ctx = context();
        let sampler = AstType::sampler(SamplerDesc::texture(SamplerDim::Dim2D));
        let s = convert_type(&mut ctx, &sampler);
        let a = convert_type(&mut ctx, &AstType::atomic_uint());
        let i32 = ctx.top.module.types.i32();
        assert_eq!((s, a), (i32, i32));
    }

    #[test]
    fn test_double_is_unsupported() {
        let mut ctx = context();
        let ty = convert_type(&mut ctx, &AstType::vector(BasicType::Double, 2));
        let types = &mut ctx.top.module.types;
        let f32 = types.f32();
        assert_eq!(ty, types.vector(f32, 2));
        assert_eq!(ctx.diags.entries().len(), 1);
        assert!(!ctx.diags.is_poisoned());
    }

    #[test]
    fn test_struct_cached_per_member_list() {
        let mut ctx = context();
        let s = AstType::structure("S", vec![AstType::float().field("a")]);
        let first = convert_type(&mut ctx, &s);
        let again = convert_type(&mut ctx, &s.clone().array(2));
        assert!(matches!(
            ctx.top.module.types.data(again),
            TypeData::Array { elem, len: 2 } if *elem == first
        ));
        // Same name, different member list: a distinct struct.
        let other = convert_type(&mut ctx, &AstType::structure("S", vec![AstType::float()]));
        assert_ne!(first, other);
        assert_eq!(ctx.top.module.types.structs().count(), 2);
    }

    #[test]
    fn test_block_remap_skips_hidden() {
        let mut ctx = context();
        let block = AstType::block(
            "U",
            StorageQualifier::Uniform,
            vec![
                AstType::float().field("a"),
                AstType::float().field("b").hidden(),
                AstType::vec(3).field("c"),
            ],
        );
        let id = convert_type(&mut ctx, &block);
        assert_eq!(ctx.top.module.types.member_count(id), 2);
        assert_eq!(remap_member(&ctx, &block, 0), Some(0));
        assert_eq!(remap_member(&ctx, &block, 1), None);
        assert_eq!(remap_member(&ctx, &block, 2), Some(1));
    }

    #[test]
    fn test_buffer_tail_is_element_type() {
        let mut ctx = context();
        let block = AstType::block(
            "B",
            StorageQualifier::Buffer,
            vec![AstType::int().field("n"), AstType::float().array(0).field("data")],
        );
        let id = convert_type(&mut ctx, &block);
        let types = &mut ctx.top.module.types;
        let f32 = types.f32();
        assert_eq!(types.member_type(id, Some(1)), Some(f32));
        assert!(ctx.diags.is_empty());
    }

    #[test]
    fn test_implicit_array_gets_placeholder_size() {
        let mut ctx = context();
        let ty = convert_type(&mut ctx, &AstType::float().array(0));
        assert!(matches!(
            ctx.top.module.types.data(ty),
            TypeData::Array { len: UNKNOWN_ARRAY_SIZE, .. }
        ));
        assert_eq!(ctx.diags.entries().len(), 1);
    }
}
