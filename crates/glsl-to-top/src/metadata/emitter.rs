//! Metadata node construction for uniforms, buffers, inputs and outputs.

use alloc::{string::{String, ToString}, vec::Vec};

use topir::{
    metadata::{
        AggregateDescriptor, IoNode, LayoutRecord, MdList, MdNodeData, SamplerDescriptor,
        TypeLayout, TypeTreeIo,
    },
    GlobalVar, MdNode, TypeData, TypeId,
};

use crate::{
    ast::{AstType, BasicType},
    context::LowerContext,
    metadata::{
        binding, builtin, interpolation, io_category, is_uniform_category, md_name,
        memory_qualifiers, offset, precision_of, sampler_base_type, sampler_dim, sampler_kind,
        slot_location, type_layout,
    },
    types::convert_type,
};

fn layout_record(ctx: &mut LowerContext<'_>, ty: &AstType, inherit: &mut TypeLayout) -> LayoutRecord {
    let mut layout = LayoutRecord::new(type_layout(ty, inherit, &mut ctx.diags), precision_of(ty));
    layout.location = slot_location(ty);
    layout.builtin = builtin(ty);
    layout.binding = binding(ty);
    layout.qualifiers = memory_qualifiers(ty);
    layout.offset = offset(ty, ctx.options.use_uniform_offsets);
    layout
}

/// Sampler descriptor of a sampler-typed variable, `None` for anything
/// else.
///
/// The proxy names the variable's own IR type when one is given, and the
/// converted sampler type otherwise.
pub fn make_md_sampler(
    ctx: &mut LowerContext<'_>,
    ty: &AstType,
    proxy: Option<(TypeId, &str)>,
) -> Option<MdNode> {
    let desc = ty.sampler.filter(|_| ty.basic == BasicType::Sampler)?;
    let proxy = match proxy {
        Some((proxy_ty, name)) => ctx.top.module.make_type_proxy(proxy_ty, name),
        None => {
            let sampler_ty = convert_type(ctx, ty);
            ctx.top.module.make_type_proxy(sampler_ty, "sampler")
        }
    };
    let base_type = sampler_base_type(desc.basic, &mut ctx.diags);
    let node = MdNodeData::Sampler(SamplerDescriptor {
        kind: sampler_kind(ty),
        dim: sampler_dim(ty),
        arrayed: desc.arrayed,
        shadow: desc.shadow,
        base_type,
        proxy,
    });
    Some(ctx.top.module.metadata.add(node))
}

/// Recursive descriptor of a struct or block type.
pub fn declare_md_type(ctx: &mut LowerContext<'_>, ty: &AstType, mut inherit: TypeLayout) -> MdNode {
    let mut layout = layout_record(ctx, ty, &mut inherit);
    layout.sampler = make_md_sampler(ctx, ty, None);

    let mut members = Vec::new();
    for member in ty.members().iter().filter(|m| !m.hidden) {
        let node = declare_md_type(ctx, member, inherit);
        members.push((member.field_name.clone(), node));
    }

    let type_name = if ty.is_struct() {
        ty.type_name.clone()
    } else {
        String::new()
    };
    ctx.top.module.metadata.add(MdNodeData::Aggregate(AggregateDescriptor {
        type_name,
        layout,
        members,
    }))
}

/// Struct type under the pointers and arrays of `ty`.
fn struct_under(ctx: &LowerContext<'_>, ty: TypeId) -> TypeId {
    let types = &ctx.top.module.types;
    let mut ty = ty;
    loop {
        ty = match types.data(ty) {
            TypeData::Pointer { pointee } => *pointee,
            TypeData::Array { elem, .. } => *elem,
            _ => return ty,
        };
    }
}

/// I/O node for `instance_name` of type `ty`, stored in a variable of IR
/// type `proxy_ty` named `proxy_name`. Added to `list` when one is given.
#[allow(clippy::too_many_arguments)]
pub fn declare_md_io(
    ctx: &mut LowerContext<'_>,
    instance_name: &str,
    ty: &AstType,
    proxy_ty: TypeId,
    proxy_name: &str,
    slot: i32,
    mut inherit: TypeLayout,
    list: Option<MdList>,
) -> MdNode {
    let category = io_category(ty);
    let mut layout = layout_record(ctx, ty, &mut inherit);
    if !is_uniform_category(category) {
        layout.location = slot;
        layout.interpolation = Some(interpolation(ty));
    }
    layout.sampler = make_md_sampler(ctx, ty, Some((proxy_ty, proxy_name)));

    let node = if ctx.options.use_single_type_tree {
        let mut members = Vec::new();
        let mut type_name = String::new();
        if ty.is_struct() {
            type_name = ty.type_name.clone();
            let struct_ty = struct_under(ctx, proxy_ty);
            let child_slot = slot_location(ty);
            let fields = ty.members().iter().filter(|m| !m.hidden);
            for (index, member) in fields.enumerate() {
                let member_ty = ctx
                    .top
                    .module
                    .types
                    .member_type(struct_ty, Some(index as u32))
                    .unwrap_or(struct_ty);
                let name = member.field_name.as_str();
                members.push(declare_md_io(
                    ctx, name, member, member_ty, name, child_slot, inherit, None,
                ));
            }
        }
        let proxy = ctx.top.module.make_type_proxy(proxy_ty, proxy_name);
        MdNodeData::TypeTree(TypeTreeIo {
            name: instance_name.to_string(),
            type_name,
            category,
            proxy: Some(proxy),
            layout,
            members,
        })
    } else {
        let aggregate = ty.is_struct().then(|| declare_md_type(ctx, ty, inherit));
        let proxy = ctx.top.module.make_type_proxy(proxy_ty, proxy_name);
        MdNodeData::Io(IoNode {
            name: instance_name.to_string(),
            category,
            proxy: Some(proxy),
            layout,
            aggregate,
        })
    };

    let md = ctx.top.module.metadata.add(node);
    if let Some(list) = list {
        ctx.top.module.metadata.add_to_list(list, md);
    }
    md
}

/// Uniform or buffer node, one per storage name.
pub fn declare_uniform_metadata(
    ctx: &mut LowerContext<'_>,
    name: &str,
    ty: &AstType,
    storage_ty: TypeId,
    storage_name: &str,
) -> MdNode {
    if let Some(md) = ctx.uniform_md.get(storage_name) {
        return *md;
    }
    let md = declare_md_io(
        ctx,
        md_name(name),
        ty,
        storage_ty,
        storage_name,
        0,
        TypeLayout::None,
        Some(MdList::Uniforms),
    );
    if ctx.linkage_only {
        ctx.top.module.metadata.add_to_list(MdList::NoStaticUse, md);
    }
    ctx.uniform_md.insert(storage_name.to_string(), md);
    md
}

/// Output node for `global`, registered as an output shadow that the
/// entry point copies out.
pub fn set_output_metadata(
    ctx: &mut LowerContext<'_>,
    name: &str,
    ty: &AstType,
    global: GlobalVar,
    slot: i32,
    num_slots: u32,
) -> MdNode {
    let data = ctx.top.module.global(global);
    let (global_ty, global_name) = (data.ty, data.name.clone());
    let md = declare_md_io(
        ctx,
        md_name(name),
        ty,
        global_ty,
        &global_name,
        slot,
        TypeLayout::None,
        Some(MdList::Outputs),
    );
    let metadata = &mut ctx.top.module.metadata;
    if ty.qualifier.invariant {
        metadata.add_to_list(MdList::Invariant, md);
    }
    if ctx.linkage_only {
        metadata.add_to_list(MdList::NoStaticUse, md);
    }
    ctx.top.add_output(global, Some(md), slot, num_slots);
    md
}

/// Input node for `slot`; every read of the slot shares it.
pub fn make_input_metadata(
    ctx: &mut LowerContext<'_>,
    name: &str,
    ty: &AstType,
    proxy_ty: TypeId,
    proxy_name: &str,
    slot: i32,
) -> MdNode {
    if let Some(md) = ctx.input_md.get(&slot) {
        log::debug!("input slot {} already described, reusing its node", slot);
        return *md;
    }
    let md = declare_md_io(
        ctx,
        md_name(name),
        ty,
        proxy_ty,
        proxy_name,
        slot,
        TypeLayout::None,
        Some(MdList::Inputs),
    );
    if ctx.linkage_only {
        ctx.top.module.metadata.add_to_list(MdList::NoStaticUse, md);
    }
    ctx.input_md.insert(slot, md);
    md
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use topir::{
        metadata::{IoCategory, SamplerDim, SamplerKind},
        StorageClass,
    };

    use super::*;
    use crate::{
        ast::{
            Node, Packing, SamplerDesc, SamplerDim as AstSamplerDim, StorageQualifier,
            TranslationUnit,
        },
        config::LowerOptions,
        stage::ShaderStage,
    };

    fn context(options: LowerOptions) -> LowerContext<'static> {
        let unit = TranslationUnit::new(ShaderStage::Fragment, Node::sequence(Vec::new()));
        LowerContext::new(&unit, options)
    }

    fn uniform_block() -> AstType {
        let mut block = AstType::block(
            "Light",
            StorageQualifier::Uniform,
            vec![
                AstType::vec(4).field("color"),
                AstType::float().field("pad").hidden(),
                AstType::mat(4, 4).field("xform"),
            ],
        );
        block.qualifier.layout.packing = Packing::Std140;
        block
    }

    #[test]
    fn test_uniform_deduplicated_by_storage_name() {
        let mut ctx = context(LowerOptions::default());
        let ty = AstType::vec(4).storage(StorageQualifier::Uniform);
        let ir = convert_type(&mut ctx, &ty);
        let first = declare_uniform_metadata(&mut ctx, "tint", &ty, ir, "tint");
        let second = declare_uniform_metadata(&mut ctx, "tint", &ty, ir, "tint");
        assert_eq!(first, second);
        assert_eq!(ctx.top.module.metadata.list(MdList::Uniforms), &[first]);

        let MdNodeData::Io(io) = ctx.top.module.metadata.node(first) else {
            panic!("expected an I/O node");
        };
        assert_eq!(io.category, IoCategory::DefaultUniform);
        assert_eq!(io.layout.interpolation, None);
        let proxy = io.proxy.expect("uniform without proxy");
        assert_eq!(ctx.top.module.proxy(proxy).name, "tint_typeProxy");
    }

    #[test]
    fn test_block_aggregate_skips_hidden_members() {
        let mut ctx = context(LowerOptions::default());
        let block = uniform_block();
        let ir = convert_type(&mut ctx, &block);
        let md = declare_uniform_metadata(&mut ctx, "anon@0", &block, ir, "anon@0");

        let metadata = &ctx.top.module.metadata;
        let MdNodeData::Io(io) = metadata.node(md) else {
            panic!("expected an I/O node");
        };
        assert_eq!(io.name, "");
        assert_eq!(io.category, IoCategory::UniformBlockMember);
        assert_eq!(io.layout.type_layout, TypeLayout::Std140);
        let aggregate = io.aggregate.expect("block without descriptor");
        let MdNodeData::Aggregate(desc) = metadata.node(aggregate) else {
            panic!("expected an aggregate descriptor");
        };
        assert_eq!(desc.type_name, "Light");
        let names: Vec<&str> = desc.members.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["color", "xform"]);
        let xform = metadata.layout(desc.members[1].1).map(|l| l.type_layout);
        assert_eq!(xform, Some(TypeLayout::ColMajorMatrix));
    }

    #[test]
    fn test_single_type_tree_children() {
        let options = LowerOptions {
            use_single_type_tree: true,
            ..LowerOptions::default()
        };
        let mut ctx = context(options);
        let block = uniform_block();
        let ir = convert_type(&mut ctx, &block);
        let md = declare_uniform_metadata(&mut ctx, "light", &block, ir, "light");

        let metadata = &ctx.top.module.metadata;
        let MdNodeData::TypeTree(tree) = metadata.node(md) else {
            panic!("expected a type-tree node");
        };
        assert_eq!(tree.type_name, "Light");
        assert_eq!(tree.members.len(), 2);
        assert_eq!(metadata.io_name(tree.members[1]), Some("xform"));
        assert_eq!(metadata.list(MdList::Uniforms), &[md]);
    }

    #[test]
    fn test_input_shared_per_slot() {
        let mut ctx = context(LowerOptions::default());
        let ty = AstType::vec(2).storage(StorageQualifier::VaryingIn);
        let ir = convert_type(&mut ctx, &ty);
        let a = make_input_metadata(&mut ctx, "uv", &ty, ir, "uv", 3);
        let b = make_input_metadata(&mut ctx, "uv", &ty, ir, "uv", 3);
        assert_eq!(a, b);
        let layout = ctx.top.module.metadata.layout(a).cloned().expect("layout");
        assert_eq!(layout.location, 3);
        assert!(layout.interpolation.is_some());
    }

    #[test]
    fn test_output_registers_shadow() {
        let mut ctx = context(LowerOptions::default());
        let mut ty = AstType::vec(4).storage(StorageQualifier::VaryingOut);
        ty.qualifier.invariant = true;
        let ir = convert_type(&mut ctx, &ty);
        let global = ctx.top.module.add_global("color", ir, StorageClass::Output, None);
        let md = set_output_metadata(&mut ctx, "color", &ty, global, 0, 1);

        let metadata = &ctx.top.module.metadata;
        assert_eq!(metadata.list(MdList::Outputs), &[md]);
        assert_eq!(metadata.list(MdList::Invariant), &[md]);
        assert_eq!(ctx.top.outputs().len(), 1);
        assert_eq!(ctx.top.outputs()[0].md, Some(md));
    }

    #[test]
    fn test_sampler_descriptor() {
        let mut ctx = context(LowerOptions::default());
        let ty = AstType::sampler(SamplerDesc::texture(AstSamplerDim::Cube).shadow())
            .storage(StorageQualifier::Uniform);
        let ir = convert_type(&mut ctx, &ty);
        let md = declare_uniform_metadata(&mut ctx, "shadowMap", &ty, ir, "shadowMap");

        let metadata = &ctx.top.module.metadata;
        let sampler = metadata
            .layout(md)
            .and_then(|l| l.sampler)
            .expect("sampler descriptor");
        let MdNodeData::Sampler(desc) = metadata.node(sampler) else {
            panic!("expected a sampler node");
        };
        assert_eq!(desc.kind, SamplerKind::Texture);
        assert_eq!(desc.dim, SamplerDim::Cube);
        assert!(desc.shadow);
        assert_eq!(ctx.top.module.proxy(desc.proxy).name, "shadowMap_typeProxy");
        assert!(make_md_sampler(&mut ctx, &AstType::float(), None).is_none());
    }
}
