//! End-to-end lowering of small shaders.

mod lower_test;
use lower_test::LowerTest;

use glsl_to_top::{
    ast::{
        AstType, ConstValue, FlowOp, Node, Operator, Packing, SamplerDesc, SamplerDim,
        StorageQualifier,
    },
    ShaderStage,
};
use topir::{
    metadata::{MdList, TypeLayout},
    GepIndex, Opcode, SamplerType, StorageClass, TextureFlags,
};

fn local(id: u32, name: &str, ty: AstType) -> Node {
    Node::symbol(id, name, ty)
}

fn void_call(name: &str) -> Node {
    Node::call(name, AstType::void(), Vec::new(), Vec::new())
}

fn void_function(name: &str) -> Node {
    Node::function(name, AstType::void(), Vec::new(), Vec::new())
}

#[test]
fn test_aggregate_constants_become_const_globals() {
    // mat2 m = mat2(1.0, 0.0, 0.0, 1.0); float[2](0.5, 1.5); vec2(3.0, 4.0);
    let identity = Node::constant(
        AstType::mat(2, 2),
        [1.0, 0.0, 0.0, 1.0].iter().map(|v| ConstValue::Float(*v)).collect(),
    );
    let assign = Node::assign(local(1, "m", AstType::mat(2, 2)), identity);
    let array = Node::constant(
        AstType::float().array(2),
        vec![ConstValue::Float(0.5), ConstValue::Float(1.5)],
    );
    let vector = Node::constant(
        AstType::vec(2),
        vec![ConstValue::Float(3.0), ConstValue::Float(4.0)],
    );

    let test = LowerTest::main(ShaderStage::Fragment, Vec::new(), vec![assign, array, vector]);
    test.assert_clean();

    let named = test.module.find_global("m").expect("matrix constant global");
    let named = test.module.global(named);
    assert_eq!(named.storage, StorageClass::Const);
    assert!(named.initializer.is_some());

    let standalone = test.module.find_global("lconst").expect("array constant global");
    assert_eq!(test.module.global(standalone).storage, StorageClass::Const);

    let consts = test
        .module
        .globals
        .iter()
        .filter(|(_, g)| g.storage == StorageClass::Const)
        .count();
    assert_eq!(consts, 2);
    assert_eq!(test.count("main", |op| matches!(op, Opcode::GlobalAddr { .. })), 2);
}

#[test]
fn test_swizzle_assignment() {
    // vec4 v; v.xz = vec2(1.0, 2.0);
    let v = local(1, "v", AstType::vec(4));
    let value = Node::constant(
        AstType::vec(2),
        vec![ConstValue::Float(1.0), ConstValue::Float(2.0)],
    );
    let assign = Node::assign(Node::swizzle(v, &[0, 2]), value);

    let test = LowerTest::main(ShaderStage::Fragment, Vec::new(), vec![assign]);
    test.assert_clean();

    assert_eq!(test.count("main", |op| matches!(op, Opcode::Store)), 1);
    assert_eq!(test.count("main", |op| matches!(op, Opcode::Gep { .. })), 0);
    let lanes = test
        .opcodes("main")
        .into_iter()
        .find_map(|op| match op {
            Opcode::InsertLanes { lanes } => Some(lanes.clone()),
            _ => None,
        })
        .expect("swizzled store");
    assert_eq!(lanes, vec![0, 2]);

    let insert = test.position("main", |op| matches!(op, Opcode::InsertLanes { .. }));
    let store = test.position("main", |op| matches!(op, Opcode::Store));
    assert!(insert < store);
}

#[test]
fn test_uniform_block_with_hidden_member() {
    // layout(std140) uniform U { float a; hidden float b; vec3 c; } u; vec3 x = u.c;
    let mut block = AstType::block(
        "U",
        StorageQualifier::Uniform,
        vec![
            AstType::float().field("a"),
            AstType::float().field("b").hidden(),
            AstType::vec(3).field("c"),
        ],
    );
    block.qualifier.layout.packing = Packing::Std140;

    let u = || local(1, "u", block.clone());
    let member = |index: i32, ty: AstType| Node::index(Operator::IndexDirectStruct, ty, u(), index);
    let x = local(2, "x", AstType::vec(3));
    let y = local(3, "y", AstType::float());
    let body = vec![
        Node::assign(x, member(2, AstType::vec(3))),
        Node::assign(y, member(0, AstType::float())),
    ];

    let test = LowerTest::main(ShaderStage::Fragment, Vec::new(), body);

    let paths: Vec<Vec<GepIndex>> = test
        .opcodes("main")
        .into_iter()
        .filter_map(|op| match op {
            Opcode::Gep { path } => Some(path.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(paths, vec![vec![GepIndex::Const(1)], vec![GepIndex::Const(0)]]);

    let structs: Vec<_> = test
        .module
        .types
        .structs()
        .filter(|(id, _)| test.module.types.struct_name(*id) == Some("U"))
        .map(|(id, _)| id)
        .collect();
    assert_eq!(structs.len(), 1);
    assert_eq!(test.module.types.member_count(structs[0]), 2);

    let metadata = &test.module.metadata;
    let uniforms = metadata.list(MdList::Uniforms);
    assert_eq!(uniforms.len(), 1);
    assert_eq!(metadata.io_name(uniforms[0]), Some("u"));
    assert_eq!(
        metadata.layout(uniforms[0]).map(|l| l.type_layout),
        Some(TypeLayout::Std140)
    );
}

#[test]
fn test_runtime_sized_buffer_tail() {
    // layout(std430) buffer B { int n; float data[]; } b; float f = b.data[i];
    let data_ty = AstType::float()
        .array(0)
        .field("data")
        .storage(StorageQualifier::Buffer);
    let mut block = AstType::block(
        "B",
        StorageQualifier::Buffer,
        vec![AstType::int().field("n"), data_ty.clone()],
    );
    block.qualifier.layout.packing = Packing::Std430;

    let b = local(1, "b", block);
    let data = Node::index(Operator::IndexDirectStruct, data_ty, b, 1);
    let i = local(2, "i", AstType::int());
    let element = Node::binary(Operator::IndexIndirect, AstType::float(), data, i);
    let f = local(3, "f", AstType::float());

    let test = LowerTest::main(ShaderStage::Compute, Vec::new(), vec![Node::assign(f, element)]);

    let struct_ty = test
        .module
        .types
        .structs()
        .find(|(id, _)| test.module.types.struct_name(*id) == Some("B"))
        .map(|(id, _)| id)
        .expect("block struct");
    let f32_ty = test.module.types.member_type(struct_ty, Some(1));
    assert!(f32_ty.is_some_and(|t| test.module.types.is_float(t) && test.module.types.is_scalar(t)));

    let gep = test.position("main", |op| matches!(op, Opcode::Gep { path } if path == &[GepIndex::Const(1)]));
    let element_addr = test.position("main", |op| matches!(op, Opcode::ElementAddr));
    assert!(gep.is_some());
    assert!(element_addr.is_some());
    assert!(gep < element_addr);
}

#[test]
fn test_for_loop_with_continue() {
    // bool q(int); void body(int);
    // for (int i = 0; i < n; ++i) { if (q(i)) continue; body(i); }
    let q = Node::function(
        "q(i1;",
        AstType::bool(),
        vec![local(10, "a", AstType::int().storage(StorageQualifier::In))],
        vec![Node::branch(FlowOp::Return, Some(Node::bool(true)))],
    );
    let body_fn = Node::function(
        "body(i1;",
        AstType::void(),
        vec![local(11, "a", AstType::int().storage(StorageQualifier::In))],
        Vec::new(),
    );

    let i = || local(1, "i", AstType::int());
    let n = local(2, "n", AstType::int().storage(StorageQualifier::Uniform));
    let init = Node::assign(i(), Node::int(0));
    let test_expr = Node::binary(Operator::LessThan, AstType::bool(), i(), n);
    let step = Node::unary(Operator::PreIncrement, AstType::int(), i());
    let call = |name: &str, ret: AstType| Node::call(name, ret, vec![i()], vec![StorageQualifier::In]);
    let skip = Node::selection(
        AstType::void(),
        call("q(i1;", AstType::bool()),
        Some(Node::sequence(vec![Node::branch(FlowOp::Continue, None)])),
        None,
    );
    let loop_body = Node::sequence(vec![skip, call("body(i1;", AstType::void())]);
    let for_loop = Node::loop_(Some(test_expr), Some(loop_body), Some(step), true);

    let test = LowerTest::main(ShaderStage::Fragment, vec![q, body_fn], vec![init, for_loop]);
    test.assert_clean();

    // The step runs on the continue path and at the end of the body.
    let increments = test.count("main", |op| matches!(op, Opcode::Binary(topir::BinaryOp::Add)));
    assert_eq!(increments, 2);

    let header = test.blocks_named("main", "loop-header")[0];
    let merge = test.blocks_named("main", "loop-merge")[0];
    let back_edges = test.count("main", |op| matches!(op, Opcode::Jump { dest } if *dest == header));
    // Entry into the loop, the continue, and the fall-through.
    assert_eq!(back_edges, 3);
    match test.terminator("main", header) {
        Opcode::Br { else_dest, .. } => assert_eq!(*else_dest, merge),
        other => panic!("loop header ends in {:?}", other),
    }

    // The continue jumps straight after the step.
    let then = test.blocks_named("main", "then")[0];
    let ops = test.block_opcodes("main", then);
    assert!(matches!(ops[ops.len() - 2], Opcode::Store));
    assert!(matches!(ops[ops.len() - 1], Opcode::Jump { dest } if *dest == header));
}

#[test]
fn test_switch_fallthrough() {
    // switch (k) { case 0: a(); case 1: b(); break; default: c(); }
    let k = local(1, "k", AstType::int());
    let switch = Node::switch(
        k,
        vec![
            Node::case(0),
            void_call("a("),
            Node::case(1),
            void_call("b("),
            Node::branch(FlowOp::Break, None),
            Node::default_label(),
            void_call("c("),
        ],
    );
    let globals = vec![void_function("a("), void_function("b("), void_function("c(")];
    let test = LowerTest::main(ShaderStage::Fragment, globals, vec![switch]);
    test.assert_clean();

    let segments = test.blocks_named("main", "switch-segment");
    assert_eq!(segments.len(), 4);
    let merge = test.blocks_named("main", "switch-merge")[0];

    let switch_op = test
        .opcodes("main")
        .into_iter()
        .find(|op| matches!(op, Opcode::Switch { .. }))
        .cloned()
        .expect("switch terminator");
    match switch_op {
        Opcode::Switch { cases, default } => {
            assert_eq!(cases, vec![(0, segments[0]), (1, segments[1])]);
            assert_eq!(default, segments[3]);
        }
        _ => unreachable!(),
    }

    // a() falls into b(), which falls into the break.
    assert!(matches!(test.terminator("main", segments[0]), Opcode::Jump { dest } if *dest == segments[1]));
    assert!(matches!(test.terminator("main", segments[1]), Opcode::Jump { dest } if *dest == segments[2]));
    assert!(matches!(test.terminator("main", segments[2]), Opcode::Jump { dest } if *dest == merge));
    assert!(matches!(test.terminator("main", segments[3]), Opcode::Jump { dest } if *dest == merge));

    let callee = |block| {
        test.block_opcodes("main", block)
            .into_iter()
            .find_map(|op| match op {
                Opcode::Call { callee } => Some(test.module.function(*callee).name.clone()),
                _ => None,
            })
    };
    assert_eq!(callee(segments[0]).as_deref(), Some("a("));
    assert_eq!(callee(segments[1]).as_deref(), Some("b("));
    assert_eq!(callee(segments[3]).as_deref(), Some("c("));
}

#[test]
fn test_switch_trailing_label_gets_empty_segment() {
    // switch (k) { case 0: a(); default: }
    let k = local(1, "k", AstType::int());
    let switch = Node::switch(k, vec![Node::case(0), void_call("a("), Node::default_label()]);
    let test = LowerTest::main(ShaderStage::Fragment, vec![void_function("a(")], vec![switch]);

    let segments = test.blocks_named("main", "switch-segment");
    assert_eq!(segments.len(), 2);
    let merge = test.blocks_named("main", "switch-merge")[0];
    assert!(matches!(test.terminator("main", segments[1]), Opcode::Jump { dest } if *dest == merge));
}

#[test]
fn test_texture_with_offset_and_bias() {
    // texture(s, uv, offset, bias) on a sampler2D
    let sampler = AstType::sampler(SamplerDesc::texture(SamplerDim::Dim2D)).storage(StorageQualifier::Uniform);
    let args = vec![
        local(1, "s", sampler),
        local(2, "uv", AstType::vec(2)),
        local(3, "off", AstType::ivec(2)),
        local(4, "bias", AstType::float()),
    ];
    let sample = Node::aggregate(Operator::TextureOffset, AstType::vec(4), args);
    let color = local(5, "color", AstType::vec(4));

    let test = LowerTest::main(ShaderStage::Fragment, Vec::new(), vec![Node::assign(color, sample)]);

    let textures: Vec<_> = test
        .insts("main")
        .into_iter()
        .filter_map(|d| match &d.opcode {
            Opcode::Texture { sampler, flags, params } => Some((*sampler, *flags, *params)),
            _ => None,
        })
        .collect();
    assert_eq!(textures.len(), 1);
    let (sampler, flags, params) = textures[0];
    assert_eq!(sampler, SamplerType::Sampler2D);
    assert_eq!(
        flags,
        TextureFlags::OFFSET_ARG | TextureFlags::BIAS | TextureFlags::BIAS_LOD_ARG
    );
    assert!(params.offset.is_some());
    assert!(params.bias_lod.is_some());
    assert_ne!(params.offset, params.bias_lod);
    assert_eq!(params.grad_x, None);

    assert_eq!(test.module.metadata.list(MdList::Uniforms).len(), 1);
}
