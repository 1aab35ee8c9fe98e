//! Integration tests for building, verifying and printing TopIR.

use topir::{
    verify, Cursor, FunctionBuilder, GepIndex, GepStep, Module, Opcode, Signature,
};

#[test]
fn test_allocas_hoist_to_entry() {
    let mut module = Module::new();
    let void = module.types.void();
    let f32 = module.types.f32();
    let func = module.declare_function("f", Signature::new(vec![], void));
    let entry = module.function_mut(func).create_block("entry");
    let mut cursor = Cursor { func, block: entry };
    let mut b = FunctionBuilder::new(&mut module, &mut cursor);
    let body = b.create_block("body");
    b.jump(body);
    b.switch_to_block(body);
    let x = b.alloca("x", f32);
    let one = b.fconst(1.0);
    b.store(one, x);
    b.return_(None);

    let function = module.function(func);
    assert!(verify(function).is_ok());
    let first = function.block_insts(entry)[0];
    assert!(matches!(
        function.dfg.insts[first].opcode,
        Opcode::Alloca { ref name, .. } if name == "x"
    ));
}

#[test]
fn test_emitting_after_terminator_opens_block() {
    let mut module = Module::new();
    let void = module.types.void();
    let func = module.declare_function("f", Signature::new(vec![], void));
    let entry = module.function_mut(func).create_block("entry");
    let mut cursor = Cursor { func, block: entry };
    let mut b = FunctionBuilder::new(&mut module, &mut cursor);
    b.return_(None);
    b.iconst(7);
    b.return_(None);

    let function = module.function(func);
    assert_eq!(function.block_count(), 2);
    assert!(function.block_by_name("unreachable").is_some());
    assert!(verify(function).is_ok());
}

#[test]
fn test_struct_gep_path() {
    let mut module = Module::new();
    let void = module.types.void();
    let f32 = module.types.f32();
    let vec4 = module.types.vector(f32, 4);
    let s = module.types.declare_struct("S");
    module.types.set_struct_body(s, vec![f32, vec4]).unwrap();
    let func = module.declare_function("f", Signature::new(vec![], void));
    let entry = module.function_mut(func).create_block("entry");
    let mut cursor = Cursor { func, block: entry };
    let mut b = FunctionBuilder::new(&mut module, &mut cursor);
    let var = b.alloca("s", s);
    let member = b.gep(var, &[GepStep::Const(1)]).unwrap();
    let loaded = b.load(member).unwrap();
    assert_eq!(b.value_type(loaded), vec4);
    b.return_(None);

    let function = module.function(func);
    let geps: Vec<_> = function
        .insts()
        .filter_map(|inst| match &function.dfg.insts[inst].opcode {
            Opcode::Gep { path } => Some(path.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(geps, vec![vec![GepIndex::Const(1)]]);
    assert!(verify(function).is_ok());
}

#[test]
fn test_gep_past_struct_end_is_an_error() {
    let mut module = Module::new();
    let void = module.types.void();
    let f32 = module.types.f32();
    let s = module.types.declare_struct("S");
    module.types.set_struct_body(s, vec![f32]).unwrap();
    let func = module.declare_function("f", Signature::new(vec![], void));
    let entry = module.function_mut(func).create_block("entry");
    let mut cursor = Cursor { func, block: entry };
    let mut b = FunctionBuilder::new(&mut module, &mut cursor);
    let var = b.alloca("s", s);
    assert!(b.gep(var, &[GepStep::Const(3)]).is_err());
}

#[test]
fn test_module_text_lists_functions() {
    let mut module = Module::new();
    let void = module.types.void();
    for name in ["a", "b"] {
        let func = module.declare_function(name, Signature::new(vec![], void));
        let entry = module.function_mut(func).create_block("entry");
        let mut cursor = Cursor { func, block: entry };
        FunctionBuilder::new(&mut module, &mut cursor).return_(None);
    }
    let text = module.to_string();
    let a = text.find("function %a(").unwrap();
    let b = text.find("function %b(").unwrap();
    assert!(a < b);
}
