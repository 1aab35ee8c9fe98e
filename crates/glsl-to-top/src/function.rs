//! User functions: declaration, entry and calls.
//!
//! Every formal parameter is a pointer. Callers allocate a local per
//! parameter, copy `in` arguments into it before the call and copy `out`
//! arguments back afterwards.

use alloc::{format, vec::Vec};

use topir::{Signature, Value};

use crate::{
    ast::{BasicType, Node, NodeKind, Operator, StorageQualifier},
    constants::build_constant,
    context::{LowerContext, Storage},
    error::{LowerError, LowerResult},
    lower::lower_node,
    metadata::precision_of,
    types::convert_type,
};

/// The shader entry point, by its front-end name.
pub fn is_entry_point(name: &str) -> bool {
    name == "main("
}

fn parameters(sequence: &[Node]) -> &[Node] {
    match sequence.first().map(|params| &params.kind) {
        Some(NodeKind::Aggregate {
            op: Operator::Parameters,
            sequence,
            ..
        }) => sequence,
        _ => &[],
    }
}

/// Declare every non-entry function of `statements` so that calls can
/// be lowered before the callee's body.
pub fn make_functions<'a>(ctx: &mut LowerContext<'a>, statements: &'a [Node]) -> LowerResult<()> {
    for statement in statements {
        let NodeKind::Aggregate {
            op: Operator::Function,
            sequence,
            name,
            ..
        } = &statement.kind
        else {
            continue;
        };
        if is_entry_point(name) {
            continue;
        }

        let params = parameters(sequence);
        let mut param_types = Vec::with_capacity(params.len());
        for param in params {
            let ty = convert_type(ctx, &param.ty);
            param_types.push(ctx.top.module.types.pointer(ty));
        }
        let ret = convert_type(ctx, &statement.ty);

        let module = &mut ctx.top.module;
        let func = module.declare_function(name.as_str(), Signature::new(param_types, ret));
        let function = module.function_mut(func);
        function.attrs.always_inline = true;
        function.create_block("entry");

        let values = function.params.clone();
        for (param, value) in params.iter().zip(values) {
            match &param.kind {
                NodeKind::Symbol { id, .. } => {
                    ctx.symbols.insert(*id, Storage::Local(value));
                }
                _ => ctx.diags.invariant(format!("parameter of {} is not a symbol", name)),
            }
        }
        log::debug!("declared function {} with {} parameters", name, params.len());
        ctx.functions.insert(name.clone(), func);
    }
    Ok(())
}

/// Move the cursor to the entry block of the declared function `name`.
pub fn enter_function(ctx: &mut LowerContext<'_>, name: &str) -> LowerResult<()> {
    let func = *ctx
        .functions
        .get(name)
        .ok_or_else(|| LowerError::invariant(format!("function {} was never declared", name)))?;
    let entry = ctx
        .top
        .module
        .function(func)
        .entry_block()
        .ok_or_else(|| LowerError::invariant(format!("function {} has no entry block", name)))?;
    ctx.top.set_insert_point(func, entry);
    Ok(())
}

/// Lower a call of the user function `name`.
///
/// A call of an unknown function is reported and yields a zero value.
pub fn lower_function_call<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    name: &str,
    args: &'a [Node],
    qualifiers: &[StorageQualifier],
) -> LowerResult<()> {
    let Some(func) = ctx.functions.get(name).copied() else {
        ctx.unsupported(format!("call of undefined function {}", name));
        ctx.top.clear_chain();
        if node.ty.basic == BasicType::Void {
            return Ok(());
        }
        let zero = build_constant(ctx, &node.ty, &[], &mut 0);
        let value = ctx.top.builder().constant(zero);
        ctx.set_rvalue(value);
        return Ok(());
    };

    let param_types = ctx.top.module.function(func).signature.params.clone();
    if param_types.len() != args.len() {
        return Err(LowerError::invariant(format!(
            "{} takes {} arguments, called with {}",
            name,
            param_types.len(),
            args.len()
        )));
    }
    let mut spaces: Vec<Value> = Vec::with_capacity(param_types.len());
    for ty in param_types {
        let pointee = ctx
            .top
            .module
            .types
            .pointee(ty)
            .ok_or_else(|| LowerError::invariant(format!("parameter of {} is not a pointer", name)))?;
        spaces.push(ctx.top.builder().alloca("param", pointee));
    }

    // Copy in, remembering where copied-out values go.
    let mut copy_out = Vec::new();
    for (index, (arg, space)) in args.iter().zip(&spaces).enumerate() {
        let qualifier = qualifiers.get(index).copied().unwrap_or(StorageQualifier::In);
        ctx.top.clear_chain();
        lower_node(ctx, arg)?;
        if matches!(qualifier, StorageQualifier::Out | StorageQualifier::InOut) {
            copy_out.push((*space, ctx.top.chain.clone()));
        }
        if matches!(
            qualifier,
            StorageQualifier::In | StorageQualifier::ConstReadOnly | StorageQualifier::InOut
        ) {
            let value = ctx.top.chain_load(precision_of(&arg.ty))?;
            ctx.top.builder().store(value, *space);
        }
    }

    let result = ctx.top.builder().call(func, spaces);

    for (space, chain) in copy_out {
        let value = ctx.top.builder().load(space)?;
        ctx.top.chain = chain;
        ctx.top.chain_store(value)?;
    }

    ctx.top.clear_chain();
    if let Some(result) = result {
        ctx.set_rvalue(result);
    }
    Ok(())
}
