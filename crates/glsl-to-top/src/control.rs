//! Structured control flow: `if` and `?:`, `switch`, loops and branches.

use alloc::{format, string::ToString, vec::Vec};

use topir::{Precision, Value};

use crate::{
    ast::{BasicType, FlowOp, Node, NodeKind},
    context::LowerContext,
    error::{LowerError, LowerResult},
    lower::lower_node,
    metadata::precision_of,
    types::convert_type,
};

/// Lower an `if` statement or a `?:` expression.
///
/// A `?:` stores each arm into a local and leaves that local as an
/// l-value in the chain.
pub fn lower_selection<'a>(
    ctx: &mut LowerContext<'a>,
    node: &'a Node,
    cond: &'a Node,
    true_block: Option<&'a Node>,
    false_block: Option<&'a Node>,
) -> LowerResult<()> {
    let result = if node.ty.basic == BasicType::Void {
        None
    } else {
        let ty = convert_type(ctx, &node.ty);
        let name = ctx.left_name.clone().unwrap_or_else(|| "ternary".to_string());
        Some(ctx.top.builder().alloca(&name, ty))
    };

    ctx.top.clear_chain();
    lower_node(ctx, cond)?;
    let condition = ctx.top.chain_load(Precision::None)?;
    let if_builder = ctx.top.make_if(condition, false_block.is_some());

    if let Some(arm) = true_block {
        lower_arm(ctx, arm, result)?;
    }
    if let Some(arm) = false_block {
        ctx.top.make_else(&if_builder);
        lower_arm(ctx, arm, result)?;
    }
    ctx.top.close_if(if_builder);

    if let Some(result) = result {
        ctx.top.clear_chain();
        ctx.top.chain.set_l(result);
    }
    Ok(())
}

fn lower_arm<'a>(ctx: &mut LowerContext<'a>, arm: &'a Node, result: Option<Value>) -> LowerResult<()> {
    ctx.top.clear_chain();
    lower_node(ctx, arm)?;
    if let Some(result) = result {
        let value = ctx.top.chain_load(precision_of(&arm.ty))?;
        ctx.top.builder().store(value, result);
    }
    Ok(())
}

/// Lower a `switch`. Every statement of the body is its own segment;
/// control falls from one segment into the next unless it breaks.
pub fn lower_switch<'a>(ctx: &mut LowerContext<'a>, cond: &'a Node, body: &'a [Node]) -> LowerResult<()> {
    let selector = ctx.rvalue(cond)?;

    let mut segments: Vec<Option<&'a Node>> = Vec::new();
    let mut cases = Vec::new();
    let mut default_segment = None;
    for child in body {
        match &child.kind {
            NodeKind::Branch {
                op: FlowOp::Default,
                ..
            } => default_segment = Some(segments.len()),
            NodeKind::Branch {
                op: FlowOp::Case,
                expr,
            } => {
                let value = expr
                    .as_deref()
                    .and_then(Node::as_constant)
                    .and_then(|c| c.first())
                    .ok_or_else(|| LowerError::invariant("case label without a constant"))?;
                cases.push((value.as_i32(), segments.len()));
            }
            _ => segments.push(Some(child)),
        }
    }

    // A label with no statements after it still needs a segment to land on.
    let dangling = cases
        .iter()
        .map(|(_, s)| *s)
        .chain(default_segment)
        .any(|s| s == segments.len());
    if dangling {
        segments.push(None);
    }

    let switch = ctx
        .top
        .make_switch(selector, segments.len(), &cases, default_segment)?;
    log::trace!(
        "switch with {} segments and {} cases",
        switch.segment_count(),
        cases.len()
    );

    ctx.break_for_loop.push(false);
    for (s, segment) in segments.into_iter().enumerate() {
        ctx.top.next_switch_segment(&switch, s);
        match segment {
            Some(statement) => {
                ctx.top.clear_chain();
                lower_node(ctx, statement)?;
            }
            None => ctx.top.add_switch_break()?,
        }
    }
    ctx.break_for_loop.pop();
    ctx.top.end_switch(switch);
    Ok(())
}

/// Lower a `for`, `while` or `do`-`while` loop.
pub fn lower_loop<'a>(
    ctx: &mut LowerContext<'a>,
    test: Option<&'a Node>,
    body: Option<&'a Node>,
    terminal: Option<&'a Node>,
    test_first: bool,
) -> LowerResult<()> {
    ctx.loop_terminals.push(terminal);
    ctx.top.make_new_loop(test_first);

    let mut body_done = false;
    if !test_first {
        if let Some(body) = body {
            lower_loop_body(ctx, body)?;
        }
        body_done = true;
        ctx.top.make_branch_to_loop_end_test()?;
    }

    if let Some(test) = test {
        let condition = ctx.rvalue(test)?;
        ctx.top.make_loop_test(condition)?;
    }

    if !body_done {
        if let Some(body) = body {
            lower_loop_body(ctx, body)?;
        }
    }

    if let Some(terminal) = terminal {
        ctx.top.clear_chain();
        lower_node(ctx, terminal)?;
    }
    ctx.top.close_loop()?;
    ctx.loop_terminals.pop();
    Ok(())
}

fn lower_loop_body<'a>(ctx: &mut LowerContext<'a>, body: &'a Node) -> LowerResult<()> {
    ctx.break_for_loop.push(true);
    ctx.top.clear_chain();
    let result = lower_node(ctx, body);
    ctx.break_for_loop.pop();
    result
}

/// Lower `discard`, `break`, `continue` or `return`.
pub fn lower_branch<'a>(ctx: &mut LowerContext<'a>, op: FlowOp, expr: Option<&'a Node>) -> LowerResult<()> {
    if matches!(op, FlowOp::Case | FlowOp::Default) {
        return Err(LowerError::invariant(format!("{:?} label outside a switch", op)));
    }
    if let Some(expr) = expr {
        ctx.top.clear_chain();
        lower_node(ctx, expr)?;
    }

    match op {
        FlowOp::Kill => ctx.top.make_discard(),
        FlowOp::Break => match ctx.break_for_loop.last() {
            Some(true) => ctx.top.make_loop_exit()?,
            Some(false) => ctx.top.add_switch_break()?,
            None => return Err(LowerError::invariant("break outside a loop or switch")),
        },
        FlowOp::Continue => {
            let terminal = ctx
                .loop_terminals
                .last()
                .copied()
                .ok_or_else(|| LowerError::invariant("continue outside a loop"))?;
            if let Some(terminal) = terminal {
                ctx.top.clear_chain();
                lower_node(ctx, terminal)?;
            }
            ctx.top.make_loop_back_edge()?;
        }
        FlowOp::Return => {
            if ctx.in_main {
                ctx.top.make_main_return()?;
            } else if let Some(expr) = expr {
                let value = ctx.top.chain_load(precision_of(&expr.ty))?;
                ctx.top.make_return(Some(value));
            } else {
                ctx.top.make_return(None);
            }
            ctx.top.clear_chain();
        }
        FlowOp::Case | FlowOp::Default => {}
    }
    Ok(())
}
