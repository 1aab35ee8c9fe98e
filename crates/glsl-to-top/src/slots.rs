//! Pipeline slot assignment.
//!
//! Every pipeline variable gets a slot. Variables with an explicit
//! `layout(location=)` keep it; the rest are numbered from
//! [`MAX_USER_LAYOUT_LOCATION`](topir::metadata::MAX_USER_LAYOUT_LOCATION)
//! upward so the two ranges never meet.

use alloc::{format, string::ToString};

use crate::{
    ast::{compute_type_location_size, is_arrayed_io, AstType, BasicType},
    context::LowerContext,
    error::{LowerError, Severity},
};

/// Slot and slot count of the pipeline variable `name`.
///
/// Repeated calls for one name return the first answer.
pub fn assign_slot(ctx: &mut LowerContext<'_>, name: &str, ty: &AstType) -> (i32, u32) {
    let first_sighting = !ctx.slots.contains_key(name);
    let num_slots = slot_count(ctx, name, ty, first_sighting);

    if let Some(location) = ty.qualifier.layout.location {
        ctx.slots.insert(name.to_string(), (location, num_slots));
        return (location, num_slots);
    }

    if let Some(assigned) = ctx.slots.get(name) {
        return *assigned;
    }
    let slot = ctx.next_slot;
    ctx.next_slot += num_slots as i32;
    ctx.slots.insert(name.to_string(), (slot, num_slots));
    log::debug!("slot {} (+{}) assigned to {}", slot, num_slots, name);
    (slot, num_slots)
}

fn slot_count(ctx: &mut LowerContext<'_>, name: &str, ty: &AstType, report: bool) -> u32 {
    let arrayed_io = ty.is_array() && is_arrayed_io(ty, ctx.stage);

    if ctx.location_sizes {
        if arrayed_io && !ctx.options.use_logical_io && report {
            ctx.unsupported(format!("arrayed I/O in physical I/O mode: {}", name));
        }
        return compute_type_location_size(ty);
    }

    // No front-end sizing: estimate.
    if report {
        ctx.diags.report(
            LowerError::front_end_missing(format!("location size of {}", name)),
            Severity::Continue,
        );
        if ty.is_struct() || ty.is_matrix() || ty.basic == BasicType::Double {
            ctx.unsupported(format!("complex I/O type without front-end sizing: {}", name));
        }
    }
    if ty.is_array() && !arrayed_io {
        ty.outer_array_size().max(1)
    } else {
        1
    }
}
