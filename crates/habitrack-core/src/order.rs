//! Ordering manager: dense integer ranks with minimal-shift reorders.
//!
//! A reorder rotates the rank values over the contiguous positional
//! range between the old and the new position, so the rank multiset is
//! unchanged (uniqueness is preserved by construction) and activities
//! outside the range keep their ranks untouched. Deactivated
//! activities freeze their rank and are simply absent from the input.

use crate::error::{CoreError, Result, ValidationError};

/// Rank for a newly created activity, given the current maximum rank
/// across all activities (`None` for an empty table).
pub fn next_rank(max_rank: Option<i64>) -> i64 {
    max_rank.unwrap_or(0) + 1
}

/// Plan moving `activity_id` to `position` (1-based) within `ordered`,
/// the active activities as `(id, rank)` sorted by rank ascending.
///
/// Returns only the `(id, new_rank)` assignments that change; an
/// already-in-place move returns an empty plan.
///
/// # Errors
/// `NotFound` when the id is not in the active order, `Validation`
/// when the position is outside `1..=ordered.len()`.
pub fn plan_reorder(
    ordered: &[(i64, i64)],
    activity_id: i64,
    position: usize,
) -> Result<Vec<(i64, i64)>> {
    let current = ordered
        .iter()
        .position(|(id, _)| *id == activity_id)
        .ok_or(CoreError::NotFound(activity_id))?;

    if position == 0 || position > ordered.len() {
        return Err(ValidationError::PositionOutOfRange {
            position,
            len: ordered.len(),
        }
        .into());
    }
    let target = position - 1;
    if current == target {
        return Ok(Vec::new());
    }

    let ranks: Vec<i64> = ordered.iter().map(|&(_, rank)| rank).collect();
    let mut plan = Vec::with_capacity(current.abs_diff(target) + 1);
    if current < target {
        // Moving down: everything in between steps up one slot.
        for i in current + 1..=target {
            plan.push((ordered[i].0, ranks[i - 1]));
        }
    } else {
        // Moving up: everything in between steps down one slot.
        for i in target..current {
            plan.push((ordered[i].0, ranks[i + 1]));
        }
    }
    plan.push((activity_id, ranks[target]));
    Ok(plan)
}
