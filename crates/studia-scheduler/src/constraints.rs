//! Constraint placement: fixed busy periods claim slots before any goal.
//!
//! Constraints are first-come-first-served in input order; later constraints
//! respect earlier claims. A constraint whose duration exceeds the free
//! capacity in its scope silently leaves the remainder unplaced — capacity
//! is advisory, not a hard failure.

use tracing::debug;

use studia_core::entity::Constraint;
use studia_core::config::Policy;
use studia_core::plan::SlotKind;
use studia_core::rationale::{DecisionCode, RationaleContext, RationaleEngine};

use crate::grid::WeekGrid;

pub fn place_constraints(grid: &mut WeekGrid, constraints: &[Constraint], policy: &Policy) {
    for constraint in constraints {
        if constraint.sync.is_deleted {
            continue; // tombstones don't occupy the week
        }
        let needed = slots_needed(constraint.minutes_per_week, policy.slot_minutes);
        let placed = match constraint.day {
            Some(day) => claim_on_day(grid, day.index(), constraint, needed),
            None => claim_round_robin(grid, constraint, needed),
        };
        if placed < needed {
            debug!(
                constraint = %constraint.title,
                needed,
                placed,
                "constraint remainder left unplaced"
            );
        }
    }
}

fn slots_needed(minutes: u32, slot_minutes: u32) -> usize {
    if slot_minutes == 0 {
        return 0;
    }
    (minutes as usize).div_ceil(slot_minutes as usize)
}

/// Scan one day's slots from the end of the day backward, claiming free
/// slots until satisfied or the day is exhausted.
fn claim_on_day(grid: &mut WeekGrid, day_idx: usize, constraint: &Constraint, needed: usize) -> usize {
    let mut placed = 0;
    let slots_per_day = grid.slots_per_day();
    for pos in (0..slots_per_day).rev() {
        if placed == needed {
            break;
        }
        if grid.days[day_idx].slots[pos].is_free() {
            claim(grid, day_idx, pos, constraint);
            placed += 1;
        }
    }
    placed
}

/// Day-less constraint: scan every day at the same backward-from-evening
/// position before advancing to the next position, so the claimed slots
/// spread evenly across the week.
fn claim_round_robin(grid: &mut WeekGrid, constraint: &Constraint, needed: usize) -> usize {
    let mut placed = 0;
    let slots_per_day = grid.slots_per_day();
    for offset in 0..slots_per_day {
        let pos = slots_per_day - 1 - offset;
        for day_idx in 0..grid.days.len() {
            if placed == needed {
                return placed;
            }
            if grid.days[day_idx].slots[pos].is_free() {
                claim(grid, day_idx, pos, constraint);
                placed += 1;
            }
        }
    }
    placed
}

fn claim(grid: &mut WeekGrid, day_idx: usize, pos: usize, constraint: &Constraint) {
    let day = grid.days[day_idx].day;
    let slot = &mut grid.days[day_idx].slots[pos];
    slot.kind = SlotKind::Busy;
    slot.label = Some(constraint.title.clone());
    slot.rationale = RationaleEngine::explain(
        DecisionCode::ConstraintPlaced,
        &RationaleContext {
            label: Some(constraint.title.clone()),
            day: Some(day),
            position: Some(pos),
            ..Default::default()
        },
    );
}
