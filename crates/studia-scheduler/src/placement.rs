//! Goal placement: block-based greedy best-score allocation with a
//! round-robin cursor for fairness.
//!
//! For each day, repeatedly pick the next eligible goal, score every feasible
//! contiguous run of free slots, and place the highest-scoring block. The
//! score is the time-of-day bucket weight minus a small linear penalty that
//! favors earlier placement; ties resolve to the first run encountered
//! (ascending scan, strict greater-than).
//!
//! The cursor is plain local iteration state scoped to one `build_plan`
//! call, carried across days.

use studia_core::config::{Policy, TimeOfDay};
use studia_core::entity::{Goal, GoalStatus};
use studia_core::plan::SlotKind;
use studia_core::rationale::{DecisionCode, RationaleContext, RationaleEngine};

use crate::grid::WeekGrid;

pub fn place_goals(grid: &mut WeekGrid, goals: &[Goal], policy: &Policy) {
    if goals.is_empty() || policy.slot_minutes == 0 {
        return;
    }
    // Remaining minutes per goal. Completed and deleted goals start at zero;
    // postponed goals keep their target so their skip can be explained.
    let mut remaining: Vec<u32> = goals
        .iter()
        .map(|g| {
            if g.status == GoalStatus::Completed || g.sync.is_deleted {
                0
            } else {
                g.target_minutes
            }
        })
        .collect();

    let mut cursor = 0usize;
    for day_idx in 0..grid.days.len() {
        let cap = policy.max_study_minutes_per_day;
        let mut used: u32 = 0;
        loop {
            if used >= cap {
                break;
            }
            let mut placed = false;
            for offset in 0..goals.len() {
                let gi = (cursor + offset) % goals.len();
                if !eligible(&goals[gi], remaining[gi], policy) {
                    continue;
                }
                if let Some(block) = best_run(grid, day_idx, remaining[gi], cap - used, policy) {
                    apply_block(grid, day_idx, &goals[gi], &block);
                    remaining[gi] -= block.minutes;
                    used += block.minutes;
                    // Advance past the goal that just placed, whether or not
                    // it has minutes left.
                    cursor = (gi + 1) % goals.len();
                    placed = true;
                    break;
                }
            }
            if !placed {
                break; // full cycle with no eligible goal or no feasible run
            }
        }
        annotate_day(grid, day_idx, goals, &remaining, used, policy);
    }
}

fn eligible(goal: &Goal, remaining: u32, policy: &Policy) -> bool {
    goal.is_schedulable() && remaining >= policy.slot_minutes
}

struct BlockChoice {
    start: usize,
    slots: usize,
    minutes: u32,
    bucket: TimeOfDay,
    score: f64,
}

/// Score every feasible contiguous run on the day and return the best.
/// Run length is bounded by the free run, the remaining goal minutes, the
/// remaining daily cap, and the bucket's desired block length (shorter in
/// the evening).
fn best_run(
    grid: &WeekGrid,
    day_idx: usize,
    goal_remaining: u32,
    cap_left: u32,
    policy: &Policy,
) -> Option<BlockChoice> {
    let slot_min = policy.slot_minutes;
    let mut best: Option<BlockChoice> = None;
    for start in 0..grid.slots_per_day() {
        if !grid.days[day_idx].slots[start].is_free() {
            continue;
        }
        let bucket = policy.bucket_of(policy.slot_start_minute(start));
        let len = grid
            .free_run_len(day_idx, start)
            .min((policy.desired_block_minutes(bucket) / slot_min) as usize)
            .min((goal_remaining / slot_min) as usize)
            .min((cap_left / slot_min) as usize);
        if len == 0 {
            continue;
        }
        let score = policy.weight(bucket) - policy.position_penalty * start as f64;
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(BlockChoice {
                start,
                slots: len,
                minutes: len as u32 * slot_min,
                bucket,
                score,
            });
        }
    }
    best
}

fn apply_block(grid: &mut WeekGrid, day_idx: usize, goal: &Goal, block: &BlockChoice) {
    let day = grid.days[day_idx].day;
    for pos in block.start..block.start + block.slots {
        let slot = &mut grid.days[day_idx].slots[pos];
        slot.kind = SlotKind::Study;
        slot.label = Some(goal.title.clone());
        slot.priority = Some(goal.priority);
        slot.rationale = RationaleEngine::explain(
            DecisionCode::BlockPlaced,
            &RationaleContext {
                label: Some(goal.title.clone()),
                day: Some(day),
                position: Some(pos),
                bucket: Some(block.bucket),
                block_minutes: Some(block.minutes),
                score: Some(block.score),
            },
        );
    }
}

/// After a day is done, explain every slot that stayed free.
fn annotate_day(
    grid: &mut WeekGrid,
    day_idx: usize,
    goals: &[Goal],
    remaining: &[u32],
    used: u32,
    policy: &Policy,
) {
    let day = grid.days[day_idx].day;
    let cap_reached = used >= policy.max_study_minutes_per_day;
    let postponed = goals.iter().zip(remaining).find(|(g, rem)| {
        g.status == GoalStatus::Postponed && !g.sync.is_deleted && **rem >= policy.slot_minutes
    });
    for slot in grid.days[day_idx].slots.iter_mut().filter(|s| s.is_free()) {
        if cap_reached {
            slot.rationale = RationaleEngine::explain(
                DecisionCode::DailyLimitReached,
                &RationaleContext {
                    day: Some(day),
                    ..Default::default()
                },
            );
        } else if let Some((goal, _)) = postponed {
            slot.rationale = RationaleEngine::explain(
                DecisionCode::PostponedGoalSkipped,
                &RationaleContext {
                    label: Some(goal.title.clone()),
                    day: Some(day),
                    ..Default::default()
                },
            );
        }
        // otherwise the default "free and available" rationale stands
    }
}
