//! [`WeeklyScheduler`] — the slot-allocation entry point.

use chrono::{DateTime, Utc};
use tracing::info;

use studia_core::config::Policy;
use studia_core::entity::{Constraint, Goal};
use studia_core::errors::{SchedulerError, StudiaResult};
use studia_core::plan::{DayPlan, SlotKind};

use crate::constraints::place_constraints;
use crate::exam::effective_policy;
use crate::grid::WeekGrid;
use crate::placement::place_goals;

/// Pure weekly scheduler. Deterministic given identical inputs and input
/// iteration order; holds no state between runs.
pub struct WeeklyScheduler;

impl WeeklyScheduler {
    /// Build the week plan:
    ///
    /// 1. initialize the free grid,
    /// 2. place constraints (first-come-first-served by input order),
    /// 3. derive the exam-pressure effective policy for this run,
    /// 4. greedily place goal blocks round-robin,
    /// 5. leave a rationale on every slot.
    ///
    /// Zero goals returns the constraint-only grid unmodified.
    pub fn build_plan(
        goals: &[Goal],
        constraints: &[Constraint],
        policy: &Policy,
        now: DateTime<Utc>,
    ) -> StudiaResult<Vec<DayPlan>> {
        validate(policy)?;

        let mut grid = WeekGrid::new(policy);
        place_constraints(&mut grid, constraints, policy);

        let effective = effective_policy(goals, policy, now);
        place_goals(&mut grid, goals, &effective);

        let plan = grid.into_plan();
        let study_minutes: u32 = plan.iter().map(DayPlan::study_minutes).sum();
        let busy_slots: usize = plan
            .iter()
            .flat_map(|d| &d.slots)
            .filter(|s| s.kind == SlotKind::Busy)
            .count();
        info!(
            goals = goals.len(),
            constraints = constraints.len(),
            study_minutes,
            busy_slots,
            "weekly plan built"
        );
        Ok(plan)
    }
}

fn validate(policy: &Policy) -> Result<(), SchedulerError> {
    if policy.slot_minutes == 0 {
        return Err(SchedulerError::InvalidPolicy {
            reason: "slot_minutes must be positive".to_string(),
        });
    }
    if policy.day_end_minute <= policy.day_start_minute {
        return Err(SchedulerError::InvalidPolicy {
            reason: "day window is empty".to_string(),
        });
    }
    Ok(())
}
