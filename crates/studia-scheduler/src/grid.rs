//! The 7×N slot grid the scheduler works on.

use studia_core::config::Policy;
use studia_core::plan::{DayOfWeek, DayPlan, Slot, SlotKind};
use studia_core::rationale::RationaleEngine;

/// Mutable week grid: seven days of N slots each, all initially free with
/// an "available" rationale.
pub struct WeekGrid {
    pub days: Vec<DayPlan>,
}

impl WeekGrid {
    pub fn new(policy: &Policy) -> Self {
        let slots_per_day = policy.slots_per_day();
        let days = DayOfWeek::ALL
            .iter()
            .map(|&day| DayPlan {
                day,
                slots: (0..slots_per_day)
                    .map(|i| Slot {
                        start_minute: policy.slot_start_minute(i),
                        minutes: policy.slot_minutes,
                        kind: SlotKind::Free,
                        label: None,
                        priority: None,
                        rationale: RationaleEngine::available(),
                    })
                    .collect(),
            })
            .collect();
        Self { days }
    }

    pub fn slots_per_day(&self) -> usize {
        self.days.first().map(|d| d.slots.len()).unwrap_or(0)
    }

    /// Length of the contiguous free run starting at `start` on `day_idx`.
    pub fn free_run_len(&self, day_idx: usize, start: usize) -> usize {
        self.days[day_idx].slots[start..]
            .iter()
            .take_while(|s| s.is_free())
            .count()
    }

    pub fn into_plan(self) -> Vec<DayPlan> {
        self.days
    }
}
