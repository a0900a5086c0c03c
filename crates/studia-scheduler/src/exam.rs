//! Exam-window detection: a near deadline on any active goal shifts the
//! whole run's placement weights toward the morning.

use chrono::{DateTime, Utc};
use tracing::debug;

use studia_core::config::Policy;
use studia_core::entity::{Goal, GoalStatus};

/// Derive the effective policy for one run. If any non-postponed,
/// non-completed goal has a deadline within `exam_window_days` (inclusive,
/// non-negative), morning weight is boosted and evening weight penalized,
/// both clamped. The stored policy is untouched.
pub fn effective_policy(goals: &[Goal], policy: &Policy, now: DateTime<Utc>) -> Policy {
    let pressured = goals.iter().find(|g| within_exam_window(g, policy, now));
    match pressured {
        Some(goal) => {
            debug!(goal = %goal.title, "exam window active, boosting morning placement");
            policy.with_exam_pressure()
        }
        None => policy.clone(),
    }
}

fn within_exam_window(goal: &Goal, policy: &Policy, now: DateTime<Utc>) -> bool {
    if goal.status != GoalStatus::Active || goal.sync.is_deleted {
        return false;
    }
    match goal.deadline {
        Some(deadline) => {
            let days_until = (deadline.date_naive() - now.date_naive()).num_days();
            (0..=policy.exam_window_days).contains(&days_until)
        }
        None => false,
    }
}
