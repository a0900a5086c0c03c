//! Storage-wired planning runs.
//!
//! [`run_weekly_plan`] is what a storage-change notification triggers: load
//! goals, constraints, and the stored policy, build the plan, audit it, and
//! record the run summary plus any guardian findings in the event log.
//! The scheduler and guardian themselves stay pure; this is the seam where
//! their results become observable history.

use chrono::{DateTime, Utc};

use studia_core::errors::StudiaResult;
use studia_core::plan::DayPlan;
use studia_core::traits::SyncStore;
use studia_storage::{load_policy, EventType, PlannerStore};

use crate::engine::WeeklyScheduler;
use crate::guardian::{GuardianAnalyzer, Issue};

/// A completed planning run: the grid plus the guardian's findings.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: Vec<DayPlan>,
    pub issues: Vec<Issue>,
}

/// Build and audit this week's plan from stored state, logging a run-summary
/// event and one event per guardian finding.
pub fn run_weekly_plan(store: &PlannerStore, now: DateTime<Utc>) -> StudiaResult<PlanOutcome> {
    let goals = store.load_goals()?;
    let constraints = store.load_constraints()?;
    let policy = load_policy(store)?;

    let plan = WeeklyScheduler::build_plan(&goals, &constraints, &policy, now)?;
    let study_minutes: u32 = plan.iter().map(DayPlan::study_minutes).sum();
    store.append_event(
        EventType::SchedulerRun,
        now,
        Some(&serde_json::json!({
            "goals": goals.len(),
            "constraints": constraints.len(),
            "study_minutes": study_minutes,
        })),
    )?;

    let issues = GuardianAnalyzer::analyze(
        &plan,
        &goals,
        &constraints,
        policy.max_study_minutes_per_day,
        now,
    );
    for issue in &issues {
        store.append_event(EventType::GuardianWarning, now, Some(&serde_json::to_value(issue)?))?;
    }

    Ok(PlanOutcome { plan, issues })
}
