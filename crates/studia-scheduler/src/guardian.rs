//! [`GuardianAnalyzer`] — post-hoc plan auditor.
//!
//! Inspects a produced plan plus goals and constraints for overload, missed
//! deadlines, and exam-proximity risk. Read-only: its only side effect is a
//! `warn!` event when issues are found.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use studia_core::entity::{Constraint, Goal, GoalStatus};
use studia_core::plan::{DayPlan, SlotKind};

/// Issue severity. Display order: critical > warning > info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Overload,
    MissedDeadline,
    ExamProximity,
    ConstraintShortfall,
}

/// One audit finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Day name or goal/constraint title the issue is about.
    pub subject: String,
    pub message: String,
    pub suggested_fix: Option<String>,
}

/// Days before a deadline inside which under-scheduling becomes a risk.
const EXAM_PROXIMITY_DAYS: i64 = 3;
/// Scheduled share of the target below which proximity risk fires.
const EXAM_PROXIMITY_MIN_SHARE: f64 = 0.5;

pub struct GuardianAnalyzer;

impl GuardianAnalyzer {
    /// Audit a plan. Returns issues sorted by severity, most severe first.
    pub fn analyze(
        plan: &[DayPlan],
        goals: &[Goal],
        constraints: &[Constraint],
        daily_cap_minutes: u32,
        now: DateTime<Utc>,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();

        // OVERLOAD: a day's study minutes exceed the cap.
        for day in plan {
            let study = day.study_minutes();
            if study > daily_cap_minutes {
                issues.push(Issue {
                    kind: IssueKind::Overload,
                    severity: Severity::Warning,
                    subject: day.day.name().to_string(),
                    message: format!(
                        "{} has {} study minutes, over the {}-minute cap",
                        day.day, study, daily_cap_minutes
                    ),
                    suggested_fix: Some("reduce".to_string()),
                });
            }
        }

        for goal in goals.iter().filter(|g| !g.sync.is_deleted) {
            if goal.status == GoalStatus::Completed {
                continue;
            }
            let Some(deadline) = goal.deadline else {
                continue;
            };

            // MISSED_DEADLINE: deadline strictly in the past.
            if deadline < now {
                issues.push(Issue {
                    kind: IssueKind::MissedDeadline,
                    severity: Severity::Critical,
                    subject: goal.title.clone(),
                    message: format!("deadline for '{}' has passed", goal.title),
                    suggested_fix: None,
                });
                continue;
            }

            // EXAM_PROXIMITY: deadline near, scheduled minutes under half
            // the target.
            let days_until = (deadline.date_naive() - now.date_naive()).num_days();
            if days_until <= EXAM_PROXIMITY_DAYS {
                let scheduled: u32 = plan
                    .iter()
                    .map(|d| d.labeled_minutes(&goal.title, SlotKind::Study))
                    .sum();
                let needed = goal.target_minutes as f64 * EXAM_PROXIMITY_MIN_SHARE;
                if (scheduled as f64) < needed {
                    issues.push(Issue {
                        kind: IssueKind::ExamProximity,
                        severity: Severity::Warning,
                        subject: goal.title.clone(),
                        message: format!(
                            "'{}' is due in {} day(s) but only {} of {} target minutes are scheduled",
                            goal.title, days_until, scheduled, goal.target_minutes
                        ),
                        suggested_fix: None,
                    });
                }
            }
        }

        // Capacity advisory: a constraint that could not be fully placed.
        for constraint in constraints.iter().filter(|c| !c.sync.is_deleted) {
            let placed: u32 = plan
                .iter()
                .map(|d| d.labeled_minutes(&constraint.title, SlotKind::Busy))
                .sum();
            if placed < constraint.minutes_per_week {
                issues.push(Issue {
                    kind: IssueKind::ConstraintShortfall,
                    severity: Severity::Info,
                    subject: constraint.title.clone(),
                    message: format!(
                        "constraint '{}' only fit {} of {} minutes",
                        constraint.title, placed, constraint.minutes_per_week
                    ),
                    suggested_fix: None,
                });
            }
        }

        issues.sort_by(|a, b| b.severity.cmp(&a.severity));
        if !issues.is_empty() {
            warn!(count = issues.len(), "guardian found plan issues");
        }
        issues
    }
}
