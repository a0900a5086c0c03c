//! # studia-scheduler
//!
//! Turns goals + constraints + a tunable policy into a 7-day grid of
//! annotated slots, and audits the result.
//!
//! `WeeklyScheduler::build_plan` is deterministic given identical inputs and
//! input order; `GuardianAnalyzer::analyze` is pure and read-only.

mod constraints;
mod exam;
mod grid;
mod placement;

pub mod engine;
pub mod guardian;
pub mod service;

pub use engine::WeeklyScheduler;
pub use guardian::{GuardianAnalyzer, Issue, IssueKind, Severity};
pub use service::{run_weekly_plan, PlanOutcome};
