//! Machine-checkable rationales: why the scheduler placed or skipped a slot.
//!
//! The engine is a pure function from a decision code plus context to an
//! explanation record. Every slot in a produced plan carries one — this is
//! auditability, not cosmetics.

use serde::{Deserialize, Serialize};

use crate::config::TimeOfDay;
use crate::plan::DayOfWeek;

/// Why a slot ended up in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionCode {
    /// Slot is free and was never contended.
    FreeAvailable,
    /// Claimed by a fixed constraint.
    ConstraintPlaced,
    /// Claimed by a study block.
    BlockPlaced,
    /// Left free because the day's study cap was reached.
    DailyLimitReached,
    /// Left free because the only goals with remaining minutes are postponed.
    PostponedGoalSkipped,
}

/// Context fields a rationale may cite. Callers fill only what applies.
#[derive(Debug, Clone, Default)]
pub struct RationaleContext {
    /// Source goal or constraint title.
    pub label: Option<String>,
    pub day: Option<DayOfWeek>,
    /// Slot index within the day.
    pub position: Option<usize>,
    pub bucket: Option<TimeOfDay>,
    pub block_minutes: Option<u32>,
    pub score: Option<f64>,
}

/// Structured explanation attached to a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    pub code: DecisionCode,
    pub message: String,
}

/// Pure mapping from decision code + context to an explanation record.
pub struct RationaleEngine;

impl RationaleEngine {
    pub fn explain(code: DecisionCode, ctx: &RationaleContext) -> Rationale {
        let message = match code {
            DecisionCode::FreeAvailable => "free and available".to_string(),
            DecisionCode::ConstraintPlaced => format!(
                "reserved for constraint '{}' on {} at slot {}",
                ctx.label.as_deref().unwrap_or("?"),
                ctx.day.map(|d| d.name()).unwrap_or("?"),
                ctx.position.unwrap_or(0),
            ),
            DecisionCode::BlockPlaced => format!(
                "{}-minute {} block for '{}' (score {:.3})",
                ctx.block_minutes.unwrap_or(0),
                ctx.bucket.map(TimeOfDay::as_str).unwrap_or("?"),
                ctx.label.as_deref().unwrap_or("?"),
                ctx.score.unwrap_or(0.0),
            ),
            DecisionCode::DailyLimitReached => format!(
                "daily study limit reached on {}",
                ctx.day.map(|d| d.name()).unwrap_or("?"),
            ),
            DecisionCode::PostponedGoalSkipped => format!(
                "remaining goal '{}' is postponed",
                ctx.label.as_deref().unwrap_or("?"),
            ),
        };
        Rationale { code, message }
    }

    /// Shorthand for the default rationale every grid slot starts with.
    pub fn available() -> Rationale {
        Self::explain(DecisionCode::FreeAvailable, &RationaleContext::default())
    }
}
