//! The weekly plan projection: days, slots, and slot annotations.
//!
//! Slots are ephemeral — regenerated on every scheduler run from goals,
//! constraints, and policy. The grid is a projection, never the source of
//! truth.

use serde::{Deserialize, Serialize};

use crate::entity::Priority;
use crate::rationale::Rationale;

/// Day of the week, Monday-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// All seven days in week order.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    /// 0-based index within the week (Monday = 0).
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|d| *d == self).unwrap_or(0)
    }

    /// Day name for labels and rationales.
    pub fn name(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
            DayOfWeek::Sunday => "Sunday",
        }
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What occupies a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Free,
    Busy,
    Study,
}

/// The atomic schedulable unit: one fixed-size window within a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    /// Minute-of-day at which this slot starts.
    pub start_minute: u32,
    /// Slot length in minutes (the grid resolution).
    pub minutes: u32,
    pub kind: SlotKind,
    /// Source goal or constraint title, when occupied.
    pub label: Option<String>,
    /// Priority of the source goal, for display.
    pub priority: Option<Priority>,
    /// Why the scheduler placed or skipped this slot. Mandatory for
    /// auditability — every slot carries one.
    pub rationale: Rationale,
}

impl Slot {
    /// True when the slot has not been claimed by a constraint or goal.
    pub fn is_free(&self) -> bool {
        self.kind == SlotKind::Free
    }
}

/// One day's ordered slot list spanning the daily window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: DayOfWeek,
    pub slots: Vec<Slot>,
}

impl DayPlan {
    /// Total study minutes placed on this day.
    pub fn study_minutes(&self) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.kind == SlotKind::Study)
            .map(|s| s.minutes)
            .sum()
    }

    /// Total minutes of slots carrying the given label and kind.
    pub fn labeled_minutes(&self, label: &str, kind: SlotKind) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.kind == kind && s.label.as_deref() == Some(label))
            .map(|s| s.minutes)
            .sum()
    }
}
