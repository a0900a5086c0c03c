//! The scheduling policy: block sizes, daily cap, time-of-day weights,
//! and exam-window heuristics.
//!
//! Stored as a single keyed settings record (`weeklyPlannerPolicy`), read by
//! the scheduler on every run, mutated by user edits or the auto-tuner.
//!
//! # Examples
//!
//! ```
//! use studia_core::config::{Policy, TimeOfDay};
//!
//! let policy = Policy::default();
//! assert_eq!(policy.slots_per_day(), 26);
//! assert_eq!(policy.bucket_of(9 * 60), TimeOfDay::Morning);
//! assert_eq!(policy.bucket_of(21 * 60), TimeOfDay::Evening);
//! ```

use serde::{Deserialize, Serialize};

/// Coarse time-of-day bucket used for placement weights and tuner stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Midday,
    Evening,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 3] = [TimeOfDay::Morning, TimeOfDay::Midday, TimeOfDay::Evening];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Midday => "midday",
            TimeOfDay::Evening => "evening",
        }
    }
}

/// The tunable scheduling policy. Versionless configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Grid resolution in minutes. Default: 30.
    pub slot_minutes: u32,
    /// Daily window start, minute-of-day. Default: 540 (09:00).
    pub day_start_minute: u32,
    /// Daily window end, minute-of-day. Default: 1320 (22:00).
    pub day_end_minute: u32,
    /// Default study block length in minutes. Default: 90.
    pub block_minutes: u32,
    /// Shorter block length used in the evening bucket. Default: 60.
    pub evening_block_minutes: u32,
    /// Daily study cap in minutes. Default: 240.
    pub max_study_minutes_per_day: u32,
    /// Morning bucket ends at this minute-of-day. Default: 720 (12:00).
    pub morning_end_minute: u32,
    /// Midday bucket ends at this minute-of-day. Default: 1020 (17:00).
    pub midday_end_minute: u32,
    /// Placement weight for the morning bucket. Default: 1.0.
    pub morning_weight: f64,
    /// Placement weight for the midday bucket. Default: 0.8.
    pub midday_weight: f64,
    /// Placement weight for the evening bucket. Default: 0.6.
    pub evening_weight: f64,
    /// A deadline within this many days triggers exam pressure. Default: 7.
    pub exam_window_days: i64,
    /// Morning weight boost under exam pressure. Default: 0.3.
    pub exam_morning_boost: f64,
    /// Evening weight penalty under exam pressure. Default: 0.3.
    pub exam_evening_penalty: f64,
    /// Lower clamp for any weight. Default: 0.1.
    pub min_weight: f64,
    /// Upper clamp for any weight. Default: 2.0.
    pub max_weight: f64,
    /// Linear per-slot-index penalty favoring earlier placement. Default: 0.01.
    pub position_penalty: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            day_start_minute: 9 * 60,
            day_end_minute: 22 * 60,
            block_minutes: 90,
            evening_block_minutes: 60,
            max_study_minutes_per_day: 240,
            morning_end_minute: 12 * 60,
            midday_end_minute: 17 * 60,
            morning_weight: 1.0,
            midday_weight: 0.8,
            evening_weight: 0.6,
            exam_window_days: 7,
            exam_morning_boost: 0.3,
            exam_evening_penalty: 0.3,
            min_weight: 0.1,
            max_weight: 2.0,
            position_penalty: 0.01,
        }
    }
}

impl Policy {
    /// Number of slots in one day's window.
    pub fn slots_per_day(&self) -> usize {
        let window = self.day_end_minute.saturating_sub(self.day_start_minute);
        if self.slot_minutes == 0 {
            return 0;
        }
        (window / self.slot_minutes) as usize
    }

    /// Minute-of-day at which the slot with the given index starts.
    pub fn slot_start_minute(&self, index: usize) -> u32 {
        self.day_start_minute + index as u32 * self.slot_minutes
    }

    /// Bucket for a minute-of-day.
    pub fn bucket_of(&self, minute_of_day: u32) -> TimeOfDay {
        if minute_of_day < self.morning_end_minute {
            TimeOfDay::Morning
        } else if minute_of_day < self.midday_end_minute {
            TimeOfDay::Midday
        } else {
            TimeOfDay::Evening
        }
    }

    /// Placement weight for a bucket.
    pub fn weight(&self, bucket: TimeOfDay) -> f64 {
        match bucket {
            TimeOfDay::Morning => self.morning_weight,
            TimeOfDay::Midday => self.midday_weight,
            TimeOfDay::Evening => self.evening_weight,
        }
    }

    /// Desired block length for a bucket, in minutes.
    pub fn desired_block_minutes(&self, bucket: TimeOfDay) -> u32 {
        match bucket {
            TimeOfDay::Evening => self.evening_block_minutes,
            _ => self.block_minutes,
        }
    }

    /// Clamp a weight into the configured bounds.
    pub fn clamp_weight(&self, weight: f64) -> f64 {
        weight.clamp(self.min_weight, self.max_weight)
    }

    /// Derive the exam-pressure policy for one scheduler run: morning boosted,
    /// evening penalized, both clamped. The stored policy is untouched.
    pub fn with_exam_pressure(&self) -> Policy {
        let mut effective = self.clone();
        effective.morning_weight = self.clamp_weight(self.morning_weight + self.exam_morning_boost);
        effective.evening_weight = self.clamp_weight(self.evening_weight - self.exam_evening_penalty);
        effective
    }
}

/// A partial policy update: only the present fields change. Produced by the
/// auto-tuner and by user edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyPatch {
    pub morning_weight: Option<f64>,
    pub midday_weight: Option<f64>,
    pub evening_weight: Option<f64>,
    pub block_minutes: Option<u32>,
    pub evening_block_minutes: Option<u32>,
    pub max_study_minutes_per_day: Option<u32>,
}

impl PolicyPatch {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == PolicyPatch::default()
    }

    /// Apply to a policy, clamping weights into the policy's bounds.
    pub fn apply(&self, policy: &mut Policy) {
        if let Some(w) = self.morning_weight {
            policy.morning_weight = policy.clamp_weight(w);
        }
        if let Some(w) = self.midday_weight {
            policy.midday_weight = policy.clamp_weight(w);
        }
        if let Some(w) = self.evening_weight {
            policy.evening_weight = policy.clamp_weight(w);
        }
        if let Some(m) = self.block_minutes {
            policy.block_minutes = m;
        }
        if let Some(m) = self.evening_block_minutes {
            policy.evening_block_minutes = m;
        }
        if let Some(m) = self.max_study_minutes_per_day {
            policy.max_study_minutes_per_day = m;
        }
    }
}

/// Settings key under which the policy record is stored and synced.
pub const POLICY_SETTING_KEY: &str = "weeklyPlannerPolicy";
