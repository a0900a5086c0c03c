//! Synced entities: goals and constraints.
//!
//! Both carry [`SyncMeta`] — the fields every entity exchanged between
//! devices must have: a logical write time, an optional version counter,
//! a soft-delete flag, and an optional vector clock. A soft-deleted entity
//! keeps propagating its tombstone to peers; it is never silently purged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::VectorClock;
use crate::plan::DayOfWeek;
use crate::traits::{MergeKey, Syncable};

/// Goal priority. Does not enter the placement score — fairness comes from
/// the scheduler's round-robin cursor — but is carried onto slots for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Goal lifecycle status. Cancellation is a soft delete, not a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Postponed,
    Completed,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Postponed => "postponed",
            GoalStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(GoalStatus::Active),
            "postponed" => Some(GoalStatus::Postponed),
            "completed" => Some(GoalStatus::Completed),
            _ => None,
        }
    }
}

/// Sync metadata carried by every entity exchanged between devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMeta {
    /// Logical write time. Drives last-write-wins resolution.
    pub updated_at: DateTime<Utc>,
    /// Optional monotonic version counter.
    #[serde(default)]
    pub version: Option<u64>,
    /// Tombstone flag. Deleted entities stay in storage and keep syncing.
    #[serde(default)]
    pub is_deleted: bool,
    /// Optional per-device causal history.
    #[serde(default)]
    pub vector_clock: Option<VectorClock>,
}

impl SyncMeta {
    /// Fresh metadata for a local write at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            version: Some(1),
            is_deleted: false,
            vector_clock: None,
        }
    }

    /// Record a local write: bump time, version, and the device's clock entry.
    pub fn touch(&mut self, now: DateTime<Utc>, device_id: &str) {
        self.updated_at = now;
        self.version = Some(self.version.unwrap_or(0) + 1);
        let clock = self.vector_clock.get_or_insert_with(VectorClock::new);
        clock.increment(device_id);
    }
}

/// A study target with a weekly minute target, priority, and optional
/// deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    /// Storage-assigned numeric id (0 until inserted).
    pub id: i64,
    /// Stable cross-device identifier, preferred as the merge key.
    #[serde(default)]
    pub uuid: Option<String>,
    pub title: String,
    /// Weekly target in minutes (derived from hours at the edge).
    pub target_minutes: u32,
    pub priority: Priority,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub status: GoalStatus,
    #[serde(flatten)]
    pub sync: SyncMeta,
}

impl Goal {
    /// Create a new active goal with a fresh uuid, written at `now`.
    pub fn new(title: impl Into<String>, target_minutes: u32, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            uuid: Some(uuid::Uuid::new_v4().to_string()),
            title: title.into(),
            target_minutes,
            priority,
            deadline: None,
            status: GoalStatus::Active,
            sync: SyncMeta::new(now),
        }
    }

    /// Eligible for slot placement: active, not deleted.
    pub fn is_schedulable(&self) -> bool {
        self.status == GoalStatus::Active && !self.sync.is_deleted
    }
}

/// Identity equality: two goals are the same entity if their merge keys match.
impl PartialEq for Goal {
    fn eq(&self, other: &Self) -> bool {
        self.merge_key() == other.merge_key()
    }
}

/// A fixed recurring busy period the scheduler must not overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: i64,
    #[serde(default)]
    pub uuid: Option<String>,
    pub title: String,
    /// Fixed weekly duration in minutes.
    pub minutes_per_week: u32,
    /// Target day. Absent ⇒ distribute across the week.
    #[serde(default)]
    pub day: Option<DayOfWeek>,
    #[serde(flatten)]
    pub sync: SyncMeta,
}

impl Constraint {
    pub fn new(title: impl Into<String>, minutes_per_week: u32, day: Option<DayOfWeek>, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            uuid: Some(uuid::Uuid::new_v4().to_string()),
            title: title.into(),
            minutes_per_week,
            day,
            sync: SyncMeta::new(now),
        }
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.merge_key() == other.merge_key()
    }
}

macro_rules! impl_syncable {
    ($ty:ty) => {
        impl Syncable for $ty {
            fn merge_key(&self) -> MergeKey {
                match &self.uuid {
                    Some(u) => MergeKey::Uuid(u.clone()),
                    None => MergeKey::Id(self.id),
                }
            }

            fn updated_at(&self) -> DateTime<Utc> {
                self.sync.updated_at
            }

            fn set_updated_at(&mut self, at: DateTime<Utc>) {
                self.sync.updated_at = at;
            }

            fn version(&self) -> Option<u64> {
                self.sync.version
            }

            fn set_version(&mut self, version: Option<u64>) {
                self.sync.version = version;
            }

            fn is_deleted(&self) -> bool {
                self.sync.is_deleted
            }

            fn vector_clock(&self) -> Option<&VectorClock> {
                self.sync.vector_clock.as_ref()
            }
        }
    };
}

impl_syncable!(Goal);
impl_syncable!(Constraint);
