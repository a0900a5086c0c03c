//! Entity-level conflict resolution.
//!
//! Strategies are independent and tried in order; each either decides or
//! falls through to the next:
//!
//! 1. tombstone asymmetry — exactly one side deleted, newer write wins
//! 2. vector clocks — strict causal dominance wins, concurrency falls through
//! 3. version counters — higher wins, equal falls through
//! 4. last-write-wins — writes closer than the merge window merge
//!    field-by-field instead of picking a side wholesale
//! 5. exact tie — keep local, avoiding churn

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use studia_core::config::SyncConfig;
use studia_core::errors::{StudiaResult, SyncError};
use studia_core::traits::Syncable;

/// Which side a resolution came from. `Merged` means a field-level merge of
/// two near-simultaneous writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    TakeLocal,
    TakeRemote,
    FieldMerge,
}

/// Stateless entity resolver. Pure: no storage access, no clocks of its own.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    field_merge_window_ms: i64,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(&SyncConfig::default())
    }
}

impl ConflictResolver {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            field_merge_window_ms: config.field_merge_window_ms,
        }
    }

    /// Resolve one entity pair into the surviving copy.
    pub fn resolve<T: Syncable>(&self, local: &T, remote: &T) -> StudiaResult<T> {
        let outcome = tombstone_asymmetry(local, remote)
            .or_else(|| causal_dominance(local, remote))
            .or_else(|| version_precedence(local, remote))
            .unwrap_or_else(|| self.last_write_wins(local, remote));

        match outcome {
            Outcome::TakeLocal => Ok(local.clone()),
            Outcome::TakeRemote => Ok(remote.clone()),
            Outcome::FieldMerge => self.field_merge(local, remote),
        }
    }

    fn last_write_wins<T: Syncable>(&self, local: &T, remote: &T) -> Outcome {
        let delta_ms = (remote.updated_at() - local.updated_at()).num_milliseconds();
        if delta_ms == 0 {
            Outcome::TakeLocal // exact tie keeps local
        } else if delta_ms.abs() < self.field_merge_window_ms {
            debug!(delta_ms, "near-simultaneous writes, merging field-by-field");
            Outcome::FieldMerge
        } else if delta_ms > 0 {
            Outcome::TakeRemote
        } else {
            Outcome::TakeLocal
        }
    }

    /// Field-level merge for near-simultaneous edits. Starts from local; a
    /// remote field is adopted when local lacks it, or when the values differ
    /// and the remote write is at least as new. Identity fields are never
    /// overwritten, and a remote null never overwrites a defined local value,
    /// so the two devices compute the same field values regardless of which
    /// side they merge from. The merged copy gets the max timestamp and a
    /// bumped version.
    fn field_merge<T: Syncable>(&self, local: &T, remote: &T) -> StudiaResult<T> {
        let mut local_value = serde_json::to_value(local)?;
        let remote_value = serde_json::to_value(remote)?;
        let (Value::Object(local_map), Value::Object(remote_map)) =
            (&mut local_value, &remote_value)
        else {
            return Err(SyncError::UnmergeableEntity {
                reason: "entity does not serialize to an object".to_string(),
            }
            .into());
        };

        let adopt_newer = remote.updated_at() >= local.updated_at();
        for (field, remote_field) in remote_map {
            if field.as_str() == "id" || field.as_str() == "uuid" {
                continue;
            }
            if remote_field.is_null() {
                continue; // a defined value beats null in either direction
            }
            let adopt = match local_map.get(field) {
                None | Some(Value::Null) => true,
                Some(local_field) => local_field != remote_field && adopt_newer,
            };
            if adopt {
                local_map.insert(field.clone(), remote_field.clone());
            }
        }

        let mut merged: T = serde_json::from_value(local_value)?;
        merged.set_updated_at(max_instant(local.updated_at(), remote.updated_at()));
        let version = local.version().unwrap_or(0).max(remote.version().unwrap_or(0));
        merged.set_version(Some(version + 1));
        Ok(merged)
    }
}

/// Exactly one side deleted: the side with the greater write time wins, so a
/// deletion sticks unless the live side was written strictly later.
fn tombstone_asymmetry<T: Syncable>(local: &T, remote: &T) -> Option<Outcome> {
    if local.is_deleted() == remote.is_deleted() {
        return None;
    }
    if remote.updated_at() > local.updated_at() {
        Some(Outcome::TakeRemote)
    } else {
        Some(Outcome::TakeLocal)
    }
}

/// Strict vector-clock dominance on every key decides outright; concurrent
/// or absent clocks fall through.
fn causal_dominance<T: Syncable>(local: &T, remote: &T) -> Option<Outcome> {
    let (lc, rc) = (local.vector_clock()?, remote.vector_clock()?);
    if lc.dominates(rc) {
        Some(Outcome::TakeLocal)
    } else if rc.dominates(lc) {
        Some(Outcome::TakeRemote)
    } else {
        None
    }
}

/// Higher version counter wins; equal or absent versions fall through.
fn version_precedence<T: Syncable>(local: &T, remote: &T) -> Option<Outcome> {
    let (lv, rv) = (local.version()?, remote.version()?);
    if lv > rv {
        Some(Outcome::TakeLocal)
    } else if rv > lv {
        Some(Outcome::TakeRemote)
    } else {
        None
    }
}

fn max_instant(a: DateTime<Utc>, b: DateTime<Utc>) -> DateTime<Utc> {
    if a >= b {
        a
    } else {
        b
    }
}
