//! Weight tuning from bucketed session outcomes.
//!
//! A focus session ends in one of three ways: completed, postponed, or
//! cancelled. Per time-of-day bucket, the completion ratio over the analyzed
//! window decides the adjustment: consistently completed buckets gain weight,
//! consistently abandoned buckets lose it, everything in between is left
//! alone. Buckets with too few observations are never touched.

use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, info};

use studia_core::config::{Policy, PolicyPatch, TimeOfDay};
use studia_core::errors::{StudiaResult, TunerError};
use studia_storage::{apply_policy_patch, load_policy, EventType, PlannerStore};

/// Session outcome counts for one time-of-day bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub completed: usize,
    pub abandoned: usize,
}

impl BucketStats {
    pub fn total(&self) -> usize {
        self.completed + self.abandoned
    }

    pub fn completion_ratio(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total() as f64
    }
}

/// Outcome of one tuning run.
#[derive(Debug, Clone)]
pub struct TuneReport {
    pub stats: [BucketStats; 3],
    pub patch: PolicyPatch,
    pub applied: bool,
}

pub struct AutoTuner {
    /// Buckets with fewer observations than this are left untouched.
    pub min_events_per_bucket: usize,
    /// Completion ratio at or above which a bucket's weight is raised.
    pub raise_threshold: f64,
    /// Completion ratio at or below which a bucket's weight is lowered.
    pub lower_threshold: f64,
    /// Weight adjustment per run, clamped to the policy's weight bounds.
    pub step: f64,
}

impl Default for AutoTuner {
    fn default() -> Self {
        Self {
            min_events_per_bucket: 5,
            raise_threshold: 0.7,
            lower_threshold: 0.3,
            step: 0.1,
        }
    }
}

impl AutoTuner {
    /// Analyze the event log over `[from, to)` and apply any resulting
    /// weight adjustments through the policy store. A log read failure
    /// leaves the stored policy exactly as it was.
    pub fn run(
        &self,
        store: &PlannerStore,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StudiaResult<TuneReport> {
        let events = store
            .events_between(from, to)
            .map_err(|err| TunerError::LogReadFailed {
                reason: err.to_string(),
            })?;
        let policy = load_policy(store)?;

        let mut stats = [BucketStats::default(); 3];
        for event in &events {
            let outcome = match event.event_type {
                EventType::FocusCompleted => Outcome::Completed,
                EventType::SessionPostponed | EventType::SessionCancelled => Outcome::Abandoned,
                _ => continue,
            };
            let minute = event.occurred_at.hour() * 60 + event.occurred_at.minute();
            let bucket = policy.bucket_of(minute);
            let slot = &mut stats[bucket_index(bucket)];
            match outcome {
                Outcome::Completed => slot.completed += 1,
                Outcome::Abandoned => slot.abandoned += 1,
            }
        }

        let patch = self.propose(&policy, &stats);
        let applied = !patch.is_empty();
        if applied {
            apply_policy_patch(store, &patch, now)?;
            info!(?patch, "tuned placement weights");
        } else {
            debug!("no bucket met the tuning thresholds");
        }
        Ok(TuneReport { stats, patch, applied })
    }

    /// Derive the weight patch without touching storage.
    pub fn propose(&self, policy: &Policy, stats: &[BucketStats; 3]) -> PolicyPatch {
        let mut patch = PolicyPatch::default();
        for bucket in TimeOfDay::ALL {
            let stat = stats[bucket_index(bucket)];
            if stat.total() < self.min_events_per_bucket {
                continue;
            }
            let ratio = stat.completion_ratio();
            let current = policy.weight(bucket);
            let adjusted = if ratio >= self.raise_threshold {
                policy.clamp_weight(current + self.step)
            } else if ratio <= self.lower_threshold {
                policy.clamp_weight(current - self.step)
            } else {
                continue;
            };
            if (adjusted - current).abs() < f64::EPSILON {
                continue;
            }
            debug!(
                bucket = bucket.as_str(),
                ratio, current, adjusted, "bucket weight adjustment"
            );
            match bucket {
                TimeOfDay::Morning => patch.morning_weight = Some(adjusted),
                TimeOfDay::Midday => patch.midday_weight = Some(adjusted),
                TimeOfDay::Evening => patch.evening_weight = Some(adjusted),
            }
        }
        patch
    }
}

enum Outcome {
    Completed,
    Abandoned,
}

fn bucket_index(bucket: TimeOfDay) -> usize {
    match bucket {
        TimeOfDay::Morning => 0,
        TimeOfDay::Midday => 1,
        TimeOfDay::Evening => 2,
    }
}
