//! Policy persistence, layered on the settings table under one well-known
//! key so policy changes ride the ordinary settings sync path.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use studia_core::config::policy::POLICY_SETTING_KEY;
use studia_core::config::{Policy, PolicyPatch};
use studia_core::errors::StudiaResult;
use studia_core::traits::{SettingRecord, SyncStore};

use crate::event_log::EventType;
use crate::store::PlannerStore;

/// Load the stored policy. Missing means defaults; a malformed stored value
/// also falls back to defaults rather than taking the scheduler down.
pub fn load_policy(store: &PlannerStore) -> StudiaResult<Policy> {
    match store.get_setting(POLICY_SETTING_KEY)? {
        Some(record) => match serde_json::from_value(record.value) {
            Ok(policy) => Ok(policy),
            Err(err) => {
                warn!(%err, "stored policy is malformed, using defaults");
                Ok(Policy::default())
            }
        },
        None => Ok(Policy::default()),
    }
}

pub fn save_policy(store: &PlannerStore, policy: &Policy, now: DateTime<Utc>) -> StudiaResult<()> {
    store.upsert_setting(&SettingRecord {
        key: POLICY_SETTING_KEY.to_string(),
        value: serde_json::to_value(policy)?,
        updated_at: now,
    })
}

/// Apply a partial policy update and persist the result. An empty patch is a
/// no-op; a real change is recorded in the event log.
pub fn apply_policy_patch(
    store: &PlannerStore,
    patch: &PolicyPatch,
    now: DateTime<Utc>,
) -> StudiaResult<Policy> {
    let mut policy = load_policy(store)?;
    if patch.is_empty() {
        return Ok(policy);
    }
    patch.apply(&mut policy);
    save_policy(store, &policy, now)?;
    store.append_event(
        EventType::PolicyChanged,
        now,
        Some(&serde_json::to_value(patch)?),
    )?;
    info!("planner policy updated");
    Ok(policy)
}
