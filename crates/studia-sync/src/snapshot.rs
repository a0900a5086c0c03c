//! The wire format: a full-state sync snapshot.
//!
//! No delta protocol — every exchange carries the complete current set of
//! goals, constraints, and settings. The resolver is idempotent and
//! commutative, so full-state resend is safe.
//!
//! Entities travel as raw JSON values and are validated at decode time:
//! an entity with a malformed id (non-numeric, null) is dropped with a
//! warning while the rest of the batch still merges.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use studia_core::traits::SettingRecord;

/// Full-state snapshot exchanged between two peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSnapshot {
    /// Durable device id of the sender.
    pub source_device: String,
    /// True when this snapshot answers another snapshot. A response must
    /// never itself trigger another response.
    pub is_response: bool,
    pub sent_at: DateTime<Utc>,
    pub goals: Vec<Value>,
    pub constraints: Vec<Value>,
    pub settings: Vec<SettingRecord>,
}

/// Decode a batch of wire entities, dropping malformed items per-item.
pub fn decode_entities<T: DeserializeOwned>(kind: &str, items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|raw| {
            if !has_valid_id(raw) {
                warn!(kind, "dropping incoming entity with malformed id");
                return None;
            }
            match serde_json::from_value(raw.clone()) {
                Ok(entity) => Some(entity),
                Err(err) => {
                    warn!(kind, %err, "dropping undecodable incoming entity");
                    None
                }
            }
        })
        .collect()
}

/// Valid identity: a string uuid, or a numeric id.
fn has_valid_id(raw: &Value) -> bool {
    if raw.get("uuid").map_or(false, Value::is_string) {
        return true;
    }
    raw.get("id").map_or(false, Value::is_i64)
}

/// Encode a typed entity list for the wire.
pub fn encode_entities<T: Serialize>(entities: &[T]) -> serde_json::Result<Vec<Value>> {
    entities.iter().map(serde_json::to_value).collect()
}
