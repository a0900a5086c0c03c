//! Trait seams implemented by the storage and sync crates.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::VectorClock;
use crate::errors::StudiaResult;

/// Key used to match entities across devices: stable uuid when present,
/// otherwise the storage-assigned numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MergeKey {
    Uuid(String),
    Id(i64),
}

/// The invariant every synced entity upholds: it carries a logical write
/// time, an optional version, a soft-delete flag, and an optional vector
/// clock, and it round-trips through serde (the resolver's field-level
/// merge works on the serialized map).
pub trait Syncable: Clone + Serialize + DeserializeOwned {
    fn merge_key(&self) -> MergeKey;
    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);
    fn version(&self) -> Option<u64>;
    fn set_version(&mut self, version: Option<u64>);
    fn is_deleted(&self) -> bool;
    fn vector_clock(&self) -> Option<&VectorClock>;
}

/// A single keyed settings record. Settings carry no vector clock; they
/// merge by plain last-write-wins on `updated_at`, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Storage surface the sync agent works through. The agent never touches
/// SQL; the storage crate implements this.
pub trait SyncStore: Send + Sync {
    fn load_goals(&self) -> StudiaResult<Vec<crate::entity::Goal>>;
    fn load_constraints(&self) -> StudiaResult<Vec<crate::entity::Constraint>>;
    fn load_settings(&self) -> StudiaResult<Vec<SettingRecord>>;

    /// Replace-or-insert by id; each call is one storage transaction.
    fn upsert_goals(&self, goals: &[crate::entity::Goal]) -> StudiaResult<()>;
    fn upsert_constraints(&self, constraints: &[crate::entity::Constraint]) -> StudiaResult<()>;
    fn upsert_setting(&self, record: &SettingRecord) -> StudiaResult<()>;

    fn get_setting(&self, key: &str) -> StudiaResult<Option<SettingRecord>>;
}
