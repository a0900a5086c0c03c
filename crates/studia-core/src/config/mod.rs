//! Tunable configuration records.
//!
//! Both records use `#[serde(default)]` so stored copies written by older
//! versions deserialize cleanly with new fields at their defaults.

pub mod policy;
pub mod sync_config;

pub use policy::{Policy, PolicyPatch, TimeOfDay};
pub use sync_config::SyncConfig;
