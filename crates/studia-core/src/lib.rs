//! # studia-core
//!
//! Foundation crate for the studia weekly planner.
//! Defines entities, sync metadata, the scheduling policy, rationale records,
//! errors, and the trait seams the other crates implement.
//! Every other crate in the workspace depends on this.

pub mod clock;
pub mod config;
pub mod entity;
pub mod errors;
pub mod plan;
pub mod rationale;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use clock::VectorClock;
pub use config::{Policy, PolicyPatch, SyncConfig, TimeOfDay};
pub use entity::{Constraint, Goal, GoalStatus, Priority, SyncMeta};
pub use errors::{StudiaError, StudiaResult};
pub use plan::{DayOfWeek, DayPlan, Slot, SlotKind};
pub use rationale::{DecisionCode, Rationale, RationaleContext, RationaleEngine};
pub use traits::{MergeKey, SettingRecord, SyncStore, Syncable};
