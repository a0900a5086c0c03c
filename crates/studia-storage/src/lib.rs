//! # studia-storage
//!
//! SQLite persistence for the planner. [`PlannerStore`] owns the connection
//! and exposes CRUD for goals, constraints and settings, a policy layer, and
//! an append-only event log. Deletion is always soft: rows are tombstoned
//! with `is_deleted`, never removed, so deletions propagate between devices.
//!
//! ## Examples
//!
//! ```no_run
//! use studia_core::traits::SyncStore;
//! use studia_storage::PlannerStore;
//!
//! let store = PlannerStore::open("planner.db")?;
//! let goals = store.load_goals()?;
//! # Ok::<(), studia_core::StudiaError>(())
//! ```

pub mod event_log;
pub mod migrations;
pub mod policy_store;
pub mod store;

pub use event_log::{EventRecord, EventType};
pub use policy_store::{apply_policy_patch, load_policy, save_policy};
pub use store::PlannerStore;
