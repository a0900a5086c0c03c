//! # studia-sync
//!
//! Peer-to-peer synchronization and conflict resolution.
//!
//! [`ConflictResolver`] merges divergent copies of one entity through a chain
//! of independent comparison strategies (tombstone, vector clock, version,
//! last-write-wins with a field-merge window). [`merge_lists`] lifts that to
//! whole entity lists. [`SyncAgent`] owns the peer connection lifecycle and
//! the full-state snapshot exchange.
//!
//! Resolution is commutative and idempotent, so repeated or reordered
//! full-state exchanges converge.

pub mod agent;
pub mod list_merge;
pub mod resolver;
pub mod snapshot;

pub use agent::{AgentState, PeerChannel, PeerState, SyncAgent};
pub use list_merge::merge_lists;
pub use resolver::ConflictResolver;
pub use snapshot::{decode_entities, SyncSnapshot};
