//! Configuration for the peer-to-peer sync agent.

use serde::{Deserialize, Serialize};

/// Sync agent tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Coalescing window between a local change and the broadcast. Default: 300.
    pub debounce_ms: i64,
    /// Outbound connection attempt timeout. Default: 10_000.
    pub connect_timeout_ms: i64,
    /// Two writes closer than this merge field-by-field instead of
    /// last-write-wins. Default: 1000.
    pub field_merge_window_ms: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            connect_timeout_ms: 10_000,
            field_merge_window_ms: 1000,
        }
    }
}
