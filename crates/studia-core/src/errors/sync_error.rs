/// Sync-layer errors: peer connections and snapshot exchange.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("connection to peer {peer} failed: {reason}")]
    ConnectFailed { peer: String, reason: String },

    #[error("connection attempt to peer {peer} timed out")]
    ConnectTimeout { peer: String },

    #[error("peer identifier {peer} is already in use")]
    DuplicateIdentifier { peer: String },

    #[error("channel to peer {peer} is closed")]
    ChannelClosed { peer: String },

    #[error("malformed sync snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    #[error("entity cannot be merged: {reason}")]
    UnmergeableEntity { reason: String },

    #[error("sync agent is not ready")]
    NotReady,
}
