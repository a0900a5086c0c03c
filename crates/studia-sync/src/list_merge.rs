//! List-level merge: resolve matching entities, pass the rest through.
//!
//! Soft-deleted entities are retained in the merged output — filtering
//! tombstones for display is the caller's responsibility. Applying the same
//! remote list twice is a no-op the second time.

use std::collections::HashMap;

use studia_core::errors::StudiaResult;
use studia_core::traits::{MergeKey, Syncable};

use crate::resolver::ConflictResolver;

/// Merge a remote entity list into the local one. Local order is preserved;
/// entities present only on the remote are appended in remote order.
pub fn merge_lists<T: Syncable>(
    resolver: &ConflictResolver,
    local: &[T],
    remote: &[T],
) -> StudiaResult<Vec<T>> {
    let mut merged: Vec<T> = local.to_vec();
    let mut index: HashMap<MergeKey, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, e)| (e.merge_key(), i))
        .collect();

    for incoming in remote {
        match index.get(&incoming.merge_key()) {
            Some(&i) => {
                merged[i] = resolver.resolve(&merged[i], incoming)?;
            }
            None => {
                index.insert(incoming.merge_key(), merged.len());
                merged.push(incoming.clone());
            }
        }
    }
    Ok(merged)
}
