//! Vector clock: per-device counter map used to detect causal dominance
//! between two versions of an entity.
//!
//! Merge takes the per-device maximum, so merging is commutative,
//! associative, and idempotent.
//!
//! # Examples
//!
//! ```
//! use studia_core::VectorClock;
//!
//! let mut a = VectorClock::new();
//! a.increment("device-a");
//!
//! let mut b = a.clone();
//! b.increment("device-b");
//!
//! assert!(b.dominates(&a));
//! assert!(!a.dominates(&b));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Device ID → counter. Absent devices are implicitly at 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    counters: HashMap<String, u64>,
}

impl VectorClock {
    /// Create a new empty clock (all devices at 0).
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    /// Increment the counter for the given device by 1.
    pub fn increment(&mut self, device_id: &str) {
        let entry = self.counters.entry(device_id.to_string()).or_insert(0);
        *entry += 1;
    }

    /// Get the counter for a device (0 if absent).
    pub fn get(&self, device_id: &str) -> u64 {
        self.counters.get(device_id).copied().unwrap_or(0)
    }

    /// Iterate over the device IDs this clock has entries for.
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.counters.keys().map(String::as_str)
    }

    /// Merge with another clock: per-device max.
    pub fn merge(&mut self, other: &Self) {
        for (device, &val) in &other.counters {
            let entry = self.counters.entry(device.clone()).or_insert(0);
            *entry = (*entry).max(val);
        }
    }

    /// True when `self` strictly dominates `other`: every entry of `self`
    /// is >= the corresponding entry of `other`, and at least one is >.
    ///
    /// Devices absent from a clock count as 0, so the comparison covers
    /// the union of both key sets.
    pub fn dominates(&self, other: &Self) -> bool {
        let mut strictly_greater = false;
        for device in self.devices().chain(other.devices()) {
            let ours = self.get(device);
            let theirs = other.get(device);
            if ours < theirs {
                return false;
            }
            if ours > theirs {
                strictly_greater = true;
            }
        }
        strictly_greater
    }

    /// True when neither clock dominates the other and they are not equal:
    /// the two versions were produced concurrently.
    pub fn concurrent_with(&self, other: &Self) -> bool {
        !self.dominates(other) && !other.dominates(self) && self != other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_clocks_do_not_dominate() {
        let a = VectorClock::new();
        let b = VectorClock::new();
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
        assert!(!a.concurrent_with(&b)); // equal, not concurrent
    }

    #[test]
    fn strict_dominance_requires_one_greater_entry() {
        let mut a = VectorClock::new();
        a.increment("x");
        let mut b = a.clone();
        b.increment("y");
        assert!(b.dominates(&a));
        assert!(!a.dominates(&b));
    }

    #[test]
    fn divergent_increments_are_concurrent() {
        let mut base = VectorClock::new();
        base.increment("x");
        let mut a = base.clone();
        a.increment("a");
        let mut b = base.clone();
        b.increment("b");
        assert!(a.concurrent_with(&b));
    }

    #[test]
    fn merge_is_per_device_max() {
        let mut a = VectorClock::new();
        a.increment("x");
        a.increment("x");
        let mut b = VectorClock::new();
        b.increment("x");
        b.increment("y");
        a.merge(&b);
        assert_eq!(a.get("x"), 2);
        assert_eq!(a.get("y"), 1);
    }
}
