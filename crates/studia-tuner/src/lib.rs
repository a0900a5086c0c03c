//! # studia-tuner
//!
//! Adaptive policy tuning. [`AutoTuner`] reads the event log, buckets focus
//! session outcomes by time of day, and nudges the corresponding placement
//! weights: buckets where the user reliably completes sessions get heavier,
//! buckets where sessions are mostly postponed or cancelled get lighter.

pub mod tuner;

pub use tuner::{AutoTuner, BucketStats, TuneReport};
