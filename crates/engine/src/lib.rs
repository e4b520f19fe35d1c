//! Pure alert evaluation for niche metric snapshots.
//!
//! This crate provides:
//! - threshold-crossing rule evaluation between two snapshots
//! - time-windowed deduplication against alert history
//! - layered (global + per-niche) preference filtering
//!
//! Everything here is deterministic and free of I/O; persistence and
//! scheduling live in the store and notify crates.

pub mod dedup;
pub mod evaluator;
pub mod filter;

pub use dedup::{deduplicate, DEFAULT_DEDUP_WINDOW_HOURS};
pub use evaluator::{evaluate, evaluate_first_seen, EvaluateError};
pub use filter::filter_by_preferences;
