//! SQLite-backed repositories for alerts, the notification queue, and user
//! preferences.
//!
//! One cloneable [`Database`] handle owns the pool; repository operations are
//! grouped per entity in the `alerts`, `queue`, and `preferences` modules.
//! Row mapping is isolated to a single function per entity, keeping the
//! domain types in `nichepulse-core` storage-agnostic.

mod alerts;
mod db;
mod preferences;
mod queue;

pub use alerts::AlertQuery;
pub use db::{Database, DbError};
