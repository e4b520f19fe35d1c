//! Core data types for the NichePulse alert pipeline.

pub mod alert;
pub mod preferences;
pub mod queue;
pub mod snapshot;

pub use alert::*;
pub use preferences::*;
pub use queue::*;
pub use snapshot::*;
