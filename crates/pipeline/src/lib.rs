//! Run orchestration for the alert evaluation pipeline.
//!
//! One [`runner::AlertPipeline`] wires the pure engine to the store and the
//! scheduler: evaluate -> deduplicate -> filter -> persist -> enqueue, once
//! per user per evaluation cycle.

pub mod runner;

pub use runner::{AlertPipeline, AlertsState, PipelineError, RunSummary, RunWarning};
