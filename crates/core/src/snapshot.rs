//! Point-in-time niche metric snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("non-finite {field} for niche {niche_id}")]
    NonFiniteScore { field: &'static str, niche_id: String },
}

/// One time-stamped set of scores for a tracked niche.
///
/// Produced by the scoring subsystem on every (re-)analysis and consumed
/// read-only by the alert evaluator. All scores are 0-100; `saturation_score`
/// is inverted (lower = fresher).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NicheMetricsSnapshot {
    pub niche_id: String,
    pub keyword: String,
    pub captured_at: DateTime<Utc>,
    /// Overall entry potential.
    pub opportunity_index: f64,
    /// Trend velocity / breakout score.
    pub radar_score: f64,
    /// Revenue potential.
    pub monetization_score: f64,
    /// Market saturation / difficulty.
    pub competition_score: f64,
    /// Search volume / interest.
    pub demand_score: f64,
    /// Relative growth speed.
    pub growth_score: f64,
    /// Inverse saturation; below 40 means a freshness window is open.
    pub saturation_score: f64,
}

impl NicheMetricsSnapshot {
    /// Reject snapshots carrying NaN or infinite scores before they reach
    /// the evaluator.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let fields: [(&'static str, f64); 7] = [
            ("opportunity_index", self.opportunity_index),
            ("radar_score", self.radar_score),
            ("monetization_score", self.monetization_score),
            ("competition_score", self.competition_score),
            ("demand_score", self.demand_score),
            ("growth_score", self.growth_score),
            ("saturation_score", self.saturation_score),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(SnapshotError::NonFiniteScore {
                    field,
                    niche_id: self.niche_id.clone(),
                });
            }
        }
        Ok(())
    }
}
