//! The per-user evaluation run.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use nichepulse_core::{
    Alert, NicheMetricsSnapshot, NotificationChannel, NotificationFrequency,
    NotificationQueueItem,
};
use nichepulse_engine::{
    deduplicate, evaluate, evaluate_first_seen, filter_by_preferences,
    DEFAULT_DEDUP_WINDOW_HOURS,
};
use nichepulse_notify::schedule_notification;
use nichepulse_store::{AlertQuery, Database, DbError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("evaluation already running for user {0}")]
    RunInProgress(String),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// A niche that was skipped without aborting the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWarning {
    pub niche_id: String,
    pub message: String,
}

/// Outcome of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Alerts that survived dedup and preference filtering, now persisted.
    pub generated_alerts: Vec<Alert>,
    pub queued_notifications: Vec<NotificationQueueItem>,
    /// Candidates dropped by dedup or preferences.
    pub suppressed_count: usize,
    pub warnings: Vec<RunWarning>,
    pub processed_at: DateTime<Utc>,
}

/// Unread-alert state for dashboard polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsState {
    pub alerts: Vec<Alert>,
    pub unread_count: i64,
    pub last_checked_at: DateTime<Utc>,
}

/// Orchestrates evaluation runs and exposes the read surface.
///
/// Runs for different users may execute concurrently; a second run for the
/// same user while one is in flight is skipped with
/// [`PipelineError::RunInProgress`]. The next scheduled interval retries,
/// which is safe because persistence and enqueueing are idempotent.
pub struct AlertPipeline {
    db: Database,
    active_runs: Arc<DashMap<String, ()>>,
}

impl AlertPipeline {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            active_runs: Arc::new(DashMap::new()),
        }
    }

    /// Direct access to the repositories, for transports fronting the store.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Evaluate one user's snapshots and persist/enqueue the surviving
    /// alerts.
    ///
    /// Per-niche failures (malformed snapshots, missing data) become warnings
    /// and never abort the rest of the run; repository errors propagate and
    /// the whole run is retried at the next interval.
    pub async fn run_evaluation(
        &self,
        user_id: &str,
        current_snapshots: &[NicheMetricsSnapshot],
        previous_snapshots: &[NicheMetricsSnapshot],
    ) -> Result<RunSummary, PipelineError> {
        let _guard = RunGuard::acquire(&self.active_runs, user_id)
            .ok_or_else(|| PipelineError::RunInProgress(user_id.to_string()))?;

        let now = Utc::now();
        let preferences = self.db.preferences(user_id).await?;
        // One history read per run; it must see all alerts committed by prior
        // runs for the dedup window to hold.
        let history = self
            .db
            .recent_alerts(user_id, now - Duration::hours(DEFAULT_DEDUP_WINDOW_HOURS))
            .await?;

        let mut candidates: Vec<Alert> = Vec::new();
        let mut warnings: Vec<RunWarning> = Vec::new();

        for current in current_snapshots {
            let previous = previous_snapshots
                .iter()
                .find(|p| p.niche_id == current.niche_id);

            let evaluated = match previous {
                Some(previous) => evaluate(previous, current, &preferences.thresholds, now),
                None => evaluate_first_seen(current, &preferences.thresholds, now)
                    .map(|alert| alert.into_iter().collect()),
            };

            match evaluated {
                Ok(mut alerts) => candidates.append(&mut alerts),
                Err(e) => {
                    warn!(
                        user_id,
                        niche_id = %current.niche_id,
                        error = %e,
                        "skipping niche evaluation"
                    );
                    warnings.push(RunWarning {
                        niche_id: current.niche_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let total_candidates = candidates.len();
        let unique = deduplicate(candidates, &history, DEFAULT_DEDUP_WINDOW_HOURS, now);
        let surviving = filter_by_preferences(unique, &preferences);
        let suppressed_count = total_candidates - surviving.len();

        let mut queued_notifications = Vec::new();
        if !surviving.is_empty() {
            self.db.append_alerts(user_id, &surviving).await?;

            for alert in &surviving {
                if preferences.in_app_enabled {
                    let item = schedule_notification(
                        alert,
                        user_id,
                        NotificationFrequency::Instant,
                        NotificationChannel::InApp,
                        now,
                    );
                    self.db.enqueue(&item).await?;
                    queued_notifications.push(item);
                }
                if preferences.email_enabled {
                    let item = schedule_notification(
                        alert,
                        user_id,
                        preferences.notification_frequency,
                        NotificationChannel::Email,
                        now,
                    );
                    self.db.enqueue(&item).await?;
                    queued_notifications.push(item);
                }
            }
        }

        info!(
            user_id,
            generated = surviving.len(),
            suppressed = suppressed_count,
            warnings = warnings.len(),
            "alert evaluation run complete"
        );

        Ok(RunSummary {
            generated_alerts: surviving,
            queued_notifications,
            suppressed_count,
            warnings,
            processed_at: now,
        })
    }

    /// Current unread alerts and count for the dashboard bell.
    pub async fn notifications(&self, user_id: &str) -> Result<AlertsState, PipelineError> {
        let alerts = self
            .db
            .list_alerts(
                user_id,
                &AlertQuery {
                    status: Some(nichepulse_core::AlertStatus::Unread),
                    limit: Some(50),
                    offset: None,
                },
            )
            .await?;
        let unread_count = self.db.unread_count(user_id).await?;

        Ok(AlertsState {
            alerts,
            unread_count,
            last_checked_at: Utc::now(),
        })
    }

    /// Full filterable history for the audit view.
    pub async fn alert_history(
        &self,
        user_id: &str,
        query: &AlertQuery,
    ) -> Result<Vec<Alert>, PipelineError> {
        Ok(self.db.list_alerts(user_id, query).await?)
    }
}

/// Marks a user's run as in flight; the entry is removed on drop so a failed
/// run cannot wedge the user.
struct RunGuard {
    active_runs: Arc<DashMap<String, ()>>,
    user_id: String,
}

impl RunGuard {
    fn acquire(active_runs: &Arc<DashMap<String, ()>>, user_id: &str) -> Option<Self> {
        match active_runs.entry(user_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(());
                Some(Self {
                    active_runs: Arc::clone(active_runs),
                    user_id: user_id.to_string(),
                })
            }
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active_runs.remove(&self.user_id);
    }
}
