//! Alert repository: append-only history with read/dismiss status updates.

use crate::db::{decode_optional_timestamp, decode_timestamp, encode_timestamp, Database, DbError};
use chrono::{DateTime, Utc};
use nichepulse_core::{Alert, AlertSeverity, AlertStatus, AlertType};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

/// Filtering and pagination for alert listings.
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    pub status: Option<AlertStatus>,
    /// Defaults to 50.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const ALERT_COLUMNS: &str = "id, alert_type, severity, status, niche_id, keyword, title, \
                             description, recommended_action, metric_changed, previous_value, \
                             current_value, change_delta, change_percent, created_at, read_at, \
                             related_url";

fn map_alert_row(row: &SqliteRow) -> Result<Alert, DbError> {
    let alert_type: String = row.try_get("alert_type")?;
    let severity: String = row.try_get("severity")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let read_at: Option<String> = row.try_get("read_at")?;

    Ok(Alert {
        id: row.try_get("id")?,
        alert_type: AlertType::parse(&alert_type)
            .ok_or_else(|| DbError::Corrupt(format!("unknown alert type {alert_type:?}")))?,
        severity: AlertSeverity::parse(&severity)
            .ok_or_else(|| DbError::Corrupt(format!("unknown severity {severity:?}")))?,
        status: AlertStatus::parse(&status)
            .ok_or_else(|| DbError::Corrupt(format!("unknown status {status:?}")))?,
        niche_id: row.try_get("niche_id")?,
        keyword: row.try_get("keyword")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        recommended_action: row.try_get("recommended_action")?,
        metric_changed: row.try_get("metric_changed")?,
        previous_value: row.try_get("previous_value")?,
        current_value: row.try_get("current_value")?,
        change_delta: row.try_get("change_delta")?,
        change_percent: row.try_get("change_percent")?,
        created_at: decode_timestamp(&created_at)?,
        read_at: decode_optional_timestamp(read_at)?,
        related_url: row.try_get("related_url")?,
    })
}

impl Database {
    /// Append alerts to a user's history. Idempotent by alert id: replays of
    /// the same run are absorbed, not duplicated.
    pub async fn append_alerts(&self, user_id: &str, alerts: &[Alert]) -> Result<(), DbError> {
        for alert in alerts {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO alerts (
                    id, user_id, alert_type, severity, status, niche_id, keyword,
                    title, description, recommended_action, metric_changed,
                    previous_value, current_value, change_delta, change_percent,
                    created_at, read_at, related_url
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&alert.id)
            .bind(user_id)
            .bind(alert.alert_type.as_str())
            .bind(alert.severity.as_str())
            .bind(alert.status.as_str())
            .bind(&alert.niche_id)
            .bind(&alert.keyword)
            .bind(&alert.title)
            .bind(&alert.description)
            .bind(&alert.recommended_action)
            .bind(&alert.metric_changed)
            .bind(alert.previous_value)
            .bind(alert.current_value)
            .bind(alert.change_delta)
            .bind(alert.change_percent)
            .bind(encode_timestamp(alert.created_at))
            .bind(alert.read_at.map(encode_timestamp))
            .bind(&alert.related_url)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                debug!(alert_id = %alert.id, "duplicate alert insert absorbed");
            }
        }
        Ok(())
    }

    /// List a user's alerts, newest first.
    pub async fn list_alerts(
        &self,
        user_id: &str,
        query: &AlertQuery,
    ) -> Result<Vec<Alert>, DbError> {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);

        let rows = match query.status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {ALERT_COLUMNS} FROM alerts \
                     WHERE user_id = ? AND status = ? \
                     ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
                ))
                .bind(user_id)
                .bind(status.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {ALERT_COLUMNS} FROM alerts \
                     WHERE user_id = ? \
                     ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
                ))
                .bind(user_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(map_alert_row).collect()
    }

    /// Alerts created at or after `since`, for the dedup history read.
    pub async fn recent_alerts(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts \
             WHERE user_id = ? AND created_at >= ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(encode_timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_alert_row).collect()
    }

    /// Mark specific alerts read. Only Unread alerts transition; returns the
    /// number updated.
    pub async fn mark_read(&self, user_id: &str, alert_ids: &[String]) -> Result<u64, DbError> {
        let now = encode_timestamp(Utc::now());
        let mut updated = 0u64;
        for alert_id in alert_ids {
            let result = sqlx::query(
                "UPDATE alerts SET status = 'READ', read_at = ? \
                 WHERE user_id = ? AND id = ? AND status = 'UNREAD'",
            )
            .bind(&now)
            .bind(user_id)
            .bind(alert_id)
            .execute(&self.pool)
            .await?;
            updated += result.rows_affected();
        }
        Ok(updated)
    }

    /// Mark every Unread alert read; returns the number updated.
    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64, DbError> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'READ', read_at = ? \
             WHERE user_id = ? AND status = 'UNREAD'",
        )
        .bind(encode_timestamp(Utc::now()))
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Dismiss an alert; returns whether it was found.
    pub async fn dismiss_alert(&self, user_id: &str, alert_id: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'DISMISSED' WHERE user_id = ? AND id = ?",
        )
        .bind(user_id)
        .bind(alert_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count of Unread alerts, for the dashboard bell.
    pub async fn unread_count(&self, user_id: &str) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM alerts WHERE user_id = ? AND status = 'UNREAD'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
