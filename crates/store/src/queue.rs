//! Notification queue repository.

use crate::db::{decode_optional_timestamp, decode_timestamp, encode_timestamp, Database, DbError};
use chrono::{DateTime, Utc};
use nichepulse_core::{NotificationChannel, NotificationQueueItem, QueueStats};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info};

fn map_queue_row(row: &SqliteRow) -> Result<NotificationQueueItem, DbError> {
    let alert_json: String = row.try_get("alert_json")?;
    let channel: String = row.try_get("channel")?;
    let scheduled_for: String = row.try_get("scheduled_for")?;
    let delivered_at: Option<String> = row.try_get("delivered_at")?;

    Ok(NotificationQueueItem {
        id: row.try_get("id")?,
        alert: serde_json::from_str(&alert_json)
            .map_err(|e| DbError::Corrupt(format!("bad alert payload: {e}")))?,
        user_id: row.try_get("user_id")?,
        scheduled_for: decode_timestamp(&scheduled_for)?,
        delivered: row.try_get("delivered")?,
        delivered_at: decode_optional_timestamp(delivered_at)?,
        channel: NotificationChannel::parse(&channel)
            .ok_or_else(|| DbError::Corrupt(format!("unknown channel {channel:?}")))?,
    })
}

impl Database {
    /// Enqueue a scheduled delivery. Idempotent by item id: a retried run
    /// re-enqueueing the same alert/channel pair is absorbed.
    pub async fn enqueue(&self, item: &NotificationQueueItem) -> Result<(), DbError> {
        let alert_json = serde_json::to_string(&item.alert)
            .map_err(|e| DbError::Corrupt(format!("unserializable alert: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO notification_queue (
                id, user_id, alert_json, channel, scheduled_for, delivered, delivered_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.user_id)
        .bind(&alert_json)
        .bind(item.channel.as_str())
        .bind(encode_timestamp(item.scheduled_for))
        .bind(item.delivered)
        .bind(item.delivered_at.map(encode_timestamp))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(item_id = %item.id, "duplicate queue insert absorbed");
        }
        Ok(())
    }

    /// Undelivered items due at or before `as_of`, for one user and channel.
    pub async fn due_undelivered(
        &self,
        user_id: &str,
        channel: NotificationChannel,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<NotificationQueueItem>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, alert_json, channel, scheduled_for, delivered, delivered_at
            FROM notification_queue
            WHERE user_id = ? AND channel = ? AND delivered = 0 AND scheduled_for <= ?
            ORDER BY scheduled_for ASC
            "#,
        )
        .bind(user_id)
        .bind(channel.as_str())
        .bind(encode_timestamp(as_of))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_queue_row).collect()
    }

    /// Acknowledge delivery of a queue item.
    pub async fn mark_delivered(&self, item_id: &str) -> Result<(), DbError> {
        sqlx::query(
            "UPDATE notification_queue SET delivered = 1, delivered_at = ? WHERE id = ?",
        )
        .bind(encode_timestamp(Utc::now()))
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove delivered items; returns how many were purged.
    pub async fn purge_delivered(&self) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM notification_queue WHERE delivered = 1")
            .execute(&self.pool)
            .await?;
        let purged = result.rows_affected();
        if purged > 0 {
            info!(purged, "purged delivered notifications");
        }
        Ok(purged)
    }

    /// Queue-wide counters.
    pub async fn queue_stats(&self) -> Result<QueueStats, DbError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notification_queue")
            .fetch_one(&self.pool)
            .await?;
        let delivered = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notification_queue WHERE delivered = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(QueueStats {
            pending: total - delivered,
            delivered,
            total,
        })
    }
}
