//! Database handle and migrations.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Database connection for the alert pipeline.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Connect to SQLite at the given URL (`sqlite::memory:` for tests).
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                alert_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'UNREAD',
                niche_id TEXT NOT NULL,
                keyword TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                recommended_action TEXT NOT NULL,
                metric_changed TEXT NOT NULL,
                previous_value REAL NOT NULL,
                current_value REAL NOT NULL,
                change_delta REAL NOT NULL,
                change_percent REAL NOT NULL,
                created_at TEXT NOT NULL,
                read_at TEXT,
                related_url TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_alerts_user_created
            ON alerts(user_id, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Covers the dedup history read: (user, niche, type) within a window.
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_alerts_dedup
            ON alerts(user_id, niche_id, alert_type, created_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notification_queue (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                alert_json TEXT NOT NULL,
                channel TEXT NOT NULL,
                scheduled_for TEXT NOT NULL,
                delivered INTEGER NOT NULL DEFAULT 0,
                delivered_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_queue_due
            ON notification_queue(user_id, channel, delivered, scheduled_for)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alert_preferences (
                user_id TEXT PRIMARY KEY,
                enabled_alert_types TEXT NOT NULL,
                minimum_severity TEXT NOT NULL,
                notification_frequency TEXT NOT NULL,
                per_niche_settings TEXT NOT NULL DEFAULT '[]',
                email_enabled INTEGER NOT NULL DEFAULT 0,
                in_app_enabled INTEGER NOT NULL DEFAULT 1,
                thresholds TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Timestamps persist as RFC 3339 text; fixed UTC offset keeps string
/// comparison consistent with time ordering.
pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub(crate) fn decode_timestamp(s: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Corrupt(format!("bad timestamp {s:?}: {e}")))
}

pub(crate) fn decode_optional_timestamp(
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, DbError> {
    s.as_deref().map(decode_timestamp).transpose()
}
