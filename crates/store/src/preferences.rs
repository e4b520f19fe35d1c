//! Preferences store with lazy default creation.

use crate::db::{Database, DbError};
use nichepulse_core::{
    AlertSeverity, NotificationFrequency, PerNicheAlertSetting, PreferencesUpdate,
    UserAlertPreferences,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

fn map_preferences_row(row: &SqliteRow) -> Result<UserAlertPreferences, DbError> {
    let enabled_alert_types: String = row.try_get("enabled_alert_types")?;
    let minimum_severity: String = row.try_get("minimum_severity")?;
    let notification_frequency: String = row.try_get("notification_frequency")?;
    let per_niche_settings: String = row.try_get("per_niche_settings")?;
    let thresholds: String = row.try_get("thresholds")?;

    Ok(UserAlertPreferences {
        user_id: row.try_get("user_id")?,
        enabled_alert_types: serde_json::from_str(&enabled_alert_types)
            .map_err(|e| DbError::Corrupt(format!("bad enabled_alert_types: {e}")))?,
        minimum_severity: AlertSeverity::parse(&minimum_severity)
            .ok_or_else(|| DbError::Corrupt(format!("unknown severity {minimum_severity:?}")))?,
        notification_frequency: NotificationFrequency::parse(&notification_frequency)
            .ok_or_else(|| {
                DbError::Corrupt(format!("unknown frequency {notification_frequency:?}"))
            })?,
        per_niche_settings: serde_json::from_str(&per_niche_settings)
            .map_err(|e| DbError::Corrupt(format!("bad per_niche_settings: {e}")))?,
        email_enabled: row.try_get("email_enabled")?,
        in_app_enabled: row.try_get("in_app_enabled")?,
        thresholds: serde_json::from_str(&thresholds)
            .map_err(|e| DbError::Corrupt(format!("bad thresholds: {e}")))?,
    })
}

impl Database {
    /// Get a user's preferences, creating the default row on first access.
    pub async fn preferences(&self, user_id: &str) -> Result<UserAlertPreferences, DbError> {
        let existing = sqlx::query(
            "SELECT user_id, enabled_alert_types, minimum_severity, notification_frequency, \
             per_niche_settings, email_enabled, in_app_enabled, thresholds \
             FROM alert_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = existing {
            return map_preferences_row(&row);
        }

        debug!(user_id, "creating default alert preferences");
        let defaults = UserAlertPreferences::default_for(user_id);
        self.save_preferences(&defaults).await?;
        Ok(defaults)
    }

    /// Merge a partial update into the stored preferences. Threshold fields
    /// merge individually; other fields replace wholesale.
    pub async fn update_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> Result<UserAlertPreferences, DbError> {
        let mut prefs = self.preferences(user_id).await?;
        prefs.apply(update);
        self.save_preferences(&prefs).await?;
        Ok(prefs)
    }

    /// Insert or replace the override for one niche.
    pub async fn upsert_niche_override(
        &self,
        user_id: &str,
        setting: PerNicheAlertSetting,
    ) -> Result<UserAlertPreferences, DbError> {
        let mut prefs = self.preferences(user_id).await?;
        prefs.upsert_niche_setting(setting);
        self.save_preferences(&prefs).await?;
        Ok(prefs)
    }

    async fn save_preferences(&self, prefs: &UserAlertPreferences) -> Result<(), DbError> {
        let enabled_alert_types = serde_json::to_string(&prefs.enabled_alert_types)
            .map_err(|e| DbError::Corrupt(format!("unserializable types: {e}")))?;
        let per_niche_settings = serde_json::to_string(&prefs.per_niche_settings)
            .map_err(|e| DbError::Corrupt(format!("unserializable settings: {e}")))?;
        let thresholds = serde_json::to_string(&prefs.thresholds)
            .map_err(|e| DbError::Corrupt(format!("unserializable thresholds: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO alert_preferences (
                user_id, enabled_alert_types, minimum_severity, notification_frequency,
                per_niche_settings, email_enabled, in_app_enabled, thresholds
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                enabled_alert_types = excluded.enabled_alert_types,
                minimum_severity = excluded.minimum_severity,
                notification_frequency = excluded.notification_frequency,
                per_niche_settings = excluded.per_niche_settings,
                email_enabled = excluded.email_enabled,
                in_app_enabled = excluded.in_app_enabled,
                thresholds = excluded.thresholds
            "#,
        )
        .bind(&prefs.user_id)
        .bind(&enabled_alert_types)
        .bind(prefs.minimum_severity.as_str())
        .bind(prefs.notification_frequency.as_str())
        .bind(&per_niche_settings)
        .bind(prefs.email_enabled)
        .bind(prefs.in_app_enabled)
        .bind(&thresholds)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nichepulse_core::{AlertType, ThresholdsPatch};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn first_read_creates_defaults() {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        let prefs = db.preferences("user-1").await.unwrap();
        assert_eq!(prefs, UserAlertPreferences::default_for("user-1"));

        // Second read returns the stored row.
        let again = db.preferences("user-1").await.unwrap();
        assert_eq!(again, prefs);
    }

    #[tokio::test]
    async fn partial_update_merges_thresholds() {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        let updated = db
            .update_preferences(
                "user-1",
                PreferencesUpdate {
                    email_enabled: Some(true),
                    notification_frequency: Some(NotificationFrequency::WeeklyDigest),
                    thresholds: Some(ThresholdsPatch {
                        breakout_radar_score: Some(85.0),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.email_enabled);
        assert_eq!(
            updated.notification_frequency,
            NotificationFrequency::WeeklyDigest
        );
        assert_eq!(updated.thresholds.breakout_radar_score, 85.0);
        // Untouched threshold keeps its default.
        assert_eq!(updated.thresholds.emerging_opportunity_threshold, 65.0);

        let reloaded = db.preferences("user-1").await.unwrap();
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn niche_override_round_trips() {
        let db = Database::connect("sqlite::memory:").await.unwrap();

        let setting = PerNicheAlertSetting {
            niche_id: "n1".to_string(),
            keyword: "ai tools".to_string(),
            alerts_enabled: false,
            enabled_types: vec![AlertType::BreakoutDetected],
        };
        db.upsert_niche_override("user-1", setting.clone())
            .await
            .unwrap();

        let prefs = db.preferences("user-1").await.unwrap();
        assert_eq!(prefs.per_niche_settings, vec![setting.clone()]);

        // Upserting the same niche replaces, not appends.
        let mut replacement = setting;
        replacement.alerts_enabled = true;
        let prefs = db
            .upsert_niche_override("user-1", replacement.clone())
            .await
            .unwrap();
        assert_eq!(prefs.per_niche_settings, vec![replacement]);
    }
}
