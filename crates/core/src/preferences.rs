//! User alert preferences, thresholds, and notification cadence.

use crate::alert::{AlertSeverity, AlertType};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThresholdsError {
    #[error("non-finite threshold: {0}")]
    NonFinite(&'static str),
}

/// Sensitivity knobs for the rule evaluator.
///
/// Owned by [`UserAlertPreferences`]; `Default` is the factory for users with
/// no stored preferences row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Radar score ceiling; breakout fires on the upward crossing.
    pub breakout_radar_score: f64,
    /// Minimum opportunity-index increase to fire.
    pub opportunity_increase_min_delta: f64,
    /// A negative number; decline fires when the delta is at or below this
    /// value.
    pub opportunity_decline_min_delta: f64,
    /// Minimum competition increase to fire.
    pub competition_spike_min_delta: f64,
    /// Minimum monetization increase to fire.
    pub monetization_improved_min_delta: f64,
    /// Opportunity-index floor for a newly saved niche.
    pub emerging_opportunity_threshold: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            breakout_radar_score: 75.0,
            opportunity_increase_min_delta: 10.0,
            opportunity_decline_min_delta: -8.0,
            competition_spike_min_delta: 12.0,
            monetization_improved_min_delta: 8.0,
            emerging_opportunity_threshold: 65.0,
        }
    }
}

impl AlertThresholds {
    /// Fail fast on NaN or infinite knobs before any rule runs.
    pub fn validate(&self) -> Result<(), ThresholdsError> {
        let fields: [(&'static str, f64); 6] = [
            ("breakout_radar_score", self.breakout_radar_score),
            (
                "opportunity_increase_min_delta",
                self.opportunity_increase_min_delta,
            ),
            (
                "opportunity_decline_min_delta",
                self.opportunity_decline_min_delta,
            ),
            (
                "competition_spike_min_delta",
                self.competition_spike_min_delta,
            ),
            (
                "monetization_improved_min_delta",
                self.monetization_improved_min_delta,
            ),
            (
                "emerging_opportunity_threshold",
                self.emerging_opportunity_threshold,
            ),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ThresholdsError::NonFinite(name));
            }
        }
        Ok(())
    }

    /// Merge a partial update field-by-field.
    pub fn apply(&mut self, patch: ThresholdsPatch) {
        if let Some(v) = patch.breakout_radar_score {
            self.breakout_radar_score = v;
        }
        if let Some(v) = patch.opportunity_increase_min_delta {
            self.opportunity_increase_min_delta = v;
        }
        if let Some(v) = patch.opportunity_decline_min_delta {
            self.opportunity_decline_min_delta = v;
        }
        if let Some(v) = patch.competition_spike_min_delta {
            self.competition_spike_min_delta = v;
        }
        if let Some(v) = patch.monetization_improved_min_delta {
            self.monetization_improved_min_delta = v;
        }
        if let Some(v) = patch.emerging_opportunity_threshold {
            self.emerging_opportunity_threshold = v;
        }
    }
}

/// Partial threshold update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsPatch {
    pub breakout_radar_score: Option<f64>,
    pub opportunity_increase_min_delta: Option<f64>,
    pub opportunity_decline_min_delta: Option<f64>,
    pub competition_spike_min_delta: Option<f64>,
    pub monetization_improved_min_delta: Option<f64>,
    pub emerging_opportunity_threshold: Option<f64>,
}

/// Cadence for external notification delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationFrequency {
    Instant,
    DailyDigest,
    WeeklyDigest,
}

impl NotificationFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationFrequency::Instant => "INSTANT",
            NotificationFrequency::DailyDigest => "DAILY_DIGEST",
            NotificationFrequency::WeeklyDigest => "WEEKLY_DIGEST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INSTANT" => Some(NotificationFrequency::Instant),
            "DAILY_DIGEST" => Some(NotificationFrequency::DailyDigest),
            "WEEKLY_DIGEST" => Some(NotificationFrequency::WeeklyDigest),
            _ => None,
        }
    }

    /// Delivery instant for an item scheduled at `now`.
    ///
    /// Daily digests go out at 08:00 UTC the next day; weekly digests at the
    /// next Monday 08:00 UTC, where a run already on a Monday targets the
    /// following Monday, never the same day.
    pub fn next_delivery_after(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            NotificationFrequency::Instant => now,
            NotificationFrequency::DailyDigest => at_digest_hour(now, 1),
            NotificationFrequency::WeeklyDigest => {
                let weekday = now.weekday().num_days_from_sunday() as i64;
                let mut days_until_monday = (1 + 7 - weekday) % 7;
                if days_until_monday == 0 {
                    days_until_monday = 7;
                }
                at_digest_hour(now, days_until_monday)
            }
        }
    }
}

/// All digests are anchored to 08:00:00 UTC.
const DIGEST_HOUR_UTC: u32 = 8;

fn at_digest_hour(now: DateTime<Utc>, days_ahead: i64) -> DateTime<Utc> {
    let date = now.date_naive() + chrono::Duration::days(days_ahead);
    date.and_hms_opt(DIGEST_HOUR_UTC, 0, 0)
        .expect("08:00:00 is a valid time")
        .and_utc()
}

/// Override scoped to one niche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerNicheAlertSetting {
    pub niche_id: String,
    pub keyword: String,
    /// Master toggle for this niche.
    pub alerts_enabled: bool,
    /// Allow-list of types; empty means no override, defer to global.
    pub enabled_types: Vec<AlertType>,
}

/// Global and per-niche alert settings for one user. Exactly one active record
/// per user, created lazily with defaults on first read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAlertPreferences {
    pub user_id: String,
    pub enabled_alert_types: Vec<AlertType>,
    pub minimum_severity: AlertSeverity,
    pub notification_frequency: NotificationFrequency,
    pub per_niche_settings: Vec<PerNicheAlertSetting>,
    pub email_enabled: bool,
    pub in_app_enabled: bool,
    pub thresholds: AlertThresholds,
}

impl UserAlertPreferences {
    /// Defaults for a user with no stored row: all types enabled, minimum
    /// severity Low, instant delivery, in-app on, email off.
    pub fn default_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            enabled_alert_types: AlertType::ALL.to_vec(),
            minimum_severity: AlertSeverity::Low,
            notification_frequency: NotificationFrequency::Instant,
            per_niche_settings: Vec::new(),
            email_enabled: false,
            in_app_enabled: true,
            thresholds: AlertThresholds::default(),
        }
    }

    /// Merge a partial update; thresholds merge field-by-field, everything
    /// else replaces wholesale.
    pub fn apply(&mut self, update: PreferencesUpdate) {
        if let Some(types) = update.enabled_alert_types {
            self.enabled_alert_types = types;
        }
        if let Some(severity) = update.minimum_severity {
            self.minimum_severity = severity;
        }
        if let Some(frequency) = update.notification_frequency {
            self.notification_frequency = frequency;
        }
        if let Some(enabled) = update.email_enabled {
            self.email_enabled = enabled;
        }
        if let Some(enabled) = update.in_app_enabled {
            self.in_app_enabled = enabled;
        }
        if let Some(patch) = update.thresholds {
            self.thresholds.apply(patch);
        }
    }

    /// Insert or replace the override for a niche.
    pub fn upsert_niche_setting(&mut self, setting: PerNicheAlertSetting) {
        match self
            .per_niche_settings
            .iter_mut()
            .find(|s| s.niche_id == setting.niche_id)
        {
            Some(existing) => *existing = setting,
            None => self.per_niche_settings.push(setting),
        }
    }

    /// Linear scan is fine at current scale; index by niche id if override
    /// lists grow large.
    pub fn niche_setting(&self, niche_id: &str) -> Option<&PerNicheAlertSetting> {
        self.per_niche_settings
            .iter()
            .find(|s| s.niche_id == niche_id)
    }
}

/// Partial preferences update for the store's update operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    pub enabled_alert_types: Option<Vec<AlertType>>,
    pub minimum_severity: Option<AlertSeverity>,
    pub notification_frequency: Option<NotificationFrequency>,
    pub email_enabled: Option<bool>,
    pub in_app_enabled: Option<bool>,
    pub thresholds: Option<ThresholdsPatch>,
}
