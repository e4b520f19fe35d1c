//! Alert types, severities, and lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of metric change that raises an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    BreakoutDetected,
    OpportunityIncreased,
    OpportunityDeclined,
    CompetitionSpike,
    MonetizationImproved,
    NewEmergingOpportunity,
    TrendAccelerating,
    FreshnessWindowOpened,
}

impl AlertType {
    /// Every alert type; the default preference set enables all of them.
    pub const ALL: [AlertType; 8] = [
        AlertType::BreakoutDetected,
        AlertType::OpportunityIncreased,
        AlertType::OpportunityDeclined,
        AlertType::CompetitionSpike,
        AlertType::MonetizationImproved,
        AlertType::NewEmergingOpportunity,
        AlertType::TrendAccelerating,
        AlertType::FreshnessWindowOpened,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::BreakoutDetected => "BREAKOUT_DETECTED",
            AlertType::OpportunityIncreased => "OPPORTUNITY_INCREASED",
            AlertType::OpportunityDeclined => "OPPORTUNITY_DECLINED",
            AlertType::CompetitionSpike => "COMPETITION_SPIKE",
            AlertType::MonetizationImproved => "MONETIZATION_IMPROVED",
            AlertType::NewEmergingOpportunity => "NEW_EMERGING_OPPORTUNITY",
            AlertType::TrendAccelerating => "TREND_ACCELERATING",
            AlertType::FreshnessWindowOpened => "FRESHNESS_WINDOW_OPENED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BREAKOUT_DETECTED" => Some(AlertType::BreakoutDetected),
            "OPPORTUNITY_INCREASED" => Some(AlertType::OpportunityIncreased),
            "OPPORTUNITY_DECLINED" => Some(AlertType::OpportunityDeclined),
            "COMPETITION_SPIKE" => Some(AlertType::CompetitionSpike),
            "MONETIZATION_IMPROVED" => Some(AlertType::MonetizationImproved),
            "NEW_EMERGING_OPPORTUNITY" => Some(AlertType::NewEmergingOpportunity),
            "TREND_ACCELERATING" => Some(AlertType::TrendAccelerating),
            "FRESHNESS_WINDOW_OPENED" => Some(AlertType::FreshnessWindowOpened),
            _ => None,
        }
    }
}

/// Severity for filtering and visual prioritization.
///
/// Derived ordering is the severity rank: Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum AlertSeverity {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl AlertSeverity {
    #[inline]
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(AlertSeverity::Low),
            "MEDIUM" => Some(AlertSeverity::Medium),
            "HIGH" => Some(AlertSeverity::High),
            "CRITICAL" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }
}

/// Lifecycle status. Unread -> Read and Unread -> Dismissed are the only
/// transitions; Read and Dismissed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Unread,
    Read,
    Dismissed,
}

impl AlertStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Unread => "UNREAD",
            AlertStatus::Read => "READ",
            AlertStatus::Dismissed => "DISMISSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNREAD" => Some(AlertStatus::Unread),
            "READ" => Some(AlertStatus::Read),
            "DISMISSED" => Some(AlertStatus::Dismissed),
            _ => None,
        }
    }
}

/// A user-facing notification triggered by a metric change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Stable id, `alert-{niche}-{type}-{millis}`. Idempotent inserts key on it.
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub niche_id: String,
    pub keyword: String,
    pub title: String,
    pub description: String,
    pub recommended_action: String,
    /// Internal key of the metric that triggered this, e.g. `radar_score`.
    pub metric_changed: String,
    pub previous_value: f64,
    pub current_value: f64,
    /// Always `current_value - previous_value`.
    pub change_delta: f64,
    /// Percent change rounded to 1 decimal; 0 when `previous_value` is 0.
    pub change_percent: f64,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    /// Deep link into the trends view for this niche's keyword.
    pub related_url: String,
}

impl Alert {
    /// Build an unread alert for a metric change, deriving the delta and
    /// percent change. Title, description, and recommended action start empty
    /// and are filled in by the rule that fired.
    pub fn metric_change(
        alert_type: AlertType,
        severity: AlertSeverity,
        niche_id: &str,
        keyword: &str,
        metric: &str,
        previous_value: f64,
        current_value: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        let change_delta = current_value - previous_value;
        let change_percent = if previous_value != 0.0 {
            round1(change_delta / previous_value * 100.0)
        } else {
            0.0
        };

        Self {
            id: format!(
                "alert-{}-{}-{}",
                niche_id,
                alert_type.as_str(),
                created_at.timestamp_millis()
            ),
            alert_type,
            severity,
            status: AlertStatus::Unread,
            niche_id: niche_id.to_string(),
            keyword: keyword.to_string(),
            title: String::new(),
            description: String::new(),
            recommended_action: String::new(),
            metric_changed: metric.to_string(),
            previous_value,
            current_value,
            change_delta,
            change_percent,
            created_at,
            read_at: None,
            related_url: trends_url(keyword),
        }
    }
}

/// Deep link to the trends page scoped to a keyword.
pub fn trends_url(keyword: &str) -> String {
    format!("/trends?keyword={}", urlencoding::encode(keyword))
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn type_string_round_trip() {
        for ty in AlertType::ALL {
            assert_eq!(AlertType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(AlertType::parse("NOT_A_TYPE"), None);
    }

    #[test]
    fn severity_ordering() {
        assert!(AlertSeverity::Low < AlertSeverity::Medium);
        assert!(AlertSeverity::Medium < AlertSeverity::High);
        assert!(AlertSeverity::High < AlertSeverity::Critical);
        assert_eq!(AlertSeverity::Critical.rank(), 3);
    }

    #[test]
    fn metric_change_derives_delta_and_percent() {
        let now = Utc::now();
        let alert = Alert::metric_change(
            AlertType::OpportunityIncreased,
            AlertSeverity::High,
            "niche-1",
            "ai tools",
            "opportunity_index",
            62.0,
            74.0,
            now,
        );
        assert_eq!(alert.change_delta, 12.0);
        assert_eq!(alert.change_percent, 19.4);
        assert_eq!(alert.status, AlertStatus::Unread);
        assert_eq!(alert.read_at, None);
        assert_eq!(alert.related_url, "/trends?keyword=ai%20tools");
    }

    #[test]
    fn percent_is_zero_when_previous_is_zero() {
        let alert = Alert::metric_change(
            AlertType::NewEmergingOpportunity,
            AlertSeverity::Medium,
            "niche-1",
            "ai tools",
            "opportunity_index",
            0.0,
            70.0,
            Utc::now(),
        );
        assert_eq!(alert.change_delta, 70.0);
        assert_eq!(alert.change_percent, 0.0);
    }

    #[test]
    fn percent_rounds_to_one_decimal() {
        // 15 / 35 * 100 = 42.857... -> 42.9
        let alert = Alert::metric_change(
            AlertType::CompetitionSpike,
            AlertSeverity::Medium,
            "niche-1",
            "ai tools",
            "competition_score",
            35.0,
            50.0,
            Utc::now(),
        );
        assert_eq!(alert.change_percent, 42.9);
    }

    #[test]
    fn serde_uses_screaming_snake_names() {
        let json = serde_json::to_string(&AlertType::BreakoutDetected).unwrap();
        assert_eq!(json, "\"BREAKOUT_DETECTED\"");
        let json = serde_json::to_string(&AlertSeverity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
    }
}
