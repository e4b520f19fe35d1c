//! Email payload construction for the external mail collaborator.

use chrono::{DateTime, Utc};
use nichepulse_core::{Alert, NotificationFrequency};
use serde::{Deserialize, Serialize};

/// Structured payload handed to the email transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailPayload {
    pub to: String,
    pub subject: String,
    /// Short text shown in mail client previews.
    pub preview_text: String,
    pub alerts: Vec<Alert>,
    /// Readable period description, e.g. "Daily Digest" with its date.
    pub digest_period: String,
    pub unsubscribe_url: String,
    pub dashboard_url: String,
}

/// Build the email payload for a batch of alerts at a given cadence.
///
/// Instant mail references the single alert's title; digests reference the
/// alert count and period.
pub fn build_email_payload(
    to: &str,
    alerts: &[Alert],
    frequency: NotificationFrequency,
    now: DateTime<Utc>,
    base_url: &str,
) -> EmailPayload {
    let count = alerts.len();

    let (subject, preview_text, digest_period) = match frequency {
        NotificationFrequency::Instant => {
            let title = alerts
                .first()
                .map(|a| a.title.as_str())
                .unwrap_or("System Update");
            let preview = alerts
                .first()
                .map(|a| a.description.clone())
                .unwrap_or_else(|| {
                    "Important change detected in your tracked niches.".to_string()
                });
            (
                format!("NichePulse Alert: {title}"),
                preview,
                now.format("%Y-%m-%d").to_string(),
            )
        }
        NotificationFrequency::DailyDigest => (
            format!("Your NichePulse Daily Digest — {count} new alerts"),
            format!(
                "Summary of the latest changes in your tracked niches for {}.",
                now.format("%Y-%m-%d")
            ),
            format!("Daily Digest — {}", now.format("%b %-d, %Y")),
        ),
        NotificationFrequency::WeeklyDigest => (
            format!("Your NichePulse Weekly Summary — {count} updates"),
            "A weekly overview of market opportunities and alerts.".to_string(),
            format!("Weekly Summary — Week of {}", now.format("%Y-%m-%d")),
        ),
    };

    EmailPayload {
        to: to.to_string(),
        subject,
        preview_text,
        alerts: alerts.to_vec(),
        digest_period,
        unsubscribe_url: format!("{base_url}/settings/alerts"),
        dashboard_url: format!("{base_url}/dashboard"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nichepulse_core::{AlertSeverity, AlertType};
    use pretty_assertions::assert_eq;

    fn alerts(n: usize) -> Vec<Alert> {
        (0..n)
            .map(|i| {
                let mut a = Alert::metric_change(
                    AlertType::OpportunityIncreased,
                    AlertSeverity::Medium,
                    &format!("n{i}"),
                    "ai tools",
                    "opportunity_index",
                    50.0,
                    65.0,
                    "2024-03-06T15:00:00Z".parse().unwrap(),
                );
                a.title = format!("Opportunity Score Up +15 pts: ai tools #{i}");
                a.description = "Opportunity index improved.".to_string();
                a
            })
            .collect()
    }

    #[test]
    fn instant_references_the_alert_title() {
        let now: DateTime<Utc> = "2024-03-06T15:00:00Z".parse().unwrap();
        let batch = alerts(1);
        let payload = build_email_payload(
            "user@example.com",
            &batch,
            NotificationFrequency::Instant,
            now,
            "https://app.nichepulse.io",
        );
        assert_eq!(
            payload.subject,
            "NichePulse Alert: Opportunity Score Up +15 pts: ai tools #0"
        );
        assert_eq!(payload.preview_text, "Opportunity index improved.");
        assert_eq!(payload.unsubscribe_url, "https://app.nichepulse.io/settings/alerts");
        assert_eq!(payload.dashboard_url, "https://app.nichepulse.io/dashboard");
    }

    #[test]
    fn instant_with_no_alerts_falls_back() {
        let now: DateTime<Utc> = "2024-03-06T15:00:00Z".parse().unwrap();
        let payload = build_email_payload(
            "user@example.com",
            &[],
            NotificationFrequency::Instant,
            now,
            "https://app.nichepulse.io",
        );
        assert_eq!(payload.subject, "NichePulse Alert: System Update");
    }

    #[test]
    fn digests_reference_count_and_period() {
        let now: DateTime<Utc> = "2024-03-06T15:00:00Z".parse().unwrap();
        let batch = alerts(3);

        let daily = build_email_payload(
            "user@example.com",
            &batch,
            NotificationFrequency::DailyDigest,
            now,
            "https://app.nichepulse.io",
        );
        assert_eq!(daily.subject, "Your NichePulse Daily Digest — 3 new alerts");
        assert_eq!(daily.digest_period, "Daily Digest — Mar 6, 2024");

        let weekly = build_email_payload(
            "user@example.com",
            &batch,
            NotificationFrequency::WeeklyDigest,
            now,
            "https://app.nichepulse.io",
        );
        assert_eq!(weekly.subject, "Your NichePulse Weekly Summary — 3 updates");
        assert_eq!(weekly.digest_period, "Weekly Summary — Week of 2024-03-06");
        assert_eq!(weekly.alerts.len(), 3);
    }
}
