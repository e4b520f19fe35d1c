//! Time-windowed alert deduplication.

use chrono::{DateTime, Duration, Utc};
use nichepulse_core::Alert;
use tracing::debug;

/// Rolling window inside which repeat (niche, type) alerts are suppressed.
pub const DEFAULT_DEDUP_WINDOW_HOURS: i64 = 24;

/// Drop candidates that duplicate a recent historical alert.
///
/// A candidate is a duplicate iff the history holds an alert with the same
/// `(niche_id, alert_type)` created strictly less than `window_hours` before
/// `now`. Order-preserving and idempotent: re-running over the same inputs
/// never shrinks the result further.
///
/// Note that edge-triggered rules dedup by type like everything else, so a
/// value oscillating across its threshold inside the window still yields a
/// single alert.
pub fn deduplicate(
    candidates: Vec<Alert>,
    history: &[Alert],
    window_hours: i64,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let window = Duration::hours(window_hours);

    candidates
        .into_iter()
        .filter(|candidate| {
            let duplicate = history.iter().any(|past| {
                past.niche_id == candidate.niche_id
                    && past.alert_type == candidate.alert_type
                    && now - past.created_at < window
            });
            if duplicate {
                debug!(
                    niche_id = %candidate.niche_id,
                    alert_type = candidate.alert_type.as_str(),
                    "suppressing duplicate alert inside dedup window"
                );
            }
            !duplicate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nichepulse_core::{AlertSeverity, AlertType};
    use pretty_assertions::assert_eq;

    fn alert(niche_id: &str, alert_type: AlertType, created_at: DateTime<Utc>) -> Alert {
        Alert::metric_change(
            alert_type,
            AlertSeverity::Medium,
            niche_id,
            "ai tools",
            "opportunity_index",
            50.0,
            65.0,
            created_at,
        )
    }

    #[test]
    fn same_niche_and_type_within_window_is_suppressed() {
        let now = Utc::now();
        let history = vec![alert(
            "n1",
            AlertType::OpportunityIncreased,
            now - Duration::hours(2),
        )];
        let candidates = vec![alert("n1", AlertType::OpportunityIncreased, now)];

        assert!(deduplicate(candidates, &history, 24, now).is_empty());
    }

    #[test]
    fn different_type_or_niche_survives() {
        let now = Utc::now();
        let history = vec![alert(
            "n1",
            AlertType::OpportunityIncreased,
            now - Duration::hours(2),
        )];
        let candidates = vec![
            alert("n1", AlertType::CompetitionSpike, now),
            alert("n2", AlertType::OpportunityIncreased, now),
        ];

        assert_eq!(deduplicate(candidates, &history, 24, now).len(), 2);
    }

    #[test]
    fn window_boundary() {
        let now = Utc::now();
        let candidates = vec![alert("n1", AlertType::BreakoutDetected, now)];

        // One second outside the window: does not suppress.
        let outside = vec![alert(
            "n1",
            AlertType::BreakoutDetected,
            now - Duration::hours(24) - Duration::seconds(1),
        )];
        assert_eq!(deduplicate(candidates.clone(), &outside, 24, now).len(), 1);

        // One second inside: suppresses.
        let inside = vec![alert(
            "n1",
            AlertType::BreakoutDetected,
            now - Duration::hours(24) + Duration::seconds(1),
        )];
        assert!(deduplicate(candidates, &inside, 24, now).is_empty());
    }

    #[test]
    fn deduplication_is_idempotent() {
        let now = Utc::now();
        let history = vec![
            alert("n1", AlertType::OpportunityIncreased, now - Duration::hours(1)),
            alert("n2", AlertType::CompetitionSpike, now - Duration::hours(30)),
        ];
        let candidates = vec![
            alert("n1", AlertType::OpportunityIncreased, now),
            alert("n2", AlertType::CompetitionSpike, now),
            alert("n3", AlertType::BreakoutDetected, now),
        ];

        let once = deduplicate(candidates, &history, 24, now);
        let twice = deduplicate(once.clone(), &history, 24, now);
        let once_ids: Vec<_> = once.iter().map(|a| a.id.clone()).collect();
        let twice_ids: Vec<_> = twice.iter().map(|a| a.id.clone()).collect();
        assert_eq!(once_ids, twice_ids);
        assert_eq!(once.len(), 2);
    }
}
