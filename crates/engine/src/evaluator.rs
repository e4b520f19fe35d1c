//! Threshold-crossing rule evaluation.
//!
//! Eight independent rules compare an ordered pair of snapshots for the same
//! niche. Rules can co-fire in one call; each produces its own alert.

use chrono::{DateTime, Utc};
use nichepulse_core::{
    Alert, AlertSeverity, AlertThresholds, AlertType, NicheMetricsSnapshot, SnapshotError,
    ThresholdsError,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluateError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Thresholds(#[from] ThresholdsError),
}

/// Evaluate metric changes between two snapshots of the same niche.
///
/// Pure and deterministic: no I/O, no randomness; `now` stamps the produced
/// alerts. Fails fast on non-finite inputs, aborting only this niche.
pub fn evaluate(
    previous: &NicheMetricsSnapshot,
    current: &NicheMetricsSnapshot,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Result<Vec<Alert>, EvaluateError> {
    previous.validate()?;
    current.validate()?;
    thresholds.validate()?;

    let mut alerts = Vec::new();

    // 1. BREAKOUT_DETECTED. Edge-triggered: fires only when the radar score
    // crosses the ceiling, not while it stays above it.
    if current.radar_score > thresholds.breakout_radar_score
        && previous.radar_score <= thresholds.breakout_radar_score
    {
        let mut alert = base(
            AlertType::BreakoutDetected,
            AlertSeverity::Critical,
            current,
            "radar_score",
            previous.radar_score,
            current.radar_score,
            now,
        );
        alert.title = format!("Breakout Detected: {}", current.keyword);
        alert.description = format!(
            "Radar score surged from {} to {} — this niche is showing breakout momentum.",
            previous.radar_score, current.radar_score
        );
        alert.recommended_action = "Publish content immediately to capitalize on the breakout \
                                    window before competition increases"
            .to_string();
        alerts.push(alert);
    }

    // 2. OPPORTUNITY_INCREASED
    let opp_delta = current.opportunity_index - previous.opportunity_index;
    if opp_delta >= thresholds.opportunity_increase_min_delta {
        let severity = if opp_delta >= 20.0 {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        let mut alert = base(
            AlertType::OpportunityIncreased,
            severity,
            current,
            "opportunity_index",
            previous.opportunity_index,
            current.opportunity_index,
            now,
        );
        alert.title = format!("Opportunity Score Up +{} pts: {}", opp_delta, current.keyword);
        alert.description = format!(
            "Opportunity index improved from {} to {}. Conditions have improved for entering \
             this niche.",
            previous.opportunity_index, current.opportunity_index
        );
        alert.recommended_action =
            "Review your content strategy for this niche — the entry window has widened"
                .to_string();
        alerts.push(alert);
    }

    // 3. OPPORTUNITY_DECLINED. The threshold is a negative number; the rule
    // fires when the delta is at or below it.
    if opp_delta <= thresholds.opportunity_decline_min_delta {
        let severity = if opp_delta <= -20.0 {
            AlertSeverity::High
        } else if opp_delta <= -10.0 {
            AlertSeverity::Medium
        } else {
            AlertSeverity::Low
        };
        let mut alert = base(
            AlertType::OpportunityDeclined,
            severity,
            current,
            "opportunity_index",
            previous.opportunity_index,
            current.opportunity_index,
            now,
        );
        alert.title = format!("Opportunity Declining: {}", current.keyword);
        alert.description = format!(
            "Opportunity index dropped from {} to {}. Niche conditions are becoming less \
             favorable.",
            previous.opportunity_index, current.opportunity_index
        );
        alert.recommended_action =
            "Consider accelerating your publishing schedule before the window closes further"
                .to_string();
        alerts.push(alert);
    }

    // 4. COMPETITION_SPIKE
    let comp_delta = current.competition_score - previous.competition_score;
    if comp_delta >= thresholds.competition_spike_min_delta {
        let severity = if comp_delta >= 20.0 {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        let mut alert = base(
            AlertType::CompetitionSpike,
            severity,
            current,
            "competition_score",
            previous.competition_score,
            current.competition_score,
            now,
        );
        alert.title = format!("Competition Spike: {}", current.keyword);
        alert.description = format!(
            "Competition score increased by {} points. New creators or brands may be entering \
             this space.",
            comp_delta
        );
        alert.recommended_action =
            "Double down on your differentiation strategy and increase publishing frequency"
                .to_string();
        alerts.push(alert);
    }

    // 5. MONETIZATION_IMPROVED
    let mon_delta = current.monetization_score - previous.monetization_score;
    if mon_delta >= thresholds.monetization_improved_min_delta {
        let mut alert = base(
            AlertType::MonetizationImproved,
            AlertSeverity::Medium,
            current,
            "monetization_score",
            previous.monetization_score,
            current.monetization_score,
            now,
        );
        alert.title = format!("Monetization Potential Up: {}", current.keyword);
        alert.description = format!(
            "Monetization score improved from {} to {}. New revenue pathways may be available.",
            previous.monetization_score, current.monetization_score
        );
        alert.recommended_action =
            "Review your monetization plan — consider activating affiliate or sponsorship \
             outreach"
                .to_string();
        alerts.push(alert);
    }

    // 6. TREND_ACCELERATING. Level + velocity: high growth score and still
    // climbing.
    let growth_delta = current.growth_score - previous.growth_score;
    if current.growth_score > 75.0 && growth_delta >= 8.0 {
        let mut alert = base(
            AlertType::TrendAccelerating,
            AlertSeverity::High,
            current,
            "growth_score",
            previous.growth_score,
            current.growth_score,
            now,
        );
        alert.title = format!("Trend Accelerating: {}", current.keyword);
        alert.description = format!(
            "Growth score reached {} — this topic is gaining significant search momentum.",
            current.growth_score
        );
        alert.recommended_action =
            "Prioritize publishing trend-responsive content within the next 7 days".to_string();
        alerts.push(alert);
    }

    // 7. FRESHNESS_WINDOW_OPENED. Edge-triggered on the downward crossing
    // of 40.
    if current.saturation_score < 40.0 && previous.saturation_score >= 40.0 {
        let mut alert = base(
            AlertType::FreshnessWindowOpened,
            AlertSeverity::Medium,
            current,
            "saturation_score",
            previous.saturation_score,
            current.saturation_score,
            now,
        );
        alert.title = format!("Freshness Window Opened: {}", current.keyword);
        alert.description = "Saturation dropped below 40 — fewer competitors are actively \
                             publishing in this niche right now."
            .to_string();
        alert.recommended_action = "Increase your upload frequency temporarily to claim ranking \
                                    positions while the window is open"
            .to_string();
        alerts.push(alert);
    }

    Ok(alerts)
}

/// First-time evaluation: no previous snapshot exists for the niche.
///
/// Fires NEW_EMERGING_OPPORTUNITY when the opportunity index is at or above
/// the emerging floor. The alert reports a full change: previous value 0 and
/// percent 100.
pub fn evaluate_first_seen(
    current: &NicheMetricsSnapshot,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Result<Option<Alert>, EvaluateError> {
    current.validate()?;
    thresholds.validate()?;

    if current.opportunity_index < thresholds.emerging_opportunity_threshold {
        return Ok(None);
    }

    let mut alert = base(
        AlertType::NewEmergingOpportunity,
        AlertSeverity::Medium,
        current,
        "opportunity_index",
        0.0,
        current.opportunity_index,
        now,
    );
    alert.change_percent = 100.0;
    alert.title = format!("New Emerging Opportunity: {}", current.keyword);
    alert.description = format!(
        "Analysis complete. This niche has an opportunity index of {}, making it a strong \
         entry candidate.",
        current.opportunity_index
    );
    alert.recommended_action =
        "Review the full content strategy and growth blueprint for this niche".to_string();
    Ok(Some(alert))
}

fn base(
    alert_type: AlertType,
    severity: AlertSeverity,
    current: &NicheMetricsSnapshot,
    metric: &str,
    previous_value: f64,
    current_value: f64,
    now: DateTime<Utc>,
) -> Alert {
    Alert::metric_change(
        alert_type,
        severity,
        &current.niche_id,
        &current.keyword,
        metric,
        previous_value,
        current_value,
        now,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot(niche_id: &str) -> NicheMetricsSnapshot {
        NicheMetricsSnapshot {
            niche_id: niche_id.to_string(),
            keyword: "ai tools".to_string(),
            captured_at: Utc::now(),
            opportunity_index: 60.0,
            radar_score: 50.0,
            monetization_score: 50.0,
            competition_score: 40.0,
            demand_score: 60.0,
            growth_score: 50.0,
            saturation_score: 55.0,
        }
    }

    fn eval(
        previous: &NicheMetricsSnapshot,
        current: &NicheMetricsSnapshot,
    ) -> Vec<Alert> {
        evaluate(previous, current, &AlertThresholds::default(), Utc::now()).unwrap()
    }

    #[test]
    fn quiet_snapshots_produce_no_alerts() {
        let prev = snapshot("n1");
        let curr = snapshot("n1");
        assert_eq!(eval(&prev, &curr).len(), 0);
    }

    #[test]
    fn breakout_fires_only_on_crossing() {
        let mut prev = snapshot("n1");
        let mut curr = snapshot("n1");

        // Crossing 75: fires, CRITICAL.
        prev.radar_score = 70.0;
        curr.radar_score = 80.0;
        let alerts = eval(&prev, &curr);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::BreakoutDetected);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);

        // Already above on both sides: level condition holds but no crossing,
        // must not fire.
        prev.radar_score = 80.0;
        curr.radar_score = 90.0;
        assert!(eval(&prev, &curr).is_empty());

        // Exactly at the threshold counts as "not yet above".
        prev.radar_score = 75.0;
        curr.radar_score = 76.0;
        assert_eq!(eval(&prev, &curr).len(), 1);
    }

    #[test]
    fn opportunity_increase_severity_ladder() {
        let prev = snapshot("n1");

        let mut curr = snapshot("n1");
        curr.opportunity_index = prev.opportunity_index + 12.0;
        let alerts = eval(&prev, &curr);
        assert_eq!(alerts[0].alert_type, AlertType::OpportunityIncreased);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);

        let mut curr = snapshot("n1");
        curr.opportunity_index = prev.opportunity_index + 25.0;
        let alerts = eval(&prev, &curr);
        assert_eq!(alerts[0].severity, AlertSeverity::High);

        // Below the minimum delta: nothing.
        let mut curr = snapshot("n1");
        curr.opportunity_index = prev.opportunity_index + 9.0;
        assert!(eval(&prev, &curr).is_empty());
    }

    #[test]
    fn opportunity_decline_severity_ladder() {
        let prev = snapshot("n1");

        let mut curr = snapshot("n1");
        curr.opportunity_index = prev.opportunity_index - 8.0;
        let alerts = eval(&prev, &curr);
        assert_eq!(alerts[0].alert_type, AlertType::OpportunityDeclined);
        assert_eq!(alerts[0].severity, AlertSeverity::Low);

        let mut curr = snapshot("n1");
        curr.opportunity_index = prev.opportunity_index - 12.0;
        assert_eq!(eval(&prev, &curr)[0].severity, AlertSeverity::Medium);

        let mut curr = snapshot("n1");
        curr.opportunity_index = prev.opportunity_index - 22.0;
        assert_eq!(eval(&prev, &curr)[0].severity, AlertSeverity::High);

        // -7 is above the -8 floor: no alert.
        let mut curr = snapshot("n1");
        curr.opportunity_index = prev.opportunity_index - 7.0;
        assert!(eval(&prev, &curr).is_empty());
    }

    #[test]
    fn trend_accelerating_needs_level_and_velocity() {
        let mut prev = snapshot("n1");
        let mut curr = snapshot("n1");

        // High level, big jump: fires.
        prev.growth_score = 70.0;
        curr.growth_score = 80.0;
        let alerts = eval(&prev, &curr);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::TrendAccelerating);
        assert_eq!(alerts[0].severity, AlertSeverity::High);

        // High level but slow climb: no alert.
        prev.growth_score = 74.0;
        curr.growth_score = 78.0;
        assert!(eval(&prev, &curr).is_empty());

        // Fast climb but below the 75 level: no alert.
        prev.growth_score = 50.0;
        curr.growth_score = 70.0;
        assert!(eval(&prev, &curr).is_empty());
    }

    #[test]
    fn freshness_window_is_edge_triggered() {
        let mut prev = snapshot("n1");
        let mut curr = snapshot("n1");

        prev.saturation_score = 45.0;
        curr.saturation_score = 35.0;
        let alerts = eval(&prev, &curr);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::FreshnessWindowOpened);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);

        // Still below 40 on both sides: no re-fire.
        prev.saturation_score = 35.0;
        curr.saturation_score = 30.0;
        assert!(eval(&prev, &curr).is_empty());
    }

    #[test]
    fn co_firing_rules_yield_distinct_alerts() {
        let prev = snapshot("n1");
        let mut curr = snapshot("n1");
        curr.opportunity_index = prev.opportunity_index + 15.0;
        curr.competition_score = prev.competition_score + 15.0;

        let alerts = eval(&prev, &curr);
        assert_eq!(alerts.len(), 2);
        let types: Vec<_> = alerts.iter().map(|a| a.alert_type).collect();
        assert!(types.contains(&AlertType::OpportunityIncreased));
        assert!(types.contains(&AlertType::CompetitionSpike));
        assert_ne!(alerts[0].id, alerts[1].id);
    }

    #[test]
    fn delta_and_percent_are_derived_from_values() {
        let mut prev = snapshot("n1");
        let mut curr = snapshot("n1");
        prev.monetization_score = 58.0;
        curr.monetization_score = 68.0;

        let alerts = eval(&prev, &curr);
        assert_eq!(alerts[0].metric_changed, "monetization_score");
        assert_eq!(alerts[0].change_delta, 10.0);
        assert_eq!(alerts[0].change_percent, 17.2);
    }

    #[test]
    fn first_seen_emerging_opportunity() {
        let mut curr = snapshot("n1");
        curr.opportunity_index = 70.0;

        let alert = evaluate_first_seen(&curr, &AlertThresholds::default(), Utc::now())
            .unwrap()
            .expect("should fire at 70 >= 65");
        assert_eq!(alert.alert_type, AlertType::NewEmergingOpportunity);
        assert_eq!(alert.severity, AlertSeverity::Medium);
        assert_eq!(alert.previous_value, 0.0);
        assert_eq!(alert.current_value, 70.0);
        assert_eq!(alert.change_percent, 100.0);
    }

    #[test]
    fn first_seen_below_floor_is_silent() {
        let mut curr = snapshot("n1");
        curr.opportunity_index = 60.0;
        let alert =
            evaluate_first_seen(&curr, &AlertThresholds::default(), Utc::now()).unwrap();
        assert!(alert.is_none());
    }

    #[test]
    fn non_finite_inputs_fail_fast() {
        let prev = snapshot("n1");
        let mut curr = snapshot("n1");
        curr.radar_score = f64::NAN;
        assert!(eval_err(&prev, &curr));

        let curr = snapshot("n1");
        let mut thresholds = AlertThresholds::default();
        thresholds.breakout_radar_score = f64::INFINITY;
        assert!(evaluate(&prev, &curr, &thresholds, Utc::now()).is_err());
    }

    fn eval_err(prev: &NicheMetricsSnapshot, curr: &NicheMetricsSnapshot) -> bool {
        evaluate(prev, curr, &AlertThresholds::default(), Utc::now()).is_err()
    }
}
