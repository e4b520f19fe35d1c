//! Preference-based alert filtering.

use nichepulse_core::{Alert, UserAlertPreferences};
use tracing::debug;

/// Apply global and per-niche preference rules, in order:
///
/// 1. the alert's type must be enabled globally;
/// 2. its severity must be at or above the user's minimum;
/// 3. a per-niche override, when present, must have its master toggle on and,
///    if its allow-list is non-empty, contain the alert's type.
///
/// Declarative: surviving alerts keep their input order.
pub fn filter_by_preferences(
    alerts: Vec<Alert>,
    preferences: &UserAlertPreferences,
) -> Vec<Alert> {
    alerts
        .into_iter()
        .filter(|alert| {
            let passes = passes(alert, preferences);
            if !passes {
                debug!(
                    niche_id = %alert.niche_id,
                    alert_type = alert.alert_type.as_str(),
                    severity = alert.severity.as_str(),
                    "alert filtered by preferences"
                );
            }
            passes
        })
        .collect()
}

fn passes(alert: &Alert, preferences: &UserAlertPreferences) -> bool {
    if !preferences.enabled_alert_types.contains(&alert.alert_type) {
        return false;
    }

    if alert.severity < preferences.minimum_severity {
        return false;
    }

    if let Some(setting) = preferences.niche_setting(&alert.niche_id) {
        if !setting.alerts_enabled {
            return false;
        }
        if !setting.enabled_types.is_empty() && !setting.enabled_types.contains(&alert.alert_type)
        {
            return false;
        }
    }

    true
}
