//! Delivery scheduling per channel and cadence.

use chrono::{DateTime, Utc};
use nichepulse_core::{Alert, NotificationChannel, NotificationFrequency, NotificationQueueItem};
use tracing::debug;

/// Build a queue item for one alert on one channel.
///
/// In-app notifications always deliver instantly so dashboards show alerts
/// right away; only email delivery respects the user's digest cadence. The
/// item id is derived from the channel and alert id, so retried runs produce
/// the same id and are absorbed by the idempotent insert.
pub fn schedule_notification(
    alert: &Alert,
    user_id: &str,
    frequency: NotificationFrequency,
    channel: NotificationChannel,
    now: DateTime<Utc>,
) -> NotificationQueueItem {
    let effective = match channel {
        NotificationChannel::InApp => NotificationFrequency::Instant,
        NotificationChannel::Email => frequency,
    };
    let scheduled_for = effective.next_delivery_after(now);

    debug!(
        alert_id = %alert.id,
        channel = channel.as_str(),
        frequency = effective.as_str(),
        scheduled_for = %scheduled_for,
        "scheduling notification"
    );

    NotificationQueueItem {
        id: format!("notif-{}-{}", channel.as_str(), alert.id),
        alert: alert.clone(),
        user_id: user_id.to_string(),
        scheduled_for,
        delivered: false,
        delivered_at: None,
        channel,
    }
}
