//! Notification delivery queue types.

use crate::alert::Alert;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Delivery channel for a queued notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    InApp,
    Email,
}

impl NotificationChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationChannel::InApp => "IN_APP",
            NotificationChannel::Email => "EMAIL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN_APP" => Some(NotificationChannel::InApp),
            "EMAIL" => Some(NotificationChannel::Email),
            _ => None,
        }
    }
}

/// A scheduled delivery task. Created by the scheduler; after that only the
/// delivery worker touches it, via mark-delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationQueueItem {
    /// Deterministic id derived from channel and alert id, so a retried run
    /// is absorbed by the idempotent insert.
    pub id: String,
    pub alert: Alert,
    pub user_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub channel: NotificationChannel,
}

/// Counters for the queue as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub delivered: i64,
    pub total: i64,
}
