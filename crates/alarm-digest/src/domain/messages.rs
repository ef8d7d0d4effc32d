//! # Wire Messages
//!
//! JSON payloads exchanged over the broker.
//!
//! ```text
//! AlarmStatusChanged  {"AlarmID", "UserID", "Status", "ChangedAt"}
//! SendAlarmDigest     {"UserID"}
//! AlarmDigest         {"UserID", "ActiveAlarms": [{"AlarmID", "Status", "LatestChangedAt"}]}
//! ```
//!
//! Legacy producers spell identifiers `AlarmId`/`UserId`; both spellings are
//! accepted on decode.

use super::entities::{AlarmId, AlarmStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound: an alarm changed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedEvent {
    /// Alarm that changed.
    #[serde(rename = "AlarmID", alias = "AlarmId")]
    pub alarm_id: AlarmId,
    /// Owning user; routing key.
    #[serde(rename = "UserID", alias = "UserId")]
    pub user_id: UserId,
    /// Raw status string; parsed by the shard worker.
    #[serde(rename = "Status")]
    pub status: String,
    /// RFC3339 timestamp of the change.
    #[serde(rename = "ChangedAt")]
    pub changed_at: DateTime<Utc>,
}

/// Inbound: emit the digest for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestRequest {
    /// Owning user; routing key.
    #[serde(rename = "UserID", alias = "UserId")]
    pub user_id: UserId,
}

/// One active alarm inside a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAlarmSummary {
    /// Alarm that changed.
    #[serde(rename = "AlarmID", alias = "AlarmId")]
    pub alarm_id: AlarmId,
    /// Latest known status.
    #[serde(rename = "Status")]
    pub status: AlarmStatus,
    /// `updated_at` if set, else `created_at`.
    #[serde(rename = "LatestChangedAt")]
    pub latest_changed_at: DateTime<Utc>,
}

/// Outbound: a user's active alarms, oldest change first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestMessage {
    /// Owning user; routing key.
    #[serde(rename = "UserID", alias = "UserId")]
    pub user_id: UserId,
    /// Active alarms, oldest change first.
    #[serde(rename = "ActiveAlarms")]
    pub active_alarms: Vec<ActiveAlarmSummary>,
}

/// Inbound payloads carry the user they must be routed by.
pub trait Routed {
    /// Routing key.
    fn user_id(&self) -> &UserId;
}

impl Routed for StatusChangedEvent {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

impl Routed for DigestRequest {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }
}
