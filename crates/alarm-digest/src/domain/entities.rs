//! # Domain Entities
//!
//! Alarm, its status, and the identifiers that key shard state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the user owning alarms. Routing key for sharding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identifier of an alarm, unique per user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub String);

impl UserId {
    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AlarmId {
    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for AlarmId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Alarm status as tracked by the service.
///
/// Wire strings other than the three known ones decode to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlarmStatus {
    /// Condition resolved.
    Cleared,
    /// Degraded, active.
    Warning,
    /// Failing, active.
    Critical,
    /// Unrecognized wire status.
    Unknown,
}

impl AlarmStatus {
    /// Parse a raw wire status. Matching is exact and case-sensitive.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "CRITICAL" => Self::Critical,
            "WARNING" => Self::Warning,
            "CLEARED" => Self::Cleared,
            _ => Self::Unknown,
        }
    }

    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
            Self::Cleared => "CLEARED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Active alarms are the ones reported in digests.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Warning | Self::Critical)
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alarm owned by exactly one shard worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    /// Alarm identifier.
    pub id: AlarmId,
    /// Owning user.
    pub user_id: UserId,
    /// Latest known status.
    pub status: AlarmStatus,
    /// Time of the first observed status change.
    pub created_at: DateTime<Utc>,
    /// Time of the latest status change, unset until the first update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Alarm {
    /// Create an alarm from its first observed status change.
    #[must_use]
    pub fn new(
        id: AlarmId,
        user_id: UserId,
        status: AlarmStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            status,
            created_at,
            updated_at: None,
        }
    }

    /// `updated_at` if set, else `created_at`.
    #[must_use]
    pub fn latest_changed_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Apply a subsequent status change.
    ///
    /// An `Unknown` status never erases a known one, but the change time
    /// always advances.
    pub fn apply_change(&mut self, status: AlarmStatus, changed_at: DateTime<Utc>) {
        if status != AlarmStatus::Unknown {
            self.status = status;
        }
        self.updated_at = Some(changed_at);
    }

    /// Whether the alarm is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
