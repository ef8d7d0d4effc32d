//! # Shard State
//!
//! Per-shard alarm history and active-alarm index.
//!
//! ## Invariants
//!
//! - `active[u]` contains `a` iff `alarms[u][a]` exists, its status is
//!   WARNING or CRITICAL, and no digest flush happened since its last active
//!   status change.
//! - `alarms` only grows or updates in place; history is kept for the
//!   lifetime of the shard.
//!
//! The state is plain data. It is owned by a single shard worker task, so no
//! locking is involved.

use super::entities::{Alarm, AlarmId, AlarmStatus, UserId};
use super::messages::{ActiveAlarmSummary, DigestMessage, StatusChangedEvent};
use std::collections::{HashMap, HashSet};

/// Alarm state for one partition of the user keyspace.
#[derive(Debug, Default)]
pub struct ShardState {
    /// Full observed history: user -> alarm -> alarm.
    alarms: HashMap<UserId, HashMap<AlarmId, Alarm>>,
    /// Active, not yet flushed alarms per user. Ids index into `alarms`.
    active: HashMap<UserId, HashSet<AlarmId>>,
}

impl ShardState {
    /// Create empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status change and recompute active-set membership.
    ///
    /// Returns the resulting alarm.
    pub fn apply_status_change(&mut self, event: &StatusChangedEvent) -> &Alarm {
        let status = AlarmStatus::parse(&event.status);

        let alarm = self
            .alarms
            .entry(event.user_id.clone())
            .or_default()
            .entry(event.alarm_id.clone())
            .and_modify(|alarm| alarm.apply_change(status, event.changed_at))
            .or_insert_with(|| {
                Alarm::new(
                    event.alarm_id.clone(),
                    event.user_id.clone(),
                    status,
                    event.changed_at,
                )
            });

        if alarm.is_active() {
            self.active
                .entry(event.user_id.clone())
                .or_default()
                .insert(event.alarm_id.clone());
        } else if let Some(active) = self.active.get_mut(&event.user_id) {
            active.remove(&event.alarm_id);
        }

        alarm
    }

    /// Build the digest for a user without flushing.
    ///
    /// Returns `None` when the user has no active alarms. Summaries are
    /// ordered by `latest_changed_at` ascending, ties broken by alarm id.
    #[must_use]
    pub fn digest_for(&self, user_id: &UserId) -> Option<DigestMessage> {
        let active = self.active.get(user_id).filter(|ids| !ids.is_empty())?;
        let alarms = self.alarms.get(user_id)?;

        let mut summaries: Vec<ActiveAlarmSummary> = active
            .iter()
            .filter_map(|id| alarms.get(id))
            .map(|alarm| ActiveAlarmSummary {
                alarm_id: alarm.id.clone(),
                status: alarm.status,
                latest_changed_at: alarm.latest_changed_at(),
            })
            .collect();

        summaries.sort_by(|a, b| {
            a.latest_changed_at
                .cmp(&b.latest_changed_at)
                .then_with(|| a.alarm_id.cmp(&b.alarm_id))
        });

        Some(DigestMessage {
            user_id: user_id.clone(),
            active_alarms: summaries,
        })
    }

    /// Flush: clear the whole active set of a user.
    ///
    /// Returns how many entries were cleared.
    pub fn clear_active(&mut self, user_id: &UserId) -> usize {
        self.active.remove(user_id).map_or(0, |ids| ids.len())
    }

    /// Look up an alarm.
    #[must_use]
    pub fn alarm(&self, user_id: &UserId, alarm_id: &AlarmId) -> Option<&Alarm> {
        self.alarms.get(user_id)?.get(alarm_id)
    }

    /// Whether an alarm is in the user's active set.
    #[must_use]
    pub fn is_active(&self, user_id: &UserId, alarm_id: &AlarmId) -> bool {
        self.active
            .get(user_id)
            .is_some_and(|ids| ids.contains(alarm_id))
    }

    /// Number of active, unflushed alarms for a user.
    #[must_use]
    pub fn active_count(&self, user_id: &UserId) -> usize {
        self.active.get(user_id).map_or(0, HashSet::len)
    }

    /// Number of users with any alarm history.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.alarms.len()
    }
}
