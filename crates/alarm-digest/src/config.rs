//! # Digest Service Configuration
//!
//! Counts and queue capacities consumed by the service. Values are fixed for
//! the lifetime of the process.
//!
//! Deserializes from the canonical field names and from the camelCase keys
//! of existing `config.properties` deployments. Missing fields keep their
//! defaults.

use crate::domain::ConfigError;
use serde::{Deserialize, Serialize};

/// What a listener does with a payload it cannot decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPayloadPolicy {
    /// Log a warning and drop the payload.
    #[default]
    #[serde(alias = "Warn", alias = "WARN")]
    Warn,
    /// Treat as fatal; the supervisor aborts the service.
    #[serde(alias = "Fatal", alias = "FATAL")]
    Fatal,
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Number of shard workers (K).
    #[serde(alias = "alarmStatusChangedMessagesTotalWorkers")]
    pub shard_count: u32,
    /// Partition listeners for status changes.
    #[serde(alias = "alarmStatusChangedListeners")]
    pub status_listeners: usize,
    /// Partition listeners for digest requests.
    #[serde(alias = "sendAlarmDigestListeners")]
    pub digest_request_listeners: usize,
    /// Fan-in consumers for status changes.
    #[serde(alias = "alarmStatusChangedMessagesConsumers")]
    pub status_consumers: usize,
    /// Fan-in consumers for digest requests.
    #[serde(alias = "sendAlarmDigestMessagesConsumers")]
    pub digest_request_consumers: usize,
    /// Digest publisher tasks.
    #[serde(alias = "alarmDigestMessageProducers")]
    pub digest_publishers: usize,
    /// Shared status-change queue capacity.
    #[serde(alias = "alarmStatusChangedMessagesChan")]
    pub status_queue_capacity: usize,
    /// Shared digest-request queue capacity.
    #[serde(alias = "sendAlarmDigestMessagesChan")]
    pub digest_request_queue_capacity: usize,
    /// Per-shard status-change queue capacity.
    #[serde(alias = "alarmStatusChangedMessages")]
    pub shard_status_queue_capacity: usize,
    /// Per-shard digest-request queue capacity.
    #[serde(alias = "sendAlarmDigestMessages")]
    pub shard_digest_request_queue_capacity: usize,
    /// Outbound digest queue capacity.
    #[serde(alias = "alarmDigestMessagesChan")]
    pub digest_queue_capacity: usize,
    /// Malformed inbound payload handling.
    pub malformed_payload_policy: MalformedPayloadPolicy,
    /// Subscribe to the unsuffixed legacy topics and round-robin them.
    pub register_delegators: bool,
    /// Log every digest seen on the outbound topic.
    pub digest_monitor: bool,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            shard_count: 4,
            status_listeners: 2,
            digest_request_listeners: 2,
            status_consumers: 1,
            digest_request_consumers: 1,
            digest_publishers: 2,
            status_queue_capacity: 500,
            digest_request_queue_capacity: 500,
            shard_status_queue_capacity: 75,
            shard_digest_request_queue_capacity: 75,
            digest_queue_capacity: 500,
            malformed_payload_policy: MalformedPayloadPolicy::Warn,
            register_delegators: true,
            digest_monitor: false,
        }
    }
}

impl DigestConfig {
    /// Reject zero counts and capacities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_count == 0 {
            return Err(ConfigError::Zero("shard_count"));
        }

        let positive = [
            ("status_listeners", self.status_listeners),
            ("digest_request_listeners", self.digest_request_listeners),
            ("status_consumers", self.status_consumers),
            ("digest_request_consumers", self.digest_request_consumers),
            ("digest_publishers", self.digest_publishers),
            ("status_queue_capacity", self.status_queue_capacity),
            ("digest_request_queue_capacity", self.digest_request_queue_capacity),
            ("shard_status_queue_capacity", self.shard_status_queue_capacity),
            (
                "shard_digest_request_queue_capacity",
                self.shard_digest_request_queue_capacity,
            ),
            ("digest_queue_capacity", self.digest_queue_capacity),
        ];
        match positive.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::Zero(name)),
            None => Ok(()),
        }
    }
}
