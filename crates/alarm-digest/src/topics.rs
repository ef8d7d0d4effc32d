//! # Topics
//!
//! Broker topic names. Inbound topics are partitioned as `<topic>.<i>`;
//! the unsuffixed inbound topic is the legacy entry point served by the
//! delegator.

/// Inbound status changes.
pub const ALARM_STATUS_CHANGED: &str = "AlarmStatusChanged";

/// Inbound digest requests.
pub const SEND_ALARM_DIGEST: &str = "SendAlarmDigest";

/// Outbound digests (unpartitioned).
pub const ALARM_DIGEST: &str = "AlarmDigest";

/// Name of partition `index` of `topic`.
#[must_use]
pub fn partition_topic(topic: &str, index: usize) -> String {
    format!("{topic}.{index}")
}
