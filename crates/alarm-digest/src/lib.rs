//! # Alarm Digest
//!
//! Per-user alarm state, sharded across single-owner worker tasks, with
//! on-demand digests of the currently active alarms.
//!
//! ## Purpose
//!
//! - Consume `AlarmStatusChanged` events and keep the latest state of every
//!   alarm per user
//! - On `SendAlarmDigest`, publish one `AlarmDigest` listing the user's active
//!   alarms (oldest first), then forget them until they change again
//!
//! ## Pipeline
//!
//! | Stage | Tasks | Output |
//! |-------|-------|--------|
//! | Partition listeners | one per `topic.i` | shared queue per kind |
//! | Fan-in consumers | M per kind | shard mailboxes |
//! | Shard workers | N (`shard_count`) | digest queue |
//! | Digest publishers | P | `AlarmDigest` topic |
//!
//! A user always maps to the same shard (FNV-1a 32 modulo `shard_count`), so
//! all state of a user is owned by one task and needs no locks.
//!
//! ## Module Structure
//!
//! ```text
//! alarm-digest/
//! ├── domain/          # Alarm, messages, ShardState, errors
//! ├── algorithms/      # User-to-shard distribution
//! ├── service/         # Listener, consumer, shard, publisher tasks
//! ├── config.rs        # DigestConfig
//! └── topics.rs        # Topic names
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod config;
pub mod domain;
pub mod service;
pub mod topics;

// Re-exports
pub use algorithms::{distribute, fnv1a_32, ShardIndex};
pub use config::{DigestConfig, MalformedPayloadPolicy};
pub use domain::{
    ActiveAlarmSummary, Alarm, AlarmId, AlarmStatus, ConfigError, DigestError, DigestMessage,
    DigestRequest, Routed, ShardState, StatusChangedEvent, UserId,
};
pub use service::{
    shared_channel, Delegator, DigestMonitor, DigestPublisher, FanInConsumer, ListenerSet,
    PartitionListener, ShardHandle, ShardInput, ShardRouter, ShardWorker, SharedReceiver,
};
pub use topics::{partition_topic, ALARM_DIGEST, ALARM_STATUS_CHANGED, SEND_ALARM_DIGEST};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
