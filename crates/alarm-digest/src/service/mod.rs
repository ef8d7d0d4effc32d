//! # Service Module
//!
//! The tasks of the digest pipeline.
//!
//! ```text
//! broker topic → PartitionListener → shared queue → FanInConsumer
//!     → shard mailbox → ShardWorker → digest queue → DigestPublisher → broker
//! ```

pub mod consumer;
pub mod listener;
pub mod monitor;
pub mod publisher;
pub mod queue;
pub mod shard;

pub use consumer::FanInConsumer;
pub use listener::{Delegator, ListenerSet, PartitionListener, DELEGATOR_COUNTER_RESET};
pub use monitor::DigestMonitor;
pub use publisher::DigestPublisher;
pub use queue::{shared_channel, SharedReceiver};
pub use shard::{ShardHandle, ShardInput, ShardRouter, ShardWorker};
