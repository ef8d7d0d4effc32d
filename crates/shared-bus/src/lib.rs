//! # Shared Bus - Topic Broker Port
//!
//! The alarm digest service talks to its message broker only through the
//! [`MessageBroker`] trait defined here. The broker is an opaque collaborator
//! offering topic subscribe/publish; reconnect policy belongs to the concrete
//! adapter, never to the service core.
//!
//! ```text
//! ┌──────────────┐   publish(topic, bytes)   ┌──────────────┐
//! │  Producer    │ ────────────────────────→ │    Broker    │
//! └──────────────┘                           │              │
//!                                            │  topic map   │
//! ┌──────────────┐   subscribe(topic)        │              │
//! │  Listener    │ ←──────────────────────── │              │
//! └──────────────┘       Subscription        └──────────────┘
//! ```
//!
//! ## Delivery
//!
//! - At-most-once from the service's point of view: no acknowledgements.
//! - Per-subscription FIFO for a single publisher.
//! - A subscription ends (`recv` returns `None`) when it is dropped,
//!   unsubscribed, or the broker is closed.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use publisher::{InMemoryBroker, MessageBroker};
pub use subscriber::{BrokerError, BrokerMessage, Subscription};

/// Messages buffered per subscription before publishers wait.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 1000;
