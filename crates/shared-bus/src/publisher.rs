//! # Broker Port and In-Memory Adapter
//!
//! Defines the publish/subscribe port of the broker and a single-process
//! implementation of it.

use crate::subscriber::{BrokerError, BrokerMessage, Subscription};
use crate::DEFAULT_SUBSCRIPTION_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Topic publish/subscribe port.
///
/// Adapters for real brokers (NATS, Redis, Kafka) implement this trait and
/// own their reconnect policy.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Subscribe to a topic.
    ///
    /// Only messages published after the call returns are delivered.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError>;

    /// Publish a raw payload on a topic.
    ///
    /// # Returns
    ///
    /// The number of live subscriptions the payload was delivered to.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<usize, BrokerError>;
}

/// In-memory broker.
///
/// Each subscription gets its own bounded channel; a publisher waits when a
/// subscriber's buffer is full instead of dropping the message.
pub struct InMemoryBroker {
    /// Live subscription senders by topic.
    topics: RwLock<HashMap<String, Vec<mpsc::Sender<BrokerMessage>>>>,

    /// Set once `close` was called.
    closed: AtomicBool,

    /// Total payloads accepted for publishing.
    messages_published: AtomicU64,

    /// Per-subscription buffer size.
    capacity: usize,
}

impl InMemoryBroker {
    /// Create a broker with the default per-subscription capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIPTION_CAPACITY)
    }

    /// Create a broker with the given per-subscription capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            messages_published: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Number of live subscriptions on a topic.
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map_or(0, |senders| senders.iter().filter(|s| !s.is_closed()).count())
    }

    /// Total payloads accepted for publishing.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Per-subscription buffer size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the broker. Every subscription ends and further calls fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let dropped: usize = self.topics.write().drain().map(|(_, s)| s.len()).sum();
        info!(subscriptions = dropped, "In-memory broker closed");
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Subscribe {
                topic: topic.to_string(),
                reason: "broker closed".to_string(),
            });
        }

        let (sender, receiver) = mpsc::channel(self.capacity);
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(sender);

        debug!(topic = topic, "New subscription created");
        Ok(Subscription::new(topic, receiver))
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<usize, BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Closed);
        }
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        // Senders are cloned out so no lock is held across an await.
        let senders: Vec<_> = self.topics.read().get(topic).cloned().unwrap_or_default();

        let mut delivered = 0;
        let mut stale = false;
        for sender in senders {
            let message = BrokerMessage {
                topic: topic.to_string(),
                payload: payload.clone(),
            };
            if sender.send(message).await.is_ok() {
                delivered += 1;
            } else {
                stale = true;
            }
        }

        if stale {
            if let Some(senders) = self.topics.write().get_mut(topic) {
                senders.retain(|s| !s.is_closed());
            }
        }

        debug!(topic = topic, receivers = delivered, "Message published");
        Ok(delivered)
    }
}
