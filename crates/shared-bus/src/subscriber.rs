//! # Subscriptions
//!
//! The receiving side of the broker.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors reported by broker adapters.
///
/// All of these are transport failures: callers log them and move on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The broker connection was closed.
    #[error("Broker closed")]
    Closed,

    /// Subscribing to a topic failed.
    #[error("Could not subscribe to topic {topic}: {reason}")]
    Subscribe {
        /// Topic that was requested.
        topic: String,
        /// Adapter-specific reason.
        reason: String,
    },

    /// Publishing to a topic failed.
    #[error("Could not publish to topic {topic}: {reason}")]
    Publish {
        /// Target topic.
        topic: String,
        /// Adapter-specific reason.
        reason: String,
    },
}

/// A raw message delivered on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

/// A live subscription to a single topic.
///
/// Dropping the handle unsubscribes; the broker prunes the dead sender on the
/// next publish to the topic.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    receiver: mpsc::Receiver<BrokerMessage>,
}

impl Subscription {
    /// Wrap the receiving half of a subscription channel.
    ///
    /// Adapters own the sending half and push every message published on
    /// `topic` into it.
    #[must_use]
    pub fn new(topic: impl Into<String>, receiver: mpsc::Receiver<BrokerMessage>) -> Self {
        Self {
            topic: topic.into(),
            receiver,
        }
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next message on the topic
    /// - `None` - The subscription ended (broker closed)
    pub async fn recv(&mut self) -> Option<BrokerMessage> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<Option<BrokerMessage>, BrokerError> {
        match self.receiver.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(BrokerError::Closed),
        }
    }

    /// The subscribed topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Explicitly end the subscription.
    pub fn unsubscribe(mut self) {
        self.receiver.close();
        debug!(topic = %self.topic, "Unsubscribed");
    }
}
