//! # Digest Publishers
//!
//! Drain the digest queue, encode each digest and publish it on the digest
//! topic. There is no retry and no outbox: a digest that cannot be published
//! is logged and lost.

use super::queue::SharedReceiver;
use crate::domain::{DigestError, DigestMessage};
use shared_bus::MessageBroker;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A digest publisher task.
pub struct DigestPublisher {
    name: String,
    topic: String,
    queue: SharedReceiver<DigestMessage>,
    broker: Arc<dyn MessageBroker>,
}

impl DigestPublisher {
    /// Create publisher number `id`.
    #[must_use]
    pub fn new(
        id: usize,
        topic: impl Into<String>,
        queue: SharedReceiver<DigestMessage>,
        broker: Arc<dyn MessageBroker>,
    ) -> Self {
        Self {
            name: format!("digest-publisher#{id}"),
            topic: topic.into(),
            queue,
            broker,
        }
    }

    /// Publish until the digest queue closes.
    ///
    /// # Errors
    ///
    /// `Serialization` if a digest cannot be encoded. Publish failures are
    /// logged and do not stop the task.
    pub async fn run(self) -> Result<(), DigestError> {
        info!(topic = %self.topic, "[{}] Publisher started", self.name);

        while let Some(digest) = self.queue.recv().await {
            let payload = serde_json::to_vec(&digest).map_err(|e| {
                error!(user_id = %digest.user_id, "[{}] Could not encode digest: {}", self.name, e);
                DigestError::Serialization(e)
            })?;

            match self.broker.publish(&self.topic, payload).await {
                Ok(receivers) => debug!(
                    user_id = %digest.user_id,
                    alarms = digest.active_alarms.len(),
                    receivers = receivers,
                    "[{}] Digest published", self.name
                ),
                Err(e) => error!(
                    user_id = %digest.user_id,
                    "[{}] Could not publish alarm digest message: {}", self.name, e
                ),
            }
        }

        info!("[{}] Digest queue closed, exiting", self.name);
        Ok(())
    }
}
