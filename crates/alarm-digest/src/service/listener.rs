//! # Partition Listeners and Delegators
//!
//! For `N` listeners per inbound kind, the service subscribes to the
//! partition topics `topic.0 .. topic.(N-1)`. Each listener decodes payloads
//! and forwards them into the shared queue of that kind.
//!
//! Producers unaware of partitioning publish on the bare `topic`. A single
//! delegator per kind subscribes there and republishes each raw payload onto
//! one partition topic, round-robin.
//!
//! ```text
//! topic ──→ Delegator ──round-robin──→ topic.i ──→ Listener#i ──→ shared queue
//! ```

use crate::config::MalformedPayloadPolicy;
use crate::domain::{ConfigError, DigestError};
use crate::topics::partition_topic;
use serde::de::DeserializeOwned;
use shared_bus::{BrokerMessage, MessageBroker, Subscription};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// The delegator counter restarts from zero at this value.
pub const DELEGATOR_COUNTER_RESET: u64 = u32::MAX as u64 - 10;

/// Wait for the next message unless shutdown is signalled first.
async fn next_message(
    subscription: &mut Subscription,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<BrokerMessage> {
    if *shutdown.borrow() {
        return None;
    }
    tokio::select! {
        message = subscription.recv() => message,
        _ = shutdown.changed() => None,
    }
}

/// Listener on one partition topic.
pub struct PartitionListener<E> {
    name: String,
    subscription: Subscription,
    queue: mpsc::Sender<E>,
    policy: MalformedPayloadPolicy,
}

impl<E> PartitionListener<E>
where
    E: DeserializeOwned + Send + 'static,
{
    /// Subscribe partition listeners `0..count` on `topic`.
    pub async fn register_all(
        broker: &dyn MessageBroker,
        topic: &str,
        count: usize,
        queue: &mpsc::Sender<E>,
        policy: MalformedPayloadPolicy,
    ) -> Result<Vec<Self>, DigestError> {
        let mut listeners = Vec::with_capacity(count);
        for index in 0..count {
            let subscription = broker.subscribe(&partition_topic(topic, index)).await?;
            listeners.push(Self {
                name: format!("{topic}#{index}"),
                subscription,
                queue: queue.clone(),
                policy,
            });
        }
        Ok(listeners)
    }

    /// Listener name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decode and forward until the subscription ends or shutdown.
    ///
    /// Dropping the listener releases its queue sender, so the shared queue
    /// closes once every listener of the kind has stopped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), DigestError> {
        info!(topic = %self.subscription.topic(), "[{}] Listener started", self.name);

        while let Some(message) = next_message(&mut self.subscription, &mut shutdown).await {
            match serde_json::from_slice::<E>(&message.payload) {
                Ok(event) => {
                    if self.queue.send(event).await.is_err() {
                        return Err(DigestError::QueueClosed("listener"));
                    }
                }
                Err(source) => match self.policy {
                    MalformedPayloadPolicy::Warn => {
                        warn!(
                            topic = %message.topic,
                            data = %String::from_utf8_lossy(&message.payload),
                            "[{}] Bad formatted message dropped: {}", self.name, source
                        );
                    }
                    MalformedPayloadPolicy::Fatal => {
                        error!(topic = %message.topic, "[{}] Bad formatted message", self.name);
                        return Err(DigestError::Decode {
                            topic: message.topic,
                            source,
                        });
                    }
                },
            }
        }

        self.subscription.unsubscribe();
        info!("[{}] Listener stopped", self.name);
        Ok(())
    }
}

/// Round-robin republisher for the legacy unpartitioned topic.
pub struct Delegator {
    name: String,
    topic: String,
    partitions: usize,
    counter: u64,
    subscription: Subscription,
    broker: Arc<dyn MessageBroker>,
}

impl Delegator {
    /// Subscribe to the bare `topic`, delegating over `partitions` topics.
    ///
    /// # Errors
    ///
    /// `Config` when `partitions` is zero; `Broker` when subscribing fails.
    pub async fn register(
        broker: Arc<dyn MessageBroker>,
        topic: &str,
        partitions: usize,
    ) -> Result<Self, DigestError> {
        if partitions == 0 {
            return Err(ConfigError::Zero("listener count").into());
        }
        let subscription = broker.subscribe(topic).await?;
        Ok(Self {
            name: format!("{topic}#Delegator"),
            topic: topic.to_string(),
            partitions,
            counter: 0,
            subscription,
            broker,
        })
    }

    /// Partition for the next message; advances the counter.
    pub fn next_partition(&mut self) -> usize {
        // The remainder is below `partitions`, which is a usize.
        let partition = (self.counter % self.partitions as u64) as usize;
        self.counter = if self.counter >= DELEGATOR_COUNTER_RESET {
            0
        } else {
            self.counter + 1
        };
        partition
    }

    /// Republish until the subscription ends or shutdown.
    ///
    /// Publish failures are transport errors: logged, never fatal.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), DigestError> {
        info!(partitions = self.partitions, "[{}] Delegator started", self.name);

        while let Some(message) = next_message(&mut self.subscription, &mut shutdown).await {
            let partition = self.next_partition();
            let target = partition_topic(&self.topic, partition);
            debug!(target = %target, "[{}] Delegating message", self.name);

            if let Err(e) = self.broker.publish(&target, message.payload).await {
                warn!(target = %target, "[{}] Could not delegate message: {}", self.name, e);
            }
        }

        self.subscription.unsubscribe();
        info!("[{}] Delegator stopped", self.name);
        Ok(())
    }
}

/// Everything subscribed for one inbound kind.
pub struct ListenerSet<E> {
    /// Partition listeners.
    pub listeners: Vec<PartitionListener<E>>,
    /// Legacy topic delegator, if registered.
    pub delegator: Option<Delegator>,
}

impl<E> ListenerSet<E>
where
    E: DeserializeOwned + Send + 'static,
{
    /// Register `count` partition listeners on `topic` and, optionally, the
    /// delegator for the bare topic.
    pub async fn register(
        broker: Arc<dyn MessageBroker>,
        topic: &str,
        count: usize,
        queue: &mpsc::Sender<E>,
        policy: MalformedPayloadPolicy,
        with_delegator: bool,
    ) -> Result<Self, DigestError> {
        let listeners =
            PartitionListener::register_all(broker.as_ref(), topic, count, queue, policy).await?;
        let delegator = if with_delegator {
            Some(Delegator::register(broker, topic, count).await?)
        } else {
            None
        };
        Ok(Self {
            listeners,
            delegator,
        })
    }
}
