//! Service bootstrap and digest collection for scenarios.

use crate::emulator::TrafficEmulator;
use alarm_digest::{DigestConfig, DigestMessage, ALARM_DIGEST};
use async_trait::async_trait;
use digest_runtime::DigestRuntime;
use shared_bus::{BrokerError, InMemoryBroker, MessageBroker, Subscription};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};

/// Pause letting status changes settle in their shards before a digest
/// request is published on a different pipeline.
pub const SETTLE: Duration = Duration::from_millis(150);

/// Window during which digests are collected.
pub const COLLECT_WINDOW: Duration = Duration::from_millis(500);

/// A running service plus everything a scenario needs to drive it.
pub struct TestService {
    /// The broker shared by producers, service and observer.
    pub broker: Arc<InMemoryBroker>,
    /// The running pipeline.
    pub runtime: DigestRuntime,
    /// Subscription on the digest topic, opened before startup.
    pub digests: Subscription,
    /// Producer emulator sized to the configuration.
    pub emulator: TrafficEmulator,
}

/// Default-sized configuration for scenarios.
pub fn test_config() -> DigestConfig {
    DigestConfig {
        shard_count: 4,
        status_listeners: 2,
        digest_request_listeners: 2,
        ..DigestConfig::default()
    }
}

/// Start the service on a fresh in-memory broker.
pub async fn start_service(config: DigestConfig) -> TestService {
    let broker = Arc::new(InMemoryBroker::new());
    let digests = broker
        .subscribe(ALARM_DIGEST)
        .await
        .expect("subscribe to digest topic");
    let emulator = TrafficEmulator::new(broker.clone(), &config);
    let runtime = DigestRuntime::start(config, broker.clone())
        .await
        .expect("start digest runtime");

    TestService {
        broker,
        runtime,
        digests,
        emulator,
    }
}

/// Collect every digest published within `window`.
pub async fn collect_digests(subscription: &mut Subscription, window: Duration) -> Vec<DigestMessage> {
    let deadline = Instant::now() + window;
    let mut digests = Vec::new();
    while let Ok(Some(message)) = timeout_at(deadline, subscription.recv()).await {
        digests.push(serde_json::from_slice(&message.payload).expect("digest payload is JSON"));
    }
    digests
}

/// Broker whose digest publishes take `delay` before reaching the inner
/// broker, keeping digests in flight when shutdown begins. Other topics pass
/// straight through.
pub struct DelayedDigestBroker {
    inner: Arc<InMemoryBroker>,
    delay: Duration,
    digests_published: AtomicUsize,
}

impl DelayedDigestBroker {
    /// Wrap `inner`, delaying every digest publish by `delay`.
    pub fn new(inner: Arc<InMemoryBroker>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            digests_published: AtomicUsize::new(0),
        }
    }

    /// Digests forwarded to the inner broker so far.
    pub fn digests_published(&self) -> usize {
        self.digests_published.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBroker for DelayedDigestBroker {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError> {
        self.inner.subscribe(topic).await
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<usize, BrokerError> {
        if topic != ALARM_DIGEST {
            return self.inner.publish(topic, payload).await;
        }
        sleep(self.delay).await;
        let delivered = self.inner.publish(topic, payload).await?;
        self.digests_published.fetch_add(1, Ordering::SeqCst);
        Ok(delivered)
    }
}
