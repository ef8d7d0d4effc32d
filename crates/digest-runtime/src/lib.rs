//! # Alarm Digest Runtime
//!
//! Wires the digest pipeline over a [`MessageBroker`] and supervises it.
//!
//! ## Startup Sequence
//!
//! Tasks are started downstream first, so every queue has a consumer before
//! anything can write to it:
//!
//! 1. Validate configuration
//! 2. Digest monitor (optional) and digest publishers
//! 3. Shard workers, then the immutable shard router
//! 4. Fan-in consumers for both inbound kinds
//! 5. Partition listeners and delegators (broker subscriptions)
//!
//! ## Shutdown Sequence
//!
//! The shutdown signal only reaches the listeners and delegators. Every other
//! stage stops because its input queue closes once all upstream senders are
//! gone:
//!
//! ```text
//! listeners stop → shared queues close → consumers exit (router dropped)
//!   → shard mailboxes close → workers exit → digest queue closes
//!   → publishers exit
//! ```
//!
//! In-flight digests are therefore published before the runtime returns.

pub mod config;
pub mod logging;
pub mod supervisor;

use alarm_digest::{
    shared_channel, DigestConfig, DigestError, DigestMessage, DigestMonitor, DigestPublisher,
    DigestRequest, FanInConsumer, ListenerSet, ShardInput, ShardRouter, ShardWorker,
    StatusChangedEvent, ALARM_DIGEST, ALARM_STATUS_CHANGED, SEND_ALARM_DIGEST,
};
use shared_bus::MessageBroker;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

pub use config::{load_config, load_config_from};
pub use logging::{init_logging, LoggingConfig};
pub use supervisor::{RuntimeError, Supervisor};

/// Time allowed for the pipeline to drain after the shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A running digest service.
pub struct DigestRuntime {
    config: DigestConfig,
    supervisor: Supervisor,
    shutdown_tx: watch::Sender<bool>,
}

impl DigestRuntime {
    /// Validate `config`, wire the pipeline on `broker` and spawn every task.
    ///
    /// # Errors
    ///
    /// `Config` for invalid configuration, `Startup` when a broker
    /// subscription fails. Tasks already spawned are aborted on error.
    pub async fn start(
        config: DigestConfig,
        broker: Arc<dyn MessageBroker>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        info!("===========================================");
        info!("  Alarm Digest Runtime v{}", alarm_digest::VERSION);
        info!("===========================================");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut supervisor = Supervisor::new();

        match Self::spawn_pipeline(&config, &broker, &mut supervisor, shutdown_rx).await {
            Ok(()) => {
                info!(
                    shards = config.shard_count,
                    tasks = supervisor.len(),
                    "All pipeline tasks running"
                );
                Ok(Self {
                    config,
                    supervisor,
                    shutdown_tx,
                })
            }
            Err(e) => {
                error!("Startup failed: {}", e);
                supervisor.abort_all();
                Err(e.into())
            }
        }
    }

    async fn spawn_pipeline(
        config: &DigestConfig,
        broker: &Arc<dyn MessageBroker>,
        supervisor: &mut Supervisor,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), DigestError> {
        // Step 1: outbound side
        if config.digest_monitor {
            let monitor = DigestMonitor::register(broker.as_ref(), ALARM_DIGEST).await?;
            let shutdown = shutdown_rx.clone();
            supervisor.spawn("digest-monitor", async move {
                monitor.run(shutdown).await.map(|_| ())
            });
        }

        let (digest_tx, digest_rx) = shared_channel::<DigestMessage>(config.digest_queue_capacity);
        for id in 0..config.digest_publishers {
            let publisher =
                DigestPublisher::new(id, ALARM_DIGEST, digest_rx.clone(), Arc::clone(broker));
            supervisor.spawn(format!("digest-publisher#{id}"), publisher.run());
        }
        drop(digest_rx);

        // Step 2: shard workers and router
        let mut handles = Vec::with_capacity(config.shard_count as usize);
        for index in 0..config.shard_count {
            let (worker, handle) = ShardWorker::new(
                index,
                config.shard_status_queue_capacity,
                config.shard_digest_request_queue_capacity,
                digest_tx.clone(),
            );
            supervisor.spawn(format!("shard#{index}"), worker.run());
            handles.push(handle);
        }
        drop(digest_tx);
        let router = Arc::new(ShardRouter::new(config.shard_count, handles));

        // Step 3: fan-in consumers
        let status_tx = spawn_consumers::<StatusChangedEvent>(
            supervisor,
            &router,
            config.status_consumers,
            config.status_queue_capacity,
        );
        let request_tx = spawn_consumers::<DigestRequest>(
            supervisor,
            &router,
            config.digest_request_consumers,
            config.digest_request_queue_capacity,
        );
        drop(router);

        // Step 4: broker subscriptions
        spawn_listeners(
            supervisor,
            broker,
            ALARM_STATUS_CHANGED,
            config.status_listeners,
            status_tx,
            config,
            &shutdown_rx,
        )
        .await?;
        spawn_listeners(
            supervisor,
            broker,
            SEND_ALARM_DIGEST,
            config.digest_request_listeners,
            request_tx,
            config,
            &shutdown_rx,
        )
        .await?;

        Ok(())
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Signal the listeners to stop. The rest of the pipeline drains.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if self.shutdown_tx.send(true).is_err() {
            info!("No listener left to signal");
        }
    }

    /// Run until every task has finished, a task fails fatally, or `signal`
    /// completes. On `signal` the pipeline is shut down and drained.
    ///
    /// # Errors
    ///
    /// The first fatal task error, or `ShutdownTimeout` when draining takes
    /// longer than [`SHUTDOWN_GRACE`].
    pub async fn run_until<S>(mut self, signal: S) -> Result<(), RuntimeError>
    where
        S: Future<Output = ()>,
    {
        let finished = tokio::select! {
            result = self.supervisor.wait() => Some(result),
            () = signal => None,
        };

        match finished {
            Some(result) => {
                self.shutdown();
                result
            }
            None => self.shutdown_and_wait().await,
        }
    }

    /// Shut down and wait for the pipeline to drain.
    ///
    /// # Errors
    ///
    /// As for [`Self::run_until`].
    pub async fn shutdown_and_wait(mut self) -> Result<(), RuntimeError> {
        self.shutdown();
        match tokio::time::timeout(SHUTDOWN_GRACE, self.supervisor.wait()).await {
            Ok(result) => {
                info!("Shutdown complete");
                result
            }
            Err(_) => {
                error!("Pipeline did not drain within {:?}", SHUTDOWN_GRACE);
                self.supervisor.abort_all();
                Err(RuntimeError::ShutdownTimeout)
            }
        }
    }
}

fn spawn_consumers<E: ShardInput>(
    supervisor: &mut Supervisor,
    router: &Arc<ShardRouter>,
    consumers: usize,
    capacity: usize,
) -> mpsc::Sender<E> {
    let (tx, rx) = shared_channel::<E>(capacity);
    for id in 0..consumers {
        let consumer = FanInConsumer::new(id, rx.clone(), Arc::clone(router));
        supervisor.spawn(format!("{}-consumer#{id}", E::KIND), consumer.run());
    }
    tx
}

async fn spawn_listeners<E: ShardInput>(
    supervisor: &mut Supervisor,
    broker: &Arc<dyn MessageBroker>,
    topic: &str,
    count: usize,
    queue: mpsc::Sender<E>,
    config: &DigestConfig,
    shutdown_rx: &watch::Receiver<bool>,
) -> Result<(), DigestError> {
    let set = ListenerSet::register(
        Arc::clone(broker),
        topic,
        count,
        &queue,
        config.malformed_payload_policy,
        config.register_delegators,
    )
    .await?;
    // Listeners now hold the only senders of the shared queue.
    drop(queue);

    for listener in set.listeners {
        let name = listener.name().to_string();
        supervisor.spawn(name, listener.run(shutdown_rx.clone()));
    }
    if let Some(delegator) = set.delegator {
        supervisor.spawn(format!("{topic}#Delegator"), delegator.run(shutdown_rx.clone()));
    }
    info!(topic = %topic, listeners = count, "Listeners subscribed");
    Ok(())
}
