//! # Fan-in Consumers
//!
//! Drain the shared queue of one event kind and forward each event to the
//! mailbox of the shard that owns its user.
//!
//! ## Ordering
//!
//! With a single consumer per kind, events of one user reach their shard in
//! queue order. When several consumers drain the same queue, two events of
//! the same user may be forwarded out of order; ordering is then best-effort.

use super::queue::SharedReceiver;
use super::shard::{ShardInput, ShardRouter};
use crate::domain::DigestError;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A fan-in consumer for inbound kind `E`.
pub struct FanInConsumer<E> {
    name: String,
    queue: SharedReceiver<E>,
    router: Arc<ShardRouter>,
}

impl<E: ShardInput> FanInConsumer<E> {
    /// Create consumer number `id` for the given shared queue.
    #[must_use]
    pub fn new(id: usize, queue: SharedReceiver<E>, router: Arc<ShardRouter>) -> Self {
        Self {
            name: format!("{}-consumer#{id}", E::KIND),
            queue,
            router,
        }
    }

    /// Forward events until the shared queue closes.
    ///
    /// # Errors
    ///
    /// Fatal `Invariant`/`Config` errors when an event cannot be routed;
    /// nothing is dropped silently.
    pub async fn run(self) -> Result<(), DigestError> {
        info!("[{}] Consumer started", self.name);

        while let Some(event) = self.queue.recv().await {
            let shard = match self.router.route(event.user_id()) {
                Ok(shard) => shard,
                Err(e) => {
                    error!(user_id = %event.user_id(), "[{}] Cannot route event: {}", self.name, e);
                    return Err(e);
                }
            };

            debug!(
                user_id = %event.user_id(),
                shard = shard.index(),
                "[{}] Forwarding to shard", self.name
            );

            if E::mailbox(shard).send(event).await.is_err() {
                return Err(DigestError::QueueClosed(E::KIND));
            }
        }

        info!("[{}] Queue closed, exiting", self.name);
        Ok(())
    }
}
