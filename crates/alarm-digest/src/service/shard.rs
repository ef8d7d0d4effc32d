//! # Shard Workers
//!
//! Each worker owns one partition of user state and processes its two
//! private mailboxes (status changes, digest requests) on a single task.
//! Since all mutation of a partition happens on that task, the state needs no
//! locks.
//!
//! The [`ShardRouter`] is the immutable shard-index to mailbox table. It is
//! built once before any task starts and only read afterwards.

use crate::algorithms::{distribute, ShardIndex};
use crate::domain::{
    DigestError, DigestMessage, DigestRequest, Routed, ShardState, StatusChangedEvent, UserId,
};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Sending side of a shard's private mailboxes.
#[derive(Debug, Clone)]
pub struct ShardHandle {
    index: ShardIndex,
    status_changes: mpsc::Sender<StatusChangedEvent>,
    digest_requests: mpsc::Sender<DigestRequest>,
}

impl ShardHandle {
    /// Shard index served by this handle.
    #[must_use]
    pub fn index(&self) -> ShardIndex {
        self.index
    }
}

/// Inbound wire messages that have a mailbox on every shard.
pub trait ShardInput: Routed + DeserializeOwned + Send + Sized + 'static {
    /// Name used in logs and errors.
    const KIND: &'static str;

    /// The shard mailbox for this kind.
    fn mailbox(handle: &ShardHandle) -> &mpsc::Sender<Self>;
}

impl ShardInput for StatusChangedEvent {
    const KIND: &'static str = "status-changed";

    fn mailbox(handle: &ShardHandle) -> &mpsc::Sender<Self> {
        &handle.status_changes
    }
}

impl ShardInput for DigestRequest {
    const KIND: &'static str = "digest-request";

    fn mailbox(handle: &ShardHandle) -> &mpsc::Sender<Self> {
        &handle.digest_requests
    }
}

/// Immutable routing table from shard index to shard mailboxes.
#[derive(Debug)]
pub struct ShardRouter {
    shard_count: u32,
    shards: Vec<ShardHandle>,
}

impl ShardRouter {
    /// Build the table for `shard_count` shards.
    ///
    /// Handles are placed at their own index; a missing index is only
    /// detected when a user routes to it.
    #[must_use]
    pub fn new(shard_count: u32, handles: Vec<ShardHandle>) -> Self {
        let mut shards = handles;
        shards.sort_by_key(ShardHandle::index);
        Self {
            shard_count,
            shards,
        }
    }

    /// Configured shard count.
    #[must_use]
    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Find the shard owning `user_id`.
    ///
    /// # Errors
    ///
    /// - `Config` if the shard count is zero
    /// - `Invariant` if no live worker serves the computed index
    pub fn route(&self, user_id: &UserId) -> Result<&ShardHandle, DigestError> {
        let index = distribute(user_id, self.shard_count)?;
        self.shards
            .binary_search_by_key(&index, ShardHandle::index)
            .map(|position| &self.shards[position])
            .map_err(|_| {
                DigestError::Invariant(format!("no shard worker for distribution id {index}"))
            })
    }
}

/// A shard worker task.
pub struct ShardWorker {
    index: ShardIndex,
    name: String,
    state: ShardState,
    status_changes: mpsc::Receiver<StatusChangedEvent>,
    digest_requests: mpsc::Receiver<DigestRequest>,
    digests: mpsc::Sender<DigestMessage>,
}

impl ShardWorker {
    /// Create a worker and the handle feeding it.
    #[must_use]
    pub fn new(
        index: ShardIndex,
        status_capacity: usize,
        request_capacity: usize,
        digests: mpsc::Sender<DigestMessage>,
    ) -> (Self, ShardHandle) {
        let (status_tx, status_rx) = mpsc::channel(status_capacity);
        let (request_tx, request_rx) = mpsc::channel(request_capacity);

        let worker = Self {
            index,
            name: format!("shard#{index}"),
            state: ShardState::new(),
            status_changes: status_rx,
            digest_requests: request_rx,
            digests,
        };
        let handle = ShardHandle {
            index,
            status_changes: status_tx,
            digest_requests: request_tx,
        };
        (worker, handle)
    }

    /// Shard index.
    #[must_use]
    pub fn index(&self) -> ShardIndex {
        self.index
    }

    /// Read access to the partition state.
    #[must_use]
    pub fn state(&self) -> &ShardState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn try_next_digest_request(&mut self) -> Option<DigestRequest> {
        self.digest_requests.try_recv().ok()
    }

    #[cfg(test)]
    pub(crate) fn try_next_status_change(&mut self) -> Option<StatusChangedEvent> {
        self.status_changes.try_recv().ok()
    }

    /// Process both mailboxes until both are closed.
    pub async fn run(mut self) -> Result<(), DigestError> {
        info!("[{}] Shard worker started", self.name);

        loop {
            tokio::select! {
                Some(event) = self.status_changes.recv() => {
                    self.handle_status_changed(&event);
                }
                Some(request) = self.digest_requests.recv() => {
                    self.handle_digest_request(&request).await?;
                }
                else => break,
            }
        }

        info!(
            users = self.state.user_count(),
            "[{}] Mailboxes closed, exiting", self.name
        );
        Ok(())
    }

    /// Apply one status change to the partition.
    pub fn handle_status_changed(&mut self, event: &StatusChangedEvent) {
        let alarm = self.state.apply_status_change(event);
        debug!(
            user_id = %event.user_id,
            alarm_id = %event.alarm_id,
            status = %alarm.status,
            active = alarm.is_active(),
            "[{}] Status change applied", self.name
        );
    }

    /// Emit and flush the user's digest, if any alarm is active.
    ///
    /// Waits while the digest queue is full. The active set is cleared only
    /// after the digest was queued.
    pub async fn handle_digest_request(
        &mut self,
        request: &DigestRequest,
    ) -> Result<(), DigestError> {
        let Some(digest) = self.state.digest_for(&request.user_id) else {
            debug!(
                user_id = %request.user_id,
                "[{}] No active alarms, digest not sent", self.name
            );
            return Ok(());
        };

        let alarms = digest.active_alarms.len();
        self.digests
            .send(digest)
            .await
            .map_err(|_| DigestError::QueueClosed("digest"))?;
        self.state.clear_active(&request.user_id);

        debug!(
            user_id = %request.user_id,
            alarms = alarms,
            "[{}] Digest queued", self.name
        );
        Ok(())
    }
}
