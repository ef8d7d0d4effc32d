//! Bounded queues drained by several homogeneous tasks.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Receiving side of a bounded queue that many tasks drain.
///
/// Each item is delivered to exactly one caller. The queue closes once every
/// sender is dropped and the buffer is empty.
#[derive(Debug)]
pub struct SharedReceiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedReceiver<T> {
    /// Share a receiver.
    #[must_use]
    pub fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Next item, or `None` once the queue is closed and drained.
    pub async fn recv(&self) -> Option<T> {
        self.inner.lock().await.recv().await
    }
}

/// Create a bounded queue with a shareable receiver.
#[must_use]
pub fn shared_channel<T>(capacity: usize) -> (mpsc::Sender<T>, SharedReceiver<T>) {
    let (sender, receiver) = mpsc::channel(capacity);
    (sender, SharedReceiver::new(receiver))
}
