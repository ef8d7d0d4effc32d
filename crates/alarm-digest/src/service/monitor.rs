//! Debug listener on the digest topic.

use crate::domain::{DigestError, DigestMessage};
use shared_bus::{MessageBroker, Subscription};
use tokio::sync::watch;
use tracing::{info, warn};

/// Logs every digest published on the digest topic.
pub struct DigestMonitor {
    subscription: Subscription,
    seen: u64,
}

impl DigestMonitor {
    /// Subscribe to `topic`.
    pub async fn register(broker: &dyn MessageBroker, topic: &str) -> Result<Self, DigestError> {
        Ok(Self {
            subscription: broker.subscribe(topic).await?,
            seen: 0,
        })
    }

    /// Log digests until the subscription ends or shutdown.
    ///
    /// Returns the number of digests decoded.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<u64, DigestError> {
        loop {
            if *shutdown.borrow() {
                break;
            }
            let message = tokio::select! {
                message = self.subscription.recv() => message,
                _ = shutdown.changed() => None,
            };
            let Some(message) = message else { break };

            match serde_json::from_slice::<DigestMessage>(&message.payload) {
                Ok(digest) => {
                    self.seen += 1;
                    info!(
                        user_id = %digest.user_id,
                        alarms = digest.active_alarms.len(),
                        "[digest-monitor] Digest observed: {:?}", digest.active_alarms
                    );
                }
                Err(e) => warn!(
                    topic = %message.topic,
                    "[digest-monitor] Bad formatted digest: {}", e
                ),
            }
        }

        self.subscription.unsubscribe();
        Ok(self.seen)
    }
}
