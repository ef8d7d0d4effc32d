//! # Traffic Emulation
//!
//! Produces `AlarmStatusChanged` and `SendAlarmDigest` payloads the way real
//! producers do, either on a partition topic or on the legacy bare topic.

use alarm_digest::{
    partition_topic, AlarmId, AlarmStatus, DigestConfig, DigestError, DigestRequest,
    StatusChangedEvent, UserId, ALARM_STATUS_CHANGED, SEND_ALARM_DIGEST,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use shared_bus::MessageBroker;
use std::sync::Arc;
use std::time::Duration;

/// Where an emulated message is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// `topic.i`
    Partition(usize),
    /// `topic.i` with `i` drawn uniformly from the listener count.
    RandomPartition,
    /// The bare topic, consumed by the delegator.
    Legacy,
}

/// Publishes emulated producer traffic.
pub struct TrafficEmulator {
    broker: Arc<dyn MessageBroker>,
    status_listeners: usize,
    digest_request_listeners: usize,
}

impl TrafficEmulator {
    /// Emulator matching the listener counts of `config`.
    pub fn new(broker: Arc<dyn MessageBroker>, config: &DigestConfig) -> Self {
        Self {
            broker,
            status_listeners: config.status_listeners,
            digest_request_listeners: config.digest_request_listeners,
        }
    }

    /// Publish a status change; returns the payload sent.
    pub async fn emulate_status_changed(
        &self,
        alarm_id: &AlarmId,
        user_id: &UserId,
        status: AlarmStatus,
        changed_at: DateTime<Utc>,
        target: Target,
    ) -> Result<Vec<u8>, DigestError> {
        let event = StatusChangedEvent {
            alarm_id: alarm_id.clone(),
            user_id: user_id.clone(),
            status: status.as_str().to_string(),
            changed_at,
        };
        let topic = self.topic(ALARM_STATUS_CHANGED, self.status_listeners, target);
        self.publish(&topic, &event).await
    }

    /// Publish a digest request; returns the payload sent.
    pub async fn emulate_digest_request(
        &self,
        user_id: &UserId,
        target: Target,
    ) -> Result<Vec<u8>, DigestError> {
        let request = DigestRequest {
            user_id: user_id.clone(),
        };
        let topic = self.topic(SEND_ALARM_DIGEST, self.digest_request_listeners, target);
        self.publish(&topic, &request).await
    }

    /// Publish raw bytes on a topic of the given kind.
    pub async fn emulate_raw(
        &self,
        topic: &str,
        payload: &[u8],
        target: Target,
    ) -> Result<(), DigestError> {
        let partitions = if topic == ALARM_STATUS_CHANGED {
            self.status_listeners
        } else {
            self.digest_request_listeners
        };
        let topic = self.topic(topic, partitions, target);
        self.broker.publish(&topic, payload.to_vec()).await?;
        Ok(())
    }

    /// `shots` rounds of `bursts` fresh users, each getting one CRITICAL
    /// alarm followed by a digest request, with `pause` between rounds.
    ///
    /// Returns the users created.
    pub async fn emulate_traffic(
        &self,
        shots: usize,
        bursts: usize,
        pause: Duration,
    ) -> Result<Vec<UserId>, DigestError> {
        let mut users = Vec::with_capacity(shots * bursts);
        for _ in 0..shots {
            for _ in 0..bursts {
                let alarm_id = AlarmId(uuid::Uuid::new_v4().to_string());
                let user_id = UserId(uuid::Uuid::new_v4().to_string());
                self.emulate_status_changed(
                    &alarm_id,
                    &user_id,
                    AlarmStatus::Critical,
                    Utc::now(),
                    Target::RandomPartition,
                )
                .await?;
                self.emulate_digest_request(&user_id, Target::RandomPartition)
                    .await?;
                users.push(user_id);
            }
            tokio::time::sleep(pause).await;
        }
        Ok(users)
    }

    fn topic(&self, topic: &str, partitions: usize, target: Target) -> String {
        match target {
            Target::Partition(index) => partition_topic(topic, index),
            Target::RandomPartition => {
                let index = rand::thread_rng().gen_range(0..partitions.max(1));
                partition_topic(topic, index)
            }
            Target::Legacy => topic.to_string(),
        }
    }

    async fn publish<T: Serialize>(&self, topic: &str, message: &T) -> Result<Vec<u8>, DigestError> {
        let payload = serde_json::to_vec(message).map_err(DigestError::Serialization)?;
        self.broker.publish(topic, payload.clone()).await?;
        Ok(payload)
    }
}
