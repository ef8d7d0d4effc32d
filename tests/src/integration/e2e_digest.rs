//! # End-to-End Digest Flows
//!
//! Status changes and digest requests published on partition topics, digests
//! observed on the outbound topic.

#[cfg(test)]
mod tests {
    use crate::emulator::Target;
    use crate::harness::{collect_digests, start_service, test_config, COLLECT_WINDOW, SETTLE};
    use alarm_digest::{AlarmId, AlarmStatus, DigestConfig, UserId};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::time::sleep;

    fn fresh_user() -> UserId {
        UserId(uuid::Uuid::new_v4().to_string())
    }

    fn fresh_alarm() -> AlarmId {
        AlarmId(uuid::Uuid::new_v4().to_string())
    }

    // =============================================================================
    // THREE USERS, TWO DIGESTS
    // =============================================================================

    /// X critical, Y warning, Z critical then cleared: requests for all three
    /// yield digests for X and Y only.
    #[tokio::test]
    async fn test_only_users_with_active_alarms_get_digests() {
        let mut service = start_service(test_config()).await;
        let emulator = &service.emulator;
        let now = Utc::now();

        let (x, y, z) = (fresh_user(), fresh_user(), fresh_user());
        let (alarm_x, alarm_y, alarm_z) = (fresh_alarm(), fresh_alarm(), fresh_alarm());

        emulator
            .emulate_status_changed(&alarm_x, &x, AlarmStatus::Critical, now, Target::RandomPartition)
            .await
            .unwrap();
        emulator
            .emulate_status_changed(&alarm_y, &y, AlarmStatus::Warning, now, Target::RandomPartition)
            .await
            .unwrap();
        // Same partition keeps Z's two changes in order.
        emulator
            .emulate_status_changed(&alarm_z, &z, AlarmStatus::Critical, now, Target::Partition(0))
            .await
            .unwrap();
        emulator
            .emulate_status_changed(
                &alarm_z,
                &z,
                AlarmStatus::Cleared,
                now + ChronoDuration::seconds(1),
                Target::Partition(0),
            )
            .await
            .unwrap();

        sleep(SETTLE).await;
        for user in [&x, &y, &z] {
            emulator
                .emulate_digest_request(user, Target::RandomPartition)
                .await
                .unwrap();
        }

        let digests = collect_digests(&mut service.digests, COLLECT_WINDOW).await;
        assert_eq!(digests.len(), 2);

        let users: HashSet<_> = digests.iter().map(|d| d.user_id.clone()).collect();
        assert!(users.contains(&x));
        assert!(users.contains(&y));
        assert!(!users.contains(&z));

        for digest in &digests {
            assert_eq!(digest.active_alarms.len(), 1);
        }

        service.runtime.shutdown_and_wait().await.unwrap();
    }

    // =============================================================================
    // ORDERING AND FLUSH
    // =============================================================================

    #[tokio::test]
    async fn test_digest_lists_oldest_change_first_then_flushes() {
        let mut service = start_service(test_config()).await;
        let emulator = &service.emulator;
        let user = fresh_user();
        let t1 = Utc::now();
        let t2 = t1 + ChronoDuration::seconds(5);

        // Published newest first; the digest must still be oldest first.
        emulator
            .emulate_status_changed(&"B".into(), &user, AlarmStatus::Warning, t2, Target::Partition(1))
            .await
            .unwrap();
        emulator
            .emulate_status_changed(&"A".into(), &user, AlarmStatus::Critical, t1, Target::Partition(1))
            .await
            .unwrap();

        sleep(SETTLE).await;
        emulator
            .emulate_digest_request(&user, Target::Partition(0))
            .await
            .unwrap();

        let digests = collect_digests(&mut service.digests, COLLECT_WINDOW).await;
        assert_eq!(digests.len(), 1);
        let ids: Vec<_> = digests[0]
            .active_alarms
            .iter()
            .map(|a| a.alarm_id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(digests[0].active_alarms[0].status, AlarmStatus::Critical);
        assert_eq!(digests[0].active_alarms[0].latest_changed_at, t1);

        // Flushed: a second request without new changes yields nothing.
        emulator
            .emulate_digest_request(&user, Target::Partition(1))
            .await
            .unwrap();
        assert!(collect_digests(&mut service.digests, COLLECT_WINDOW)
            .await
            .is_empty());

        service.runtime.shutdown_and_wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_alarm_reactivated_after_flush_is_reported_again() {
        let mut service = start_service(test_config()).await;
        let emulator = &service.emulator;
        let user = fresh_user();
        let alarm = fresh_alarm();
        let t0 = Utc::now();

        emulator
            .emulate_status_changed(&alarm, &user, AlarmStatus::Warning, t0, Target::Partition(0))
            .await
            .unwrap();
        sleep(SETTLE).await;
        emulator
            .emulate_digest_request(&user, Target::Partition(0))
            .await
            .unwrap();
        assert_eq!(collect_digests(&mut service.digests, COLLECT_WINDOW).await.len(), 1);

        let t1 = t0 + ChronoDuration::seconds(30);
        emulator
            .emulate_status_changed(&alarm, &user, AlarmStatus::Critical, t1, Target::Partition(0))
            .await
            .unwrap();
        sleep(SETTLE).await;
        emulator
            .emulate_digest_request(&user, Target::Partition(0))
            .await
            .unwrap();

        let digests = collect_digests(&mut service.digests, COLLECT_WINDOW).await;
        assert_eq!(digests.len(), 1);
        assert_eq!(digests[0].active_alarms[0].status, AlarmStatus::Critical);
        assert_eq!(digests[0].active_alarms[0].latest_changed_at, t1);

        service.runtime.shutdown_and_wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_status_keeps_previous_status() {
        let mut service = start_service(test_config()).await;
        let emulator = &service.emulator;
        let user = fresh_user();
        let alarm = fresh_alarm();
        let t0 = Utc::now();
        let t1 = t0 + ChronoDuration::seconds(2);

        emulator
            .emulate_status_changed(&alarm, &user, AlarmStatus::Warning, t0, Target::Partition(0))
            .await
            .unwrap();
        emulator
            .emulate_status_changed(&alarm, &user, AlarmStatus::Unknown, t1, Target::Partition(0))
            .await
            .unwrap();
        sleep(SETTLE).await;
        emulator
            .emulate_digest_request(&user, Target::Partition(0))
            .await
            .unwrap();

        let digests = collect_digests(&mut service.digests, COLLECT_WINDOW).await;
        assert_eq!(digests.len(), 1);
        assert_eq!(digests[0].active_alarms[0].status, AlarmStatus::Warning);
        assert_eq!(digests[0].active_alarms[0].latest_changed_at, t1);

        service.runtime.shutdown_and_wait().await.unwrap();
    }

    // =============================================================================
    // SCALE
    // =============================================================================

    #[tokio::test]
    async fn test_many_users_across_shards_each_get_one_digest() {
        let config = DigestConfig {
            shard_count: 8,
            status_consumers: 2,
            digest_request_consumers: 2,
            ..test_config()
        };
        let mut service = start_service(config).await;
        let emulator = &service.emulator;
        let now = Utc::now();

        let users: Vec<_> = (0..50).map(|_| fresh_user()).collect();
        for user in &users {
            emulator
                .emulate_status_changed(&fresh_alarm(), user, AlarmStatus::Critical, now, Target::RandomPartition)
                .await
                .unwrap();
        }
        sleep(SETTLE).await;
        for user in &users {
            emulator
                .emulate_digest_request(user, Target::RandomPartition)
                .await
                .unwrap();
        }

        let digests = collect_digests(&mut service.digests, Duration::from_secs(1)).await;
        assert_eq!(digests.len(), users.len());
        let seen: HashSet<_> = digests.into_iter().map(|d| d.user_id).collect();
        assert_eq!(seen.len(), users.len());

        service.runtime.shutdown_and_wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_emulated_traffic_never_duplicates_digests() {
        let mut service = start_service(test_config()).await;

        let users = service
            .emulator
            .emulate_traffic(3, 10, Duration::from_millis(10))
            .await
            .unwrap();

        // A request may overtake its status change; at most one digest each.
        let digests = collect_digests(&mut service.digests, COLLECT_WINDOW).await;
        assert!(digests.len() <= users.len());
        let seen: HashSet<_> = digests.iter().map(|d| d.user_id.clone()).collect();
        assert_eq!(seen.len(), digests.len());

        service.runtime.shutdown_and_wait().await.unwrap();
    }
}
