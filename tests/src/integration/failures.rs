//! # Failure Channel
//!
//! What happens to requests the service cannot or should not answer:
//! processing failures are redelivered and then dead-lettered, expired
//! requests are acknowledged without a reply, and abandoned entries are
//! swept from the registry.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use relay_request::{cleanup_task, PendingRequestRegistry, Responder};
    use shared_bus::{BusConfig, InMemoryBus, MessageTransport, DLQ_ADDRESS};
    use shared_types::{now_millis, Address, CorrelationId, Envelope};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    // =========================================================================
    // REDELIVERY AND DEAD LETTERS
    // =========================================================================

    #[tokio::test]
    async fn test_failing_responder_is_redelivered_then_dead_lettered() {
        let bus = InMemoryBus::new();
        let processor = AlwaysFails::default();
        let attempts = processor.attempts.clone();
        let _service = echo_service(&bus, processor).await;
        let (_dlq, mut dead) = recording_service(&bus, DLQ_ADDRESS).await;
        let client = echo_client(&bus, Duration::from_millis(300));

        let err = client
            .request(&echo("doomed", 0), &CancellationToken::new())
            .await
            .unwrap_err();

        // The caller learns nothing beyond the timeout
        assert!(err.is_timeout());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let forwarded = timeout(Duration::from_secs(1), dead.recv())
            .await
            .expect("dead letter forwarded")
            .expect("envelope");
        assert_eq!(
            forwarded.header(shared_bus::HEADER_DEAD_LETTER_ADDRESS),
            Some(ECHO_SERVICE)
        );

        let letters = bus.dead_letters();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].attempts, 3);
        assert_eq!(letters[0].address, Address::new(ECHO_SERVICE));
    }

    #[tokio::test]
    async fn test_redelivery_limit_is_configurable() {
        let bus = InMemoryBus::with_config(BusConfig {
            max_redeliveries: 0,
            ..BusConfig::default()
        });
        let processor = AlwaysFails::default();
        let attempts = processor.attempts.clone();
        let _service = echo_service(&bus, processor).await;
        let client = echo_client(&bus, Duration::from_millis(100));

        let _ = client.request(&echo("once", 0), &CancellationToken::new()).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(bus.messages_dead_lettered(), 1);
    }

    // =========================================================================
    // EXPIRY
    // =========================================================================

    #[tokio::test]
    async fn test_expired_request_is_not_answered() {
        let bus = InMemoryBus::new();
        let _service = customer_service(&bus).await;
        let (_sink, mut replies) = recording_service(&bus, "reply.manual").await;

        let request = Envelope::encode(
            &relay_node::SimpleRequest::new("late"),
            CorrelationId::new(),
        )
        .unwrap()
        .with_reply_to(Address::new("reply.manual"))
        .with_expires_at(now_millis().saturating_sub(1_000));
        bus.send(request, &Address::new(CUSTOMER_SERVICE)).await.unwrap();

        assert!(timeout(Duration::from_millis(200), replies.recv())
            .await
            .is_err());
        // Acknowledged, not dead-lettered
        assert_eq!(bus.messages_dead_lettered(), 0);
    }

    #[tokio::test]
    async fn test_request_without_reply_address_is_dead_lettered() {
        let bus = InMemoryBus::with_config(BusConfig {
            max_redeliveries: 1,
            ..BusConfig::default()
        });
        let _service = customer_service(&bus).await;

        let request = Envelope::encode(
            &relay_node::SimpleRequest::new("orphan"),
            CorrelationId::new(),
        )
        .unwrap();
        bus.send(request, &Address::new(CUSTOMER_SERVICE)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let letters = bus.dead_letters();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].attempts, 2);
    }

    // =========================================================================
    // REGISTRY SWEEP
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps_abandoned_entries() {
        let registry = Arc::new(PendingRequestRegistry::new());
        let now = tokio::time::Instant::now();
        let _short = registry
            .insert(CorrelationId::new(), now + Duration::from_millis(500))
            .unwrap();
        let _long = registry
            .insert(CorrelationId::new(), now + Duration::from_secs(60))
            .unwrap();

        let sweeper = tokio::spawn(cleanup_task(registry.clone(), Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.stats().snapshot().expired, 1);
        sweeper.abort();
    }

    #[tokio::test]
    async fn test_responder_shares_bus_with_second_service() {
        // Two services on one bus answer independently
        let bus = InMemoryBus::new();
        let _customers = customer_service(&bus).await;
        let _echo = Responder::new(DelayedEcho, Arc::new(bus.clone()))
            .bind(&Address::new(ECHO_SERVICE))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let customers = customer_client(&bus, Duration::from_secs(5));
        let echoes = echo_client(&bus, Duration::from_secs(5));

        let lookup = relay_node::SimpleRequest::new("c9");
        let ping = echo("e9", 5);
        let (a, b) = tokio::join!(
            customers.request(&lookup, &cancel),
            echoes.request(&ping, &cancel),
        );
        assert_eq!(a.unwrap().customer_name, "Customer Number c9");
        assert_eq!(b.unwrap().tag, "e9");
    }
}
