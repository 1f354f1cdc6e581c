//! # Correlation Under Concurrency
//!
//! Many requests share one reply address. Each caller must get the
//! response for its own correlation id, exactly once, whatever order the
//! responses arrive in.

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use relay_request::{RequestError, SetHeader};
    use shared_bus::{InMemoryBus, MessageTransport};
    use shared_types::{CorrelationId, Envelope};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::task::JoinSet;
    use tokio_util::sync::CancellationToken;

    // =========================================================================
    // NO CROSS-TALK
    // =========================================================================

    #[tokio::test]
    async fn test_out_of_order_responses_reach_their_callers() {
        let bus = InMemoryBus::new();
        let _service = echo_service(&bus, DelayedEcho).await;
        let client = Arc::new(echo_client(&bus, Duration::from_secs(5)));

        // Later requests answer first
        let mut tasks = JoinSet::new();
        for i in 0..20u64 {
            let client = client.clone();
            tasks.spawn(async move {
                let tag = format!("req-{i}");
                let response = client
                    .request(&echo(&tag, 200 - i * 10), &CancellationToken::new())
                    .await;
                (tag, response)
            });
        }

        let mut answered = 0;
        while let Some(joined) = tasks.join_next().await {
            let (tag, response) = joined.unwrap();
            assert_eq!(response.unwrap().tag, tag);
            answered += 1;
        }

        assert_eq!(answered, 20);
        assert_eq!(client.pending_count(), 0);
        let stats = client.registry().stats().snapshot();
        assert_eq!(stats.registered, 20);
        assert_eq!(stats.completed, 20);
    }

    #[tokio::test]
    async fn test_every_request_gets_exactly_one_outcome() {
        let bus = InMemoryBus::new();
        let _service = echo_service(&bus, DelayedEcho).await;
        let client = Arc::new(echo_client(&bus, Duration::from_millis(150)));

        // Even requests answer in time, odd ones after the timeout, every
        // fourth is cancelled first
        let mut tasks = JoinSet::new();
        for i in 0..40u64 {
            let client = client.clone();
            tasks.spawn(async move {
                let cancel = CancellationToken::new();
                if i % 4 == 3 {
                    let trigger = cancel.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        trigger.cancel();
                    });
                }
                let delay = if i % 2 == 0 { 10 } else { 400 };
                (i, client.request(&echo(&i.to_string(), delay), &cancel).await)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined.unwrap());
        }
        assert_eq!(outcomes.len(), 40);

        for (i, outcome) in outcomes {
            match (i % 4, outcome) {
                (0 | 2, Ok(response)) => assert_eq!(response.tag, i.to_string()),
                (1, Err(RequestError::Timeout { .. })) => {}
                (3, Err(RequestError::Cancelled)) => {}
                (_, other) => panic!("request {i}: unexpected outcome {other:?}"),
            }
        }
        assert_eq!(client.pending_count(), 0);
    }

    // =========================================================================
    // STALE AND FORGED RESPONSES
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_response_is_dropped() {
        let bus = InMemoryBus::new();
        let _service = echo_service(&bus, DelayedEcho).await;
        let client = Arc::new(echo_client(&bus, Duration::from_secs(5)));

        let pending = {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .request(&echo("real", 100), &CancellationToken::new())
                    .await
            })
        };

        // Wait until the reply address exists, then inject a response nobody
        // is waiting for
        while client.reply_address().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let reply_to = client.reply_address().cloned().unwrap();
        let forged = Envelope::encode(
            &EchoResponse { tag: "forged".into() },
            CorrelationId::new(),
        )
        .unwrap();
        bus.send(forged, &reply_to).await.unwrap();

        let response = pending.await.unwrap().unwrap();
        assert_eq!(response.tag, "real");

        let stats = client.registry().stats().snapshot();
        assert_eq!(stats.stale, 1);
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn test_late_response_after_timeout_is_discarded() {
        let bus = InMemoryBus::new();
        let _service = echo_service(&bus, DelayedEcho).await;
        let client = echo_client(&bus, Duration::from_millis(50));
        let cancel = CancellationToken::new();

        let err = client.request(&echo("slow", 200), &cancel).await.unwrap_err();
        assert!(err.is_timeout());

        // The late response arrives and must not disturb the next request
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(client.registry().stats().snapshot().stale, 1);

        let response = client
            .request_with_timeout(&echo("fast", 0), Duration::from_secs(5), &cancel)
            .await
            .unwrap();
        assert_eq!(response.tag, "fast");
        assert_eq!(client.pending_count(), 0);
    }

    // =========================================================================
    // MUTATORS
    // =========================================================================

    #[tokio::test]
    async fn test_mutators_apply_in_order_on_the_wire() {
        let bus = InMemoryBus::new();
        let (_service, mut seen) = recording_service(&bus, ECHO_SERVICE).await;
        let client = echo_client(&bus, Duration::from_millis(50))
            .with_mutator(SetHeader::new("k", "A"))
            .with_mutator(SetHeader::new("k", "B"))
            .with_mutator(|envelope: Envelope| envelope.with_header("trace", "on"));

        let _ = client.request(&echo("m", 0), &CancellationToken::new()).await;

        let envelope = seen.recv().await.expect("request delivered");
        assert_eq!(envelope.header("k"), Some("B"));
        assert_eq!(envelope.header("trace"), Some("on"));
        assert_eq!(envelope.reply_to(), client.reply_address());
        assert!(envelope.expires_at().is_some());
    }
}
