//! # Customer Lookup End-to-End
//!
//! The request path as the demo node runs it: client → request_service →
//! CustomerLookup → reply address → client.
//!
//! ## Outcomes Covered
//!
//! | Scenario            | Expected outcome                       |
//! |---------------------|----------------------------------------|
//! | Service bound       | `SimpleResponse` with the customer name |
//! | No service bound    | `Transport` error, well before timeout |
//! | Service silent      | `Timeout` after T, registry empty      |
//! | Cancelled at 100ms  | `Cancelled` promptly                   |

#[cfg(test)]
mod tests {
    use crate::integration::harness::*;
    use relay_node::SimpleRequest;
    use relay_request::RequestError;
    use shared_bus::{InMemoryBus, TransportError};
    use std::time::{Duration, Instant};
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    // =========================================================================
    // SUCCESS
    // =========================================================================

    #[tokio::test]
    async fn test_customer_lookup_returns_name() {
        let bus = InMemoryBus::new();
        let _service = customer_service(&bus).await;
        let client = customer_client(&bus, Duration::from_secs(10));

        let response = client
            .request(&SimpleRequest::new("customer123"), &CancellationToken::new())
            .await
            .expect("lookup should succeed");

        assert_eq!(response.customer_name, "Customer Number customer123");
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_lookups_reuse_reply_address() {
        let bus = InMemoryBus::new();
        let _service = customer_service(&bus).await;
        let client = customer_client(&bus, Duration::from_secs(10));
        let cancel = CancellationToken::new();

        client.request(&SimpleRequest::new("a"), &cancel).await.unwrap();
        let first = client.reply_address().cloned().expect("resolved");
        client.request(&SimpleRequest::new("b"), &cancel).await.unwrap();

        assert_eq!(client.reply_address(), Some(&first));
        // service + one reply endpoint
        assert_eq!(bus.subscriber_count(), 2);
    }

    // =========================================================================
    // FAILURES
    // =========================================================================

    #[tokio::test]
    async fn test_unreachable_service_fails_fast() {
        let bus = InMemoryBus::new();
        let client = customer_client(&bus, Duration::from_secs(10));

        let started = Instant::now();
        let err = timeout(
            Duration::from_secs(1),
            client.request(&SimpleRequest::new("customer123"), &CancellationToken::new()),
        )
        .await
        .expect("should not wait for the timeout")
        .unwrap_err();

        assert!(matches!(
            err,
            RequestError::Transport(TransportError::Unroutable { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_silent_service_times_out_within_bounds() {
        let bus = InMemoryBus::new();
        let (_service, mut seen) = recording_service(&bus, CUSTOMER_SERVICE).await;
        let limit = Duration::from_millis(200);
        let client = customer_client(&bus, limit);

        let started = Instant::now();
        let err = client
            .request(&SimpleRequest::new("customer123"), &CancellationToken::new())
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, RequestError::Timeout { timeout: t } if t == limit));
        assert!(elapsed >= limit, "returned early: {elapsed:?}");
        assert!(elapsed < limit + Duration::from_millis(500), "returned late: {elapsed:?}");
        assert_eq!(client.pending_count(), 0);
        assert!(seen.try_recv().is_ok(), "request should have been delivered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_service_default_timeout() {
        let bus = InMemoryBus::new();
        let (_service, _seen) = recording_service(&bus, CUSTOMER_SERVICE).await;
        let client = customer_client(&bus, relay_request::DEFAULT_REQUEST_TIMEOUT);

        let started = tokio::time::Instant::now();
        let err = client
            .request(&SimpleRequest::new("customer123"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_after_100ms() {
        let bus = InMemoryBus::new();
        let (_service, _seen) = recording_service(&bus, CUSTOMER_SERVICE).await;
        let client = customer_client(&bus, Duration::from_secs(10));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = client
            .request(&SimpleRequest::new("customer123"), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_service_restart_is_reachable_again() {
        let bus = InMemoryBus::new();
        let client = customer_client(&bus, Duration::from_secs(5));
        let cancel = CancellationToken::new();

        let service = customer_service(&bus).await;
        assert!(client.request(&SimpleRequest::new("x"), &cancel).await.is_ok());

        drop(service);
        let err = client.request(&SimpleRequest::new("x"), &cancel).await.unwrap_err();
        assert!(err.is_transport());

        let _service = customer_service(&bus).await;
        let response = client.request(&SimpleRequest::new("x"), &cancel).await.unwrap();
        assert_eq!(response.customer_name, "Customer Number x");
    }
}
