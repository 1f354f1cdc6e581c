//! Shared fixtures: message types, services and client constructors.

use async_trait::async_trait;
use relay_node::{CustomerClient, CustomerLookup};
use relay_request::{ClientConfig, ProcessingError, RequestClient, RequestProcessor, Responder};
use serde::{Deserialize, Serialize};
use shared_bus::{handler_fn, InMemoryBus, MessageTransport, Subscription};
use shared_types::{Address, Envelope, Message};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const CUSTOMER_SERVICE: &str = "request_service";
pub const ECHO_SERVICE: &str = "echo_service";

// =============================================================================
// MESSAGES
// =============================================================================

/// Echo request that asks the responder to wait before answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoRequest {
    pub tag: String,
    pub delay_ms: u64,
}

impl Message for EchoRequest {
    const MESSAGE_TYPE: &'static str = "urn:message:test:EchoRequest";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub tag: String,
}

impl Message for EchoResponse {
    const MESSAGE_TYPE: &'static str = "urn:message:test:EchoResponse";
}

pub type EchoClient = RequestClient<EchoRequest, EchoResponse>;

// =============================================================================
// PROCESSORS
// =============================================================================

/// Echoes the tag after the requested delay.
pub struct DelayedEcho;

#[async_trait]
impl RequestProcessor for DelayedEcho {
    type Request = EchoRequest;
    type Response = EchoResponse;

    async fn process(&self, request: EchoRequest) -> Result<EchoResponse, ProcessingError> {
        tokio::time::sleep(Duration::from_millis(request.delay_ms)).await;
        Ok(EchoResponse { tag: request.tag })
    }
}

/// Fails every request and counts the attempts.
#[derive(Clone, Default)]
pub struct AlwaysFails {
    pub attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl RequestProcessor for AlwaysFails {
    type Request = EchoRequest;
    type Response = EchoResponse;

    async fn process(&self, _request: EchoRequest) -> Result<EchoResponse, ProcessingError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ProcessingError::failed("backend unavailable"))
    }
}

// =============================================================================
// SERVICES
// =============================================================================

pub async fn customer_service(bus: &InMemoryBus) -> Subscription {
    Responder::new(CustomerLookup, Arc::new(bus.clone()))
        .bind(&Address::new(CUSTOMER_SERVICE))
        .await
        .expect("bind customer service")
}

pub async fn echo_service<P>(bus: &InMemoryBus, processor: P) -> Subscription
where
    P: RequestProcessor<Request = EchoRequest, Response = EchoResponse>,
{
    Responder::new(processor, Arc::new(bus.clone()))
        .bind(&Address::new(ECHO_SERVICE))
        .await
        .expect("bind echo service")
}

/// Binds `address` and forwards every delivery to the returned channel
/// without answering.
pub async fn recording_service(
    bus: &InMemoryBus,
    address: &str,
) -> (Subscription, mpsc::UnboundedReceiver<Envelope>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sub = bus
        .subscribe(
            &Address::new(address),
            handler_fn(move |envelope: Envelope| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(envelope);
                    Ok(())
                }
            }),
        )
        .await
        .expect("bind recording service");
    (sub, rx)
}

// =============================================================================
// CLIENTS
// =============================================================================

pub fn customer_client(bus: &InMemoryBus, timeout: Duration) -> CustomerClient {
    RequestClient::new(
        Arc::new(bus.clone()),
        ClientConfig::new(CUSTOMER_SERVICE).with_timeout(timeout),
    )
}

pub fn echo_client(bus: &InMemoryBus, timeout: Duration) -> EchoClient {
    RequestClient::new(
        Arc::new(bus.clone()),
        ClientConfig::new(ECHO_SERVICE).with_timeout(timeout),
    )
}

pub fn echo(tag: &str, delay_ms: u64) -> EchoRequest {
    EchoRequest {
        tag: tag.to_string(),
        delay_ms,
    }
}
