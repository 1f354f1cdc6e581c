//! Reply endpoint: the client's inbound address and its listener.

use crate::domain::pending::PendingRequestRegistry;
use async_trait::async_trait;
use relay_telemetry::{metric_inc, STALE_RESPONSES};
use shared_bus::{HandlerError, MessageHandler, MessageTransport, Subscription, TransportError};
use shared_types::{Address, Envelope};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// The resolved reply destination of one client.
///
/// Holds the subscription; dropping the endpoint unbinds the address.
#[derive(Debug)]
pub struct ReplyEndpoint {
    address: Address,
    _subscription: Subscription,
}

impl ReplyEndpoint {
    /// Allocate a client-unique address (`<prefix>.<uuid>`) and bind a
    /// listener on it that completes entries in `registry`.
    pub async fn resolve(
        transport: &dyn MessageTransport,
        prefix: &str,
        registry: Arc<PendingRequestRegistry>,
    ) -> Result<Self, TransportError> {
        let address = Address::new(format!("{}.{}", prefix, Uuid::new_v4()));
        let listener = Arc::new(ReplyListener { registry });
        let subscription = transport.subscribe(&address, listener).await?;

        info!(reply_to = %address, "Reply endpoint resolved");

        Ok(Self {
            address,
            _subscription: subscription,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }
}

/// Routes inbound responses to the pending request registry.
pub struct ReplyListener {
    registry: Arc<PendingRequestRegistry>,
}

impl ReplyListener {
    pub fn new(registry: Arc<PendingRequestRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl MessageHandler for ReplyListener {
    async fn handle(&self, envelope: Envelope) -> Result<(), HandlerError> {
        let correlation_id = envelope.correlation_id();

        if !self.registry.complete(correlation_id, envelope) {
            // Late, duplicate or foreign: acknowledged and dropped
            metric_inc!(STALE_RESPONSES);
            debug!(
                correlation_id = %correlation_id,
                "Response for unknown or expired correlation ID"
            );
        }
        Ok(())
    }
}
