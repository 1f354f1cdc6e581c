//! # Request Service
//!
//! Hosts the customer-lookup responder at the service address.

use crate::consumer::CustomerLookup;
use parking_lot::Mutex;
use relay_request::Responder;
use shared_bus::{MessageTransport, Subscription, TransportError};
use shared_types::Address;
use std::sync::Arc;
use tracing::info;

/// Start/stop host for the customer-lookup responder.
pub struct RequestService {
    transport: Arc<dyn MessageTransport>,
    address: Address,
    subscription: Mutex<Option<Subscription>>,
    /// Serializes `start` so the running check and the bind are one step.
    starting: tokio::sync::Mutex<()>,
}

impl RequestService {
    pub fn new(transport: Arc<dyn MessageTransport>, address: Address) -> Self {
        Self {
            transport,
            address,
            subscription: Mutex::new(None),
            starting: tokio::sync::Mutex::new(()),
        }
    }

    /// Bind the responder. Starting a running service is a no-op, also when
    /// two starts race.
    pub async fn start(&self) -> Result<(), TransportError> {
        let _starting = self.starting.lock().await;
        if self.is_running() {
            return Ok(());
        }

        info!(address = %self.address, "Starting request service...");
        let subscription = Responder::new(CustomerLookup, self.transport.clone())
            .bind(&self.address)
            .await?;
        *self.subscription.lock() = Some(subscription);

        info!(address = %self.address, "Request service started");
        Ok(())
    }

    /// Unbind the responder. Deliveries already in progress still complete.
    pub fn stop(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            info!(address = %self.address, "Stopping request service...");
            subscription.unsubscribe();
        }
    }

    pub fn is_running(&self) -> bool {
        self.subscription.lock().is_some()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }
}
