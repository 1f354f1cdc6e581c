//! Wiring: one in-memory bus, the request service, and a client for it.

use crate::config::NodeConfig;
use crate::messages::{SimpleRequest, SimpleResponse};
use crate::service::RequestService;
use relay_request::{cleanup_task, RequestClient, DEFAULT_CLEANUP_INTERVAL};
use shared_bus::{InMemoryBus, TransportError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Client type used by the demo.
pub type CustomerClient = RequestClient<SimpleRequest, SimpleResponse>;

/// A running demo node.
pub struct RelayNode {
    bus: InMemoryBus,
    service: RequestService,
    client: Arc<CustomerClient>,
    cleanup: JoinHandle<()>,
}

impl RelayNode {
    /// Create the bus, start the service and build the client.
    pub async fn start(config: NodeConfig) -> Result<Self, TransportError> {
        info!("Creating bus...");
        let bus = InMemoryBus::with_config(config.bus.clone());

        let service = RequestService::new(
            Arc::new(bus.clone()),
            config.client.service_address.clone(),
        );
        service.start().await?;

        let client = Arc::new(
            RequestClient::new(Arc::new(bus.clone()), config.client.clone())
                .with_mutators(config.mutators()),
        );
        let cleanup = tokio::spawn(cleanup_task(
            client.registry().clone(),
            DEFAULT_CLEANUP_INTERVAL,
        ));

        info!(
            service = %config.client.service_address,
            timeout_secs = config.client.request_timeout.as_secs(),
            authenticated = config.auth_token.is_some(),
            "Node started"
        );

        Ok(Self {
            bus,
            service,
            client,
            cleanup,
        })
    }

    pub fn client(&self) -> Arc<CustomerClient> {
        self.client.clone()
    }

    pub fn bus(&self) -> &InMemoryBus {
        &self.bus
    }

    pub fn service(&self) -> &RequestService {
        &self.service
    }

    /// Stop the service and the bus.
    pub fn shutdown(self) {
        info!("Stopping bus...");
        self.service.stop();
        self.cleanup.abort();
        self.bus.shutdown();
        info!(
            sent = self.bus.messages_sent(),
            delivered = self.bus.messages_delivered(),
            dead_lettered = self.bus.messages_dead_lettered(),
            "Shutdown complete"
        );
    }
}
