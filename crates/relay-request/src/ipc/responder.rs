//! Responder: the service side of a request/response exchange.
//!
//! Decodes the request, hands it to a [`RequestProcessor`], and sends the
//! result to the request's reply-to address under the same correlation id.
//! Failures go back to the transport as a [`HandlerError`] so its
//! redelivery/dead-letter policy applies.

use crate::domain::error::ProcessingError;
use async_trait::async_trait;
use relay_telemetry::{metric_inc, RESPONDER_FAILURES};
use shared_bus::{HandlerError, MessageHandler, MessageTransport, Subscription, TransportError};
use shared_types::{now_millis, Address, Envelope, Message};
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

/// Application logic behind a responder.
///
/// Must be stateless across calls: the response depends on the request (and
/// whatever external lookups the implementation performs) only.
#[async_trait]
pub trait RequestProcessor: Send + Sync + 'static {
    type Request: Message;
    type Response: Message;

    async fn process(&self, request: Self::Request) -> Result<Self::Response, ProcessingError>;
}

/// Transport handler that answers requests using a [`RequestProcessor`].
pub struct Responder<P> {
    processor: P,
    transport: Arc<dyn MessageTransport>,
}

impl<P: RequestProcessor> Responder<P> {
    /// Responses are sent through `transport`.
    pub fn new(processor: P, transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            processor,
            transport,
        }
    }

    /// Bind this responder at `address`.
    ///
    /// The binding lasts until the returned subscription is dropped.
    pub async fn bind(self, address: &Address) -> Result<Subscription, TransportError> {
        let transport = self.transport.clone();
        transport.subscribe(address, Arc::new(self)).await
    }

    async fn respond(&self, request: Envelope) -> Result<(), ProcessingError> {
        let correlation_id = request.correlation_id();

        if request.is_expired_at(now_millis()) {
            debug!("Request expired before processing, not answering");
            return Ok(());
        }

        let reply_to = request
            .reply_to()
            .cloned()
            .ok_or(ProcessingError::MissingReplyTo { correlation_id })?;

        let payload = request.decode::<P::Request>()?;
        let response = self.processor.process(payload).await?;

        let envelope = Envelope::encode(&response, correlation_id)?;
        self.transport.send(envelope, &reply_to).await?;

        debug!(reply_to = %reply_to, "Response sent");
        Ok(())
    }
}

#[async_trait]
impl<P: RequestProcessor> MessageHandler for Responder<P> {
    async fn handle(&self, envelope: Envelope) -> Result<(), HandlerError> {
        let span = tracing::debug_span!(
            "respond",
            correlation_id = %envelope.correlation_id(),
            message_type = %envelope.message_type()
        );

        self.respond(envelope)
            .instrument(span.clone())
            .await
            .map_err(|e| {
                metric_inc!(RESPONDER_FAILURES);
                span.in_scope(|| warn!(error = %e, "Request processing failed"));
                HandlerError::with_source("request processing failed", e)
            })
    }
}
