//! # Transport Boundary
//!
//! The two traits every transport implementation provides, and the errors
//! that cross the boundary.

use crate::subscriber::Subscription;
use async_trait::async_trait;
use shared_types::{Address, CodecError, Envelope};
use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Nothing is bound at the destination address.
    #[error("no consumer bound at address {address}")]
    Unroutable { address: Address },

    /// A consumer is already bound at the address.
    #[error("address {address} already has a consumer")]
    AddressInUse { address: Address },

    /// The transport has been shut down.
    #[error("transport closed")]
    Closed,

    /// The transport accepted the call but could not hand the message over.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The payload could not be serialized or deserialized.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Error returned by a [`MessageHandler`]; routes the delivery to the
/// transport's failure channel.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl HandlerError {
    /// Create a handler error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a handler error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The top-level message, without the cause chain.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Callback invoked by the transport once per delivered envelope.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one delivery.
    ///
    /// Returning `Err` hands the envelope to the transport's failure channel;
    /// the transport decides whether to redeliver it.
    async fn handle(&self, envelope: Envelope) -> Result<(), HandlerError>;
}

/// Trait for sending envelopes and binding handlers to addresses.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send an envelope to `destination`.
    async fn send(&self, envelope: Envelope, destination: &Address) -> Result<(), TransportError>;

    /// Bind `handler` at `address`.
    ///
    /// The binding lasts until the returned [`Subscription`] is dropped.
    async fn subscribe(
        &self,
        address: &Address,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Subscription, TransportError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, envelope: Envelope) -> Result<(), HandlerError> {
        (self.0)(envelope).await
    }
}

/// Wrap an async closure as a [`MessageHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
