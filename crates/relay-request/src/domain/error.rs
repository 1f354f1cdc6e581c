//! Error types for the request/response layer.
//!
//! Every call to `RequestClient::request` ends in exactly one of: a response,
//! [`RequestError::Transport`], [`RequestError::Timeout`] or
//! [`RequestError::Cancelled`].

use relay_telemetry::metrics::outcome;
use shared_bus::TransportError;
use shared_types::{CodecError, CorrelationId};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Caller-visible failure of a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Send or connect failure, or a payload that could not be encoded or
    /// decoded. Surfaced immediately; never retried here.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No response within the deadline.
    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The caller's cancellation signal fired first.
    #[error("request cancelled")]
    Cancelled,
}

impl RequestError {
    /// Whether the destination could not be reached at all, as opposed to
    /// being reachable but slow.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Label used for the outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Transport(_) => outcome::TRANSPORT_ERROR,
            Self::Timeout { .. } => outcome::TIMEOUT,
            Self::Cancelled => outcome::CANCELLED,
        }
    }
}

impl From<CodecError> for RequestError {
    fn from(e: CodecError) -> Self {
        Self::Transport(TransportError::Codec(e))
    }
}

/// Misuse of the pending request registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// An entry for this id is still live.
    #[error("correlation id {0} is already pending")]
    DuplicateCorrelationId(CorrelationId),
}

/// Failure while turning a request into a response.
///
/// Handed to the transport's failure channel; the transport decides whether
/// to redeliver.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The request carries no reply-to address, so no response can be sent.
    #[error("request {correlation_id} has no reply-to address")]
    MissingReplyTo { correlation_id: CorrelationId },

    /// Request decoding or response encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The application logic failed.
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// The response could not be sent back.
    #[error("failed to send response: {0}")]
    Reply(#[from] TransportError),
}

impl ProcessingError {
    /// Application failure with a message only.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// Application failure wrapping an underlying cause.
    pub fn failed_with(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Failed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
