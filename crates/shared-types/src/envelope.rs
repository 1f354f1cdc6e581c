//! # Message Envelope
//!
//! The wrapper for every message that crosses the bus.
//!
//! ## Properties
//!
//! - **Correlation**: request/response flows use `correlation_id` and `reply_to`.
//! - **Headers**: free-form string metadata (e.g. `authorization`), set by
//!   envelope mutators before a request is sent.
//! - **Expiry**: requests carry `expires_at` so a responder can skip work for
//!   a caller that has already given up.
//! - **Immutability**: all setters consume `self`; once an envelope has been
//!   handed to the transport, nobody holds a handle to change it.

use crate::address::Address;
use crate::correlation::CorrelationId;
use crate::message::{CodecError, Message};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// A message payload plus routing and correlation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique identifier of this envelope.
    message_id: Uuid,

    /// Name of the payload type (see [`Message::MESSAGE_TYPE`]).
    message_type: String,

    /// For requests: freshly generated by the client.
    /// For responses: copied from the request.
    correlation_id: CorrelationId,

    /// Where the response should be sent. Present on requests only.
    reply_to: Option<Address>,

    /// Free-form string headers. Later writes to the same key win.
    headers: BTreeMap<String, String>,

    /// Creation time (milliseconds since the Unix epoch).
    created_at: u64,

    /// Optional absolute expiry (milliseconds since the Unix epoch).
    expires_at: Option<u64>,

    /// Serialized payload.
    payload: Vec<u8>,
}

impl Envelope {
    /// Create an envelope around raw payload bytes.
    pub fn new(
        message_type: impl Into<String>,
        correlation_id: CorrelationId,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            message_type: message_type.into(),
            correlation_id,
            reply_to: None,
            headers: BTreeMap::new(),
            created_at: now_millis(),
            expires_at: None,
            payload,
        }
    }

    /// Serialize a typed message into a new envelope.
    pub fn encode<M: Message>(message: &M, correlation_id: CorrelationId) -> Result<Self, CodecError> {
        let payload = serde_json::to_vec(message).map_err(|source| CodecError::Encode {
            message_type: M::MESSAGE_TYPE,
            source,
        })?;
        Ok(Self::new(M::MESSAGE_TYPE, correlation_id, payload))
    }

    /// Deserialize the payload as `M`, checking the message type first.
    pub fn decode<M: Message>(&self) -> Result<M, CodecError> {
        if self.message_type != M::MESSAGE_TYPE {
            return Err(CodecError::TypeMismatch {
                expected: M::MESSAGE_TYPE,
                actual: self.message_type.clone(),
            });
        }
        serde_json::from_slice(&self.payload).map_err(|source| CodecError::Decode {
            message_type: M::MESSAGE_TYPE,
            source,
        })
    }

    /// Set the reply-to address.
    #[must_use]
    pub fn with_reply_to(mut self, reply_to: Address) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Insert or overwrite a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the absolute expiry time.
    #[must_use]
    pub fn with_expires_at(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn reply_to(&self) -> Option<&Address> {
        self.reply_to.as_ref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Look up a single header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.expires_at
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Whether the envelope's expiry lies at or before `now` (unix millis).
    ///
    /// Envelopes without an expiry never expire.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
