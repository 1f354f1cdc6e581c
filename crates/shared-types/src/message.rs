//! Typed messages and the JSON payload codec.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A payload type that can travel inside an [`Envelope`](crate::Envelope).
///
/// `MESSAGE_TYPE` is written into the envelope on encode and checked on
/// decode, so a consumer never silently parses a message meant for someone
/// else. Convention: `urn:message:<namespace>:<TypeName>`.
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable name of this message type.
    const MESSAGE_TYPE: &'static str;
}

/// Errors from encoding or decoding envelope payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload could not be serialized.
    #[error("failed to encode {message_type}: {source}")]
    Encode {
        message_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The payload bytes are not a valid instance of the expected type.
    #[error("failed to decode {message_type}: {source}")]
    Decode {
        message_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The envelope carries a different message type than requested.
    #[error("message type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },
}
