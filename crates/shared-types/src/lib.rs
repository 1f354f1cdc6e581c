//! # Shared Types Crate
//!
//! Types that cross the transport boundary and are shared by every crate in
//! the workspace.
//!
//! ## Design Principles
//!
//! - **One Envelope**: every message on the bus, request or response, travels
//!   inside an [`Envelope`].
//! - **Opaque Payloads**: the envelope carries bytes; typed access goes through
//!   the JSON codec ([`Envelope::encode`] / [`Envelope::decode`]).
//! - **Correlation in Metadata**: request/response matching uses the envelope's
//!   `correlation_id` and `reply_to`, never fields of the payload.

pub mod address;
pub mod correlation;
pub mod envelope;
pub mod message;

pub use address::Address;
pub use correlation::CorrelationId;
pub use envelope::{now_millis, Envelope};
pub use message::{CodecError, Message};
