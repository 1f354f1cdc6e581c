//! # Shared Bus - Addressed Message Transport
//!
//! The boundary between the request/response layer and whatever moves
//! messages around, plus an in-memory implementation of it.
//!
//! ## Transport Contract
//!
//! - `send(envelope, destination)`: hand one envelope to the consumer bound
//!   at `destination`, or fail with a [`TransportError`].
//! - `subscribe(address, handler)`: bind `handler` at `address`; the handler
//!   is invoked once per delivered envelope until the returned
//!   [`Subscription`] is dropped.
//!
//! ```text
//! ┌──────────────┐   send(env, addr)   ┌──────────────┐
//! │   Producer   │ ──────────────────→ │  Bus route   │
//! └──────────────┘                     │   (queue)    │
//!                                      └──────┬───────┘
//!                                             │ deliver
//!                                             ▼
//!                                      ┌──────────────┐   Err   ┌─────────────┐
//!                                      │   Handler    │ ──────→ │ redeliver / │
//!                                      └──────────────┘         │ dead-letter │
//!                                                               └─────────────┘
//! ```
//!
//! ## Failure Channel
//!
//! A handler error is never swallowed: the bus redelivers up to
//! `max_redeliveries` times and then moves the envelope to the dead-letter
//! log (and to [`DLQ_ADDRESS`] when something is bound there).

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod subscriber;
pub mod transport;

pub use bus::{BusConfig, DeadLetter, InMemoryBus};
pub use subscriber::Subscription;
pub use transport::{handler_fn, HandlerError, MessageHandler, MessageTransport, TransportError};

/// Maximum envelopes buffered per bound address before senders wait.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Maximum concurrent handler invocations per bound address.
pub const DEFAULT_PREFETCH: usize = 16;

/// Redeliveries attempted after a handler failure before dead-lettering.
pub const DEFAULT_MAX_REDELIVERIES: u32 = 2;

/// Dead letters retained in the bus's in-memory log.
pub const DEFAULT_DEAD_LETTER_LIMIT: usize = 1000;

/// Dead Letter Queue address for failed messages.
pub const DLQ_ADDRESS: &str = "dlq.critical";

/// Header naming the address a dead-lettered envelope was originally sent to.
pub const HEADER_DEAD_LETTER_ADDRESS: &str = "x-dead-letter-address";

/// Header carrying the final handler error of a dead-lettered envelope.
pub const HEADER_DEAD_LETTER_REASON: &str = "x-dead-letter-reason";
