//! # Relay Request - Request/Response over a One-Way Bus
//!
//! Correlates requests and responses on a transport that only knows how to
//! send an addressed message and deliver messages bound at an address.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────── RequestClient ────────────────────────┐
//! │  request(payload, cancel)                                     │
//! │    1. resolve reply endpoint (once, shared)                   │
//! │    2. insert CorrelationId → PendingRequestRegistry           │
//! │    3. encode + MutatorChain → send(service_address)           │
//! │    4. race: response │ deadline │ cancellation                │
//! └──────────────┬──────────────────────────────▲─────────────────┘
//!                │ request                      │ complete(id)
//!                ▼                              │
//!          ┌───────────┐                 ┌──────┴───────┐
//!          │ Transport │ ──── response ─→│ReplyListener │
//!          └─────┬─────┘                 └──────────────┘
//!                │ deliver                      ▲
//!                ▼                              │
//!          ┌───────────┐   send(reply_to)       │
//!          │ Responder │ ───────────────────────┘
//!          └───────────┘
//! ```
//!
//! ## Outcomes
//!
//! Every request ends in exactly one of: the response,
//! [`RequestError::Transport`], [`RequestError::Timeout`] or
//! [`RequestError::Cancelled`]. Responses for ids that are no longer pending
//! are counted and dropped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_request::{ClientConfig, RequestClient};
//! use tokio_util::sync::CancellationToken;
//!
//! let client: RequestClient<SimpleRequest, SimpleResponse> =
//!     RequestClient::new(transport, ClientConfig::new("request_service"));
//! let response = client.request(&request, &CancellationToken::new()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod domain;
pub mod ipc;

use std::time::Duration;

pub use domain::{
    cleanup_task, ClientConfig, Completion, ConfigError, EnvelopeMutator, MutatorChain,
    PendingRequestRegistry, PendingStats, PendingStatsSnapshot, ProcessingError, RegistryError,
    RequestError, SetHeader,
};
pub use ipc::{ReplyEndpoint, ReplyListener, RequestClient, RequestProcessor, Responder};

/// Default service address requests are sent to.
pub const DEFAULT_SERVICE_ADDRESS: &str = "request_service";

/// Default deadline for a request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default prefix of a client's reply address.
pub const DEFAULT_REPLY_PREFIX: &str = "reply";

/// Default interval of the registry's background sweep.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Header carrying the caller's credentials, set through [`SetHeader`].
pub const HEADER_AUTHORIZATION: &str = "authorization";
