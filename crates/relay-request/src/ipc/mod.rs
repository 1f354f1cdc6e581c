//! Bus-facing side of the request/response layer.
//!
//! - [`client`]: sends requests and races the response against the deadline
//!   and the caller's cancellation signal
//! - [`reply`]: the client's reply address and the listener bound on it
//! - [`responder`]: turns a delivered request into a correlated response

pub mod client;
pub mod reply;
pub mod responder;

pub use client::RequestClient;
pub use reply::{ReplyEndpoint, ReplyListener};
pub use responder::{RequestProcessor, Responder};
