//! # Relay Node Library
//!
//! Demo host for the request/response layer: a customer-lookup service and
//! an interactive client sharing one in-memory bus. The entry point is the
//! `main.rs` binary; the modules are exposed for tests.
//!
//! ```text
//!  stdin ──→ console ──→ RequestClient ──→ request_service ──→ CustomerLookup
//!                ▲                                                  │
//!                └──────────── reply.<uuid> ←───────────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod consumer;
pub mod messages;
pub mod node;
pub mod runtime;
pub mod service;

pub use config::NodeConfig;
pub use console::{run_console, Interrupt, PROMPT};
pub use consumer::CustomerLookup;
pub use messages::{SimpleRequest, SimpleResponse};
pub use node::{CustomerClient, RelayNode};
pub use runtime::block_on_detached;
pub use service::RequestService;
